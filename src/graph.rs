use crate::ast::Expr;
use crate::error::{GraphError, LangError};
use crate::interpreter::Scope;
use crate::parser::parse_source;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Message cached on a node when one of its inputs failed. The producer's
/// own message is only visible on the producer.
pub const INPUT_ERROR_MESSAGE: &str = "Error in input node";

/// Stable identity of a node within one `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of the last run of a node.
#[derive(Debug, Clone)]
pub enum EvalResult {
    Ok { value: Value, text: String },
    Err { message: String },
}

impl EvalResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, EvalResult::Ok { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            EvalResult::Ok { value, .. } => Some(value),
            EvalResult::Err { .. } => None,
        }
    }

    /// The display text on success, the error message otherwise.
    pub fn text(&self) -> &str {
        match self {
            EvalResult::Ok { text, .. } => text,
            EvalResult::Err { message } => message,
        }
    }
}

/// Directed edge: `from`'s result becomes an input of `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// A graph vertex: editor metadata, source text, a private scope chained
/// to the graph's root, and the caches of the last run.
pub struct CodeNode {
    id: NodeId,
    pub title: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    src: String,
    scope: Scope,
    compiled: Option<Rc<Expr>>,
    output: Option<EvalResult>,
}

impl CodeNode {
    fn new(id: NodeId, src: String, root: &Scope) -> Self {
        CodeNode {
            id,
            title: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            src,
            scope: root.child(),
            compiled: None,
            output: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The last successfully parsed expression.
    pub fn compiled(&self) -> Option<&Expr> {
        self.compiled.as_deref()
    }

    /// `None` until the node has run since its output was last cleared.
    pub fn output(&self) -> Option<&EvalResult> {
        self.output.as_ref()
    }

    /// Lex, parse and evaluate the source in the node's scope, catching
    /// any failure into the output cache.
    fn run(&mut self) {
        let outcome = self.compile().and_then(|expr| Ok(self.scope.evaluate(&expr)?));
        self.output = Some(match outcome {
            Ok(value) => EvalResult::Ok {
                text: value.stringify(),
                value,
            },
            Err(e) => {
                log::debug!("node {} failed: {} ({})", self.id, e, e.code());
                EvalResult::Err {
                    message: e.to_string(),
                }
            }
        });
    }

    fn compile(&mut self) -> Result<Rc<Expr>, LangError> {
        let expr = Rc::new(parse_source(&self.src)?);
        self.compiled = Some(Rc::clone(&expr));
        Ok(expr)
    }
}

impl fmt::Debug for CodeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeNode")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("src", &self.src)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Name under which the `index`-th input of a node is bound: `a`, `b`, ...
pub fn input_name(index: usize) -> String {
    u32::try_from(index)
        .ok()
        .and_then(|i| char::from_u32(u32::from(b'a') + i))
        .map(String::from)
        .unwrap_or_else(|| format!("in{}", index))
}

/// The node graph: nodes in display order, edges in insertion order, and
/// the root scope holding the intrinsics.
pub struct Graph {
    root: Scope,
    nodes: IndexMap<NodeId, CodeNode>,
    edges: Vec<Edge>,
    next_id: u32,
}

impl Graph {
    pub fn new() -> Self {
        let root = Scope::new();
        crate::intrinsics::install(&root);
        Graph {
            root,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            next_id: 0,
        }
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    // ── Topology ────────────────────────────────────────────────────

    /// Add a node at the end of the node order. Its output starts unset.
    pub fn add_node(&mut self, src: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, CodeNode::new(id, src.into(), &self.root));
        id
    }

    /// Remove a node and every edge touching it. Consumers are not
    /// recomputed.
    pub fn delete_node(&mut self, id: NodeId) -> Result<CodeNode, GraphError> {
        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::UnknownNode(id))?;
        self.edges.retain(|e| e.from != id && e.to != id);
        Ok(node)
    }

    /// Append an edge. Duplicates are allowed; each binds one more input.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.node(from)?;
        self.node(to)?;
        self.edges.push(Edge { from, to });
        Ok(())
    }

    /// Remove the first edge `from -> to`. Returns whether one existed.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        match self.edges.iter().position(|e| e.from == from && e.to == to) {
            Some(index) => {
                self.edges.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether adding `from -> to` would close a dependency cycle.
    pub fn creates_cycle(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![to];
        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.consumers_of(current));
            }
        }
        false
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The id of the node at `index` in node order.
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.nodes.get_index(index).map(|(id, _)| *id)
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&CodeNode, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut CodeNode, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CodeNode> {
        self.nodes.values()
    }

    /// Producers feeding `id`, one per incoming edge, in edge order.
    pub fn inputs_of(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from)
            .collect()
    }

    /// Consumers fed by `id`, one per outgoing edge, in edge order.
    pub fn consumers_of(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to)
            .collect()
    }

    // ── Node editing ────────────────────────────────────────────────

    /// Replace a node's source. Nothing is recomputed until asked.
    pub fn set_source(&mut self, id: NodeId, src: impl Into<String>) -> Result<(), GraphError> {
        self.node_mut(id)?.src = src.into();
        Ok(())
    }

    pub fn set_title(&mut self, id: NodeId, title: Option<String>) -> Result<(), GraphError> {
        self.node_mut(id)?.title = title;
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, x: f64, y: f64) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    pub fn set_size(&mut self, id: NodeId, width: f64, height: f64) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.width = width;
        node.height = height;
        Ok(())
    }

    pub fn output(&self, id: NodeId) -> Result<Option<&EvalResult>, GraphError> {
        Ok(self.node(id)?.output())
    }

    /// Reset one node's output to unset.
    pub fn clear_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node_mut(id)?.output = None;
        Ok(())
    }

    /// Reset every output to unset.
    pub fn clear_outputs(&mut self) {
        for node in self.nodes.values_mut() {
            node.output = None;
        }
    }

    // ── Recompute protocol ──────────────────────────────────────────

    /// Run `id` against its inputs. Producers whose output is unset are
    /// resolved first, depth-first; producers holding a cached output are
    /// reused as is. If any input holds an error the node is not run and
    /// records `INPUT_ERROR_MESSAGE`.
    pub fn recompute_with_inputs(&mut self, id: NodeId) -> Result<(), GraphError> {
        let mut resolving = Vec::new();
        self.run_with_inputs(id, &mut resolving)
    }

    fn run_with_inputs(&mut self, id: NodeId, resolving: &mut Vec<NodeId>) -> Result<(), GraphError> {
        if resolving.contains(&id) {
            log::warn!("cycle while resolving inputs of node {}", id);
            return Err(GraphError::CycleDetected(id));
        }
        self.node(id)?.scope.clear();
        resolving.push(id);

        let mut inputs = Vec::new();
        for producer in self.inputs_of(id) {
            if self.node(producer)?.output.is_none() {
                log::debug!("resolving input {} of node {}", producer, id);
                self.run_with_inputs(producer, resolving)?;
            } else {
                log::debug!("reusing cached output of {} for node {}", producer, id);
            }
            let failed = match &self.node(producer)?.output {
                Some(EvalResult::Ok { value, .. }) => {
                    inputs.push(value.clone());
                    false
                }
                Some(EvalResult::Err { .. }) => true,
                None => unreachable!("output of node {} still unset after resolution", producer),
            };
            if failed {
                resolving.pop();
                self.node_mut(id)?.output = Some(EvalResult::Err {
                    message: INPUT_ERROR_MESSAGE.to_string(),
                });
                return Ok(());
            }
        }
        resolving.pop();

        let node = self.node_mut(id)?;
        for (index, value) in inputs.into_iter().enumerate() {
            node.scope.define(input_name(index), value);
        }
        log::debug!("running node {}", id);
        node.run();
        Ok(())
    }

    /// Recompute `id` unconditionally, then every transitive consumer,
    /// following outgoing edges in edge order. Nodes off that path keep
    /// their cached outputs.
    pub fn recompute_downstream(&mut self, id: NodeId) -> Result<(), GraphError> {
        let mut path = Vec::new();
        self.propagate(id, &mut path)
    }

    fn propagate(&mut self, id: NodeId, path: &mut Vec<NodeId>) -> Result<(), GraphError> {
        if path.contains(&id) {
            log::warn!("cycle while propagating downstream of node {}", id);
            return Err(GraphError::CycleDetected(id));
        }
        self.recompute_with_inputs(id)?;
        path.push(id);
        for consumer in self.consumers_of(id) {
            self.propagate(consumer, path)?;
        }
        path.pop();
        Ok(())
    }

    /// Clear every output and run every node once, in node order.
    pub fn recompute_all(&mut self) -> Result<(), GraphError> {
        self.clear_outputs();
        for id in self.node_ids() {
            if self.node(id)?.output.is_none() {
                self.recompute_with_inputs(id)?;
            }
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.values().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish()
    }
}
