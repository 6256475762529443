use crate::error::GraphError;
use crate::graph::{EvalResult, Graph};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Serialized form of a whole graph. Edges refer to nodes by their
/// position in `node_data`, so node order must survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub node_data: Vec<NodeData>,
    pub edges: Vec<EdgeData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub src: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    pub a: usize,
    pub b: usize,
}

impl Graph {
    /// Snapshot nodes and edges into the serialized schema.
    pub fn to_data(&self) -> GraphData {
        let node_data = self
            .nodes()
            .map(|node| NodeData {
                title: node.title.clone(),
                src: node.src().to_string(),
                x: node.x,
                y: node.y,
                w: node.width,
                h: node.height,
            })
            .collect();
        let edges = self
            .edges()
            .iter()
            .filter_map(|edge| {
                Some(EdgeData {
                    a: self.index_of(edge.from)?,
                    b: self.index_of(edge.to)?,
                })
            })
            .collect();
        GraphData { node_data, edges }
    }

    /// Replace all nodes and edges with `data`. The root scope is kept and
    /// every output starts unset.
    pub fn load_data(&mut self, data: &GraphData) -> Result<(), GraphError> {
        let count = data.node_data.len();
        if let Some(bad) = data.edges.iter().find(|e| e.a >= count || e.b >= count) {
            return Err(GraphError::InvalidEdge {
                a: bad.a,
                b: bad.b,
                nodes: count,
            });
        }

        for id in self.node_ids() {
            self.delete_node(id)?;
        }
        let mut ids = Vec::with_capacity(count);
        for node in &data.node_data {
            let id = self.add_node(node.src.clone());
            self.set_title(id, node.title.clone())?;
            self.set_position(id, node.x, node.y)?;
            self.set_size(id, node.w, node.h)?;
            ids.push(id);
        }
        for edge in &data.edges {
            self.add_edge(ids[edge.a], ids[edge.b])?;
        }
        log::debug!("loaded {} node(s), {} edge(s)", count, data.edges.len());
        Ok(())
    }

    pub fn from_data(data: &GraphData) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();
        graph.load_data(data)?;
        Ok(graph)
    }

    pub fn save_json(&self) -> String {
        // Plain structs of strings and numbers always serialize.
        serde_json::to_string(&self.to_data()).unwrap_or_default()
    }

    pub fn save_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_data()).unwrap_or_default()
    }

    pub fn load_json(&mut self, input: &str) -> Result<(), GraphError> {
        let data: GraphData = serde_json::from_str(input)?;
        self.load_data(&data)
    }

    pub fn from_json(input: &str) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();
        graph.load_json(input)?;
        Ok(graph)
    }
}

/// Structured form of a value. Non-finite numbers become `null` and
/// lambdas their display placeholder.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Record(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::List(elements) => {
            serde_json::Value::Array(elements.iter().map(value_to_json).collect())
        }
        Value::Lambda(_) => serde_json::Value::String(value.stringify()),
    }
}

/// `{"kind":"ok","text":..,"value":..}`, `{"kind":"err","message":..}`,
/// or `null` while unset.
pub fn output_to_json(output: Option<&EvalResult>) -> serde_json::Value {
    match output {
        Some(EvalResult::Ok { value, text }) => json!({
            "kind": "ok",
            "text": text,
            "value": value_to_json(value),
        }),
        Some(EvalResult::Err { message }) => json!({
            "kind": "err",
            "message": message,
        }),
        None => serde_json::Value::Null,
    }
}
