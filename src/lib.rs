pub mod ast;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod intrinsics;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod value;

use error::{GraphError, LangError};
use graph::{Graph, NodeId};
use interpreter::Scope;
use value::Value;

// ── Core API ───────────────────────────────────────────────────────

/// A fresh root scope holding every intrinsic.
pub fn prelude_scope() -> Scope {
    let root = Scope::new();
    intrinsics::install(&root);
    root
}

/// Lex, parse and evaluate a standalone snippet in a child of a fresh
/// prelude scope.
pub fn evaluate_source(input: &str) -> Result<Value, LangError> {
    let expr = parser::parse_source(input)?;
    let scope = prelude_scope().child();
    Ok(scope.evaluate(&expr)?)
}

// ── WASM FFI ────────────────────────────────────────────────────────

/// Allocate `len` bytes in WASM memory, returning a pointer.
/// The caller must free the returned pointer with `dealloc(ptr, len)`.
#[no_mangle]
pub extern "C" fn alloc(len: usize) -> *mut u8 {
    let layout = std::alloc::Layout::from_size_align(len, 1).unwrap();
    unsafe { std::alloc::alloc(layout) }
}

/// Free a buffer previously returned by `alloc` or by any of the
/// `wasm_*` functions. For null-terminated strings returned by those
/// functions, pass `strlen(ptr) + 1` as `len`.
#[no_mangle]
pub unsafe extern "C" fn dealloc(ptr: *mut u8, len: usize) {
    let layout = std::alloc::Layout::from_size_align(len, 1).unwrap();
    unsafe { std::alloc::dealloc(ptr, layout) };
}

// ── Session-based WASM FFI ──────────────────────────────────────────
//
// The editor addresses nodes by their position in node order, the same
// indices the serialized schema uses.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

// WASM is single-threaded, so thread_local is just a convenient safe wrapper.
thread_local! {
    static SESSIONS: RefCell<HashMap<u32, Graph>> = RefCell::new(HashMap::new());
    static NEXT_SESSION_ID: Cell<u32> = const { Cell::new(1) };
}

fn with_graph<R>(id: u32, f: impl FnOnce(&mut Graph) -> R) -> Option<R> {
    SESSIONS.with(|s| s.borrow_mut().get_mut(&id).map(f))
}

fn next_id() -> u32 {
    NEXT_SESSION_ID.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    })
}

unsafe fn read_input(ptr: *const u8, len: usize) -> String {
    let slice = unsafe { std::slice::from_raw_parts(ptr, len) };
    String::from_utf8_lossy(slice).into_owned()
}

fn status_json(result: Option<Result<(), GraphError>>) -> String {
    let value = match result {
        Some(Ok(())) => serde_json::json!({ "ok": true }),
        Some(Err(e)) => serde_json::json!({
            "ok": false,
            "code": e.code(),
            "message": e.to_string(),
        }),
        None => serde_json::json!({
            "ok": false,
            "code": "unknown-session",
            "message": "Unknown session",
        }),
    };
    value.to_string()
}

/// Create a new session holding an empty graph. Returns a session ID.
#[no_mangle]
pub extern "C" fn wasm_graph_new() -> u32 {
    let id = next_id();
    SESSIONS.with(|s| s.borrow_mut().insert(id, Graph::new()));
    id
}

/// Replace the session's graph with serialized graph JSON and evaluate
/// every node. Returns a pointer to a null-terminated JSON status.
#[no_mangle]
pub unsafe extern "C" fn wasm_graph_load(id: u32, src_ptr: *const u8, src_len: usize) -> *const u8 {
    let input = unsafe { read_input(src_ptr, src_len) };
    let result = with_graph(id, |graph| {
        graph.load_json(&input)?;
        graph.recompute_all()
    });
    string_to_c_ptr(status_json(result))
}

/// Serialize the session's graph. Returns a pointer to a null-terminated
/// JSON string (`{}` for an unknown session).
#[no_mangle]
pub extern "C" fn wasm_graph_save(id: u32) -> *const u8 {
    let json = with_graph(id, |graph| graph.save_json()).unwrap_or_else(|| "{}".to_string());
    string_to_c_ptr(json)
}

/// Append a node with the given source. Returns its index, or -1.
#[no_mangle]
pub unsafe extern "C" fn wasm_graph_add_node(id: u32, src_ptr: *const u8, src_len: usize) -> i32 {
    let src = unsafe { read_input(src_ptr, src_len) };
    with_graph(id, |graph| {
        let node = graph.add_node(src);
        graph.index_of(node).map_or(-1, |i| i as i32)
    })
    .unwrap_or(-1)
}

/// Add an edge between the nodes at indices `a` and `b`.
/// Returns a pointer to a null-terminated JSON status.
#[no_mangle]
pub extern "C" fn wasm_graph_add_edge(id: u32, a: u32, b: u32) -> *const u8 {
    let result = with_graph(id, |graph| {
        let from = node_at(graph, a)?;
        let to = node_at(graph, b)?;
        graph.add_edge(from, to)
    });
    string_to_c_ptr(status_json(result))
}

/// Delete the node at `index` and its edges. Consumers are not recomputed.
#[no_mangle]
pub extern "C" fn wasm_graph_delete_node(id: u32, index: u32) -> *const u8 {
    let result = with_graph(id, |graph| {
        let node = node_at(graph, index)?;
        graph.delete_node(node).map(|_| ())
    });
    string_to_c_ptr(status_json(result))
}

/// Replace the source of the node at `index` without recomputing it.
#[no_mangle]
pub unsafe extern "C" fn wasm_graph_set_source(
    id: u32,
    index: u32,
    src_ptr: *const u8,
    src_len: usize,
) -> *const u8 {
    let src = unsafe { read_input(src_ptr, src_len) };
    let result = with_graph(id, |graph| {
        let node = node_at(graph, index)?;
        graph.set_source(node, src)
    });
    string_to_c_ptr(status_json(result))
}

/// Recompute the node at `index` and everything downstream of it.
#[no_mangle]
pub extern "C" fn wasm_graph_recompute(id: u32, index: u32) -> *const u8 {
    let result = with_graph(id, |graph| {
        let node = node_at(graph, index)?;
        graph.recompute_downstream(node)
    });
    string_to_c_ptr(status_json(result))
}

/// The cached output of the node at `index` as JSON (`null` while unset
/// or for an unknown node).
#[no_mangle]
pub extern "C" fn wasm_graph_output(id: u32, index: u32) -> *const u8 {
    let json = with_graph(id, |graph| {
        let output = graph
            .node_at(index as usize)
            .and_then(|node| graph.output(node).ok().flatten());
        json::output_to_json(output)
    })
    .unwrap_or(serde_json::Value::Null);
    string_to_c_ptr(json.to_string())
}

/// Free a session, dropping its graph.
#[no_mangle]
pub extern "C" fn wasm_graph_free(id: u32) {
    SESSIONS.with(|s| s.borrow_mut().remove(&id));
}

fn node_at(graph: &Graph, index: u32) -> Result<NodeId, GraphError> {
    graph
        .node_at(index as usize)
        .ok_or(GraphError::NodeIndexOutOfRange {
            index: index as usize,
            nodes: graph.len(),
        })
}

/// Convert a String to a null-terminated C pointer with exact allocation size.
/// The allocation size is exactly `s.len() + 1` bytes, so the caller can
/// free with `dealloc(ptr, strlen(ptr) + 1)`.
fn string_to_c_ptr(s: String) -> *const u8 {
    let mut bytes = s.into_bytes();
    bytes.push(0);
    // into_boxed_slice guarantees allocation size == bytes.len()
    let boxed = bytes.into_boxed_slice();
    Box::into_raw(boxed) as *mut u8
}

#[cfg(test)]
mod tests;
