use crate::ast::*;
use crate::error::{GraphError, LangError};
use crate::graph::{EvalResult, Graph, NodeId, INPUT_ERROR_MESSAGE};
use crate::interpreter::Scope;
use crate::lexer::{tokenize, Token};
use crate::parser::parse_source;
use crate::value::{format_number, Value};

// ── Shared fixture runners ──────────────────────────────────────────

/// Embed fixture files at compile time.
const EVAL_FIXTURES: &str = include_str!("../test-data/fixtures/eval.json");
const LEX_ERROR_FIXTURES: &str = include_str!("../test-data/fixtures/lex-errors.json");
const PARSE_ERROR_FIXTURES: &str = include_str!("../test-data/fixtures/parse-errors.json");

#[test]
fn test_fixture_eval() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(EVAL_FIXTURES).unwrap();
    assert!(!fixtures.is_empty());

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();
        let result = crate::evaluate_source(input);

        if let Some(expected) = fixture.get("expected").and_then(|v| v.as_str()) {
            match result {
                Ok(value) => assert_eq!(
                    value.stringify(),
                    expected,
                    "Fixture '{}': value mismatch for input {:?}",
                    name,
                    input
                ),
                Err(err) => panic!("Fixture '{}': unexpected error: {}", name, err),
            }
        } else {
            let code = fixture["error"].as_str().unwrap();
            match result {
                Ok(value) => panic!(
                    "Fixture '{}': expected error {} but got {}",
                    name, code, value
                ),
                Err(err) => assert_eq!(
                    err.code(),
                    code,
                    "Fixture '{}': wrong error: {}",
                    name,
                    err
                ),
            }
        }
    }
}

#[test]
fn test_fixture_lex_errors() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(LEX_ERROR_FIXTURES).unwrap();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();
        let err = match tokenize(input) {
            Ok(tokens) => panic!("Fixture '{}': expected a lex error, got {:?}", name, tokens),
            Err(err) => err,
        };
        let expected_char = fixture["character"].as_str().unwrap().chars().next().unwrap();
        assert_eq!(err.character, expected_char, "Fixture '{}'", name);
        assert_eq!(
            err.position.line as u64,
            fixture["line"].as_u64().unwrap(),
            "Fixture '{}': line",
            name
        );
        assert_eq!(
            err.position.column as u64,
            fixture["column"].as_u64().unwrap(),
            "Fixture '{}': column",
            name
        );
    }
}

#[test]
fn test_fixture_parse_errors() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(PARSE_ERROR_FIXTURES).unwrap();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();
        match parse_source(input) {
            Ok(expr) => panic!("Fixture '{}': expected a parse error, got {:?}", name, expr),
            Err(LangError::Parse(err)) => {
                if let Some(message) = fixture["message"].as_str() {
                    assert_eq!(err.to_string(), message, "Fixture '{}'", name);
                }
            }
            Err(other) => panic!("Fixture '{}': expected a parse error, got {}", name, other),
        }
    }
}

// ── Lexer ───────────────────────────────────────────────────────────

#[test]
fn test_lex_keywords_and_punctuation() {
    let tokens = tokenize("let f = \\x: if x == 1 then x else 0;").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Let,
            Token::Ident("f".to_string()),
            Token::Assign,
            Token::Backslash,
            Token::Ident("x".to_string()),
            Token::Colon,
            Token::If,
            Token::Ident("x".to_string()),
            Token::EqEq,
            Token::Number(1.0),
            Token::Then,
            Token::Ident("x".to_string()),
            Token::Else,
            Token::Number(0.0),
            Token::Semicolon,
        ]
    );
}

#[test]
fn test_lex_second_dot_ends_number() {
    let tokens = tokenize("1.5.2").unwrap();
    assert_eq!(
        tokens,
        vec![Token::Number(1.5), Token::Dot, Token::Number(2.0)]
    );
}

#[test]
fn test_lex_identifier_continues_with_uppercase_and_digits() {
    let tokens = tokenize("starts_with toStr x2").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Ident("starts_with".to_string()),
            Token::Ident("toStr".to_string()),
            Token::Ident("x2".to_string()),
        ]
    );
}

#[test]
fn test_lex_strings_are_raw() {
    let tokens = tokenize(r#""a\n" "#).unwrap();
    assert_eq!(tokens, vec![Token::String("a\\n".to_string())]);
}

#[test]
fn test_lex_comment_to_end_of_input() {
    assert_eq!(tokenize("1 # trailing").unwrap(), vec![Token::Number(1.0)]);
    assert!(tokenize("# only a comment").unwrap().is_empty());
}

#[test]
fn test_lex_lone_equals() {
    assert_eq!(
        tokenize("= ==").unwrap(),
        vec![Token::Assign, Token::EqEq]
    );
}

// ── Parser ──────────────────────────────────────────────────────────

#[test]
fn test_parse_right_associative_subtraction() {
    let expr = parse_source("10 - 3 - 2").unwrap();
    let expected = Expr::Binary {
        op: BinaryOp::Sub,
        left: Box::new(Expr::Number(10.0)),
        right: Box::new(Expr::Binary {
            op: BinaryOp::Sub,
            left: Box::new(Expr::Number(3.0)),
            right: Box::new(Expr::Number(2.0)),
        }),
    };
    assert_eq!(expr, expected);
}

#[test]
fn test_parse_apply_collects_flat_arguments() {
    let expr = parse_source("f 1 \"s\" x").unwrap();
    match expr {
        Expr::Apply { callee, args } => {
            assert_eq!(*callee, Expr::Ident("f".to_string()));
            assert_eq!(args.len(), 3);
        }
        other => panic!("expected apply, got {:?}", other),
    }
}

#[test]
fn test_parse_arguments_are_equality_level() {
    // `f 1 + 2` passes `1 + 2` as one argument.
    let expr = parse_source("f 1 + 2").unwrap();
    match expr {
        Expr::Apply { args, .. } => {
            assert_eq!(args.len(), 1);
            assert!(matches!(args[0], Expr::Binary { op: BinaryOp::Add, .. }));
        }
        other => panic!("expected apply, got {:?}", other),
    }
}

#[test]
fn test_parse_pipe_stages() {
    let expr = parse_source("x | f | g 1").unwrap();
    match expr {
        Expr::Pipe { seed, stages } => {
            assert_eq!(*seed, Expr::Ident("x".to_string()));
            assert_eq!(stages.len(), 2);
            assert!(matches!(stages[1], Expr::Apply { .. }));
        }
        other => panic!("expected pipe, got {:?}", other),
    }
}

#[test]
fn test_parse_field_chain() {
    let expr = parse_source("r.a.b").unwrap();
    assert_eq!(
        expr,
        Expr::Field {
            base: "r".to_string(),
            fields: vec!["a".to_string(), "b".to_string()],
        }
    );
}

#[test]
fn test_parse_field_needs_bare_identifier() {
    // A group cannot start a field chain; the rest is left unparsed.
    let expr = parse_source("(r).a").unwrap();
    assert_eq!(expr, Expr::Ident("r".to_string()));
}

#[test]
fn test_parse_record_keeps_field_order() {
    match parse_source("{b: 1, a: 2}").unwrap() {
        Expr::Record(fields) => {
            let keys: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
            assert_eq!(keys, vec!["b", "a"]);
        }
        other => panic!("expected record, got {:?}", other),
    }
}

#[test]
fn test_parse_let_chain() {
    match parse_source("let x = 1; let y = 2; x").unwrap() {
        Expr::Let { name, next, .. } => {
            assert_eq!(name, "x");
            assert!(matches!(*next, Expr::Let { .. }));
        }
        other => panic!("expected let, got {:?}", other),
    }
}

// ── Interpreter ─────────────────────────────────────────────────────

fn eval_in(scope: &Scope, src: &str) -> Value {
    scope.evaluate(&parse_source(src).unwrap()).unwrap()
}

#[test]
fn test_let_extends_current_scope() {
    let scope = crate::prelude_scope().child();
    eval_in(&scope, "let x = 4; x");
    assert_eq!(scope.lookup("x").and_then(|v| v.as_number()), Some(4.0));
    assert_eq!(scope.local_names(), vec!["x".to_string()]);
}

#[test]
fn test_closure_captures_live_scope() {
    let scope = crate::prelude_scope().child();
    let f = eval_in(&scope, "\\x: x + y");
    // Bind `y` after the closure exists; it must still be seen.
    scope.define("y", Value::Number(10.0));
    let result = scope.apply(&f, Value::Number(5.0)).unwrap();
    assert_eq!(result.stringify(), "15");
}

#[test]
fn test_closure_parameter_does_not_leak() {
    let scope = crate::prelude_scope().child();
    eval_in(&scope, "let f = \\x: x; f 1");
    assert!(scope.lookup("x").is_none());
}

#[test]
fn test_clear_keeps_parent_chain() {
    let root = crate::prelude_scope();
    let scope = root.child();
    scope.define("z", Value::Number(1.0));
    scope.clear();
    assert!(scope.lookup("z").is_none());
    assert!(scope.lookup("len").is_some());
}

#[test]
fn test_native_error_messages() {
    let err = crate::evaluate_source("nth 3 [1, 2, 3]").unwrap_err();
    assert_eq!(
        err.to_string(),
        "nth: Index 3 out of bounds for list of length 3"
    );
    let err = crate::evaluate_source("1/\"x\"").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operand to the right of '/': Expected number, found string"
    );
    let err = crate::evaluate_source("nope").unwrap_err();
    assert_eq!(err.to_string(), "Undefined variable nope");
}

#[test]
fn test_split_yields_strings() {
    match crate::evaluate_source("split \",\" \"a,b,c\"").unwrap() {
        Value::List(items) => {
            assert_eq!(items.len(), 3);
            assert!(items.iter().all(|v| matches!(v, Value::String(_))));
        }
        other => panic!("expected list, got {}", other),
    }
}

#[test]
fn test_format_number() {
    assert_eq!(format_number(3.0), "3");
    assert_eq!(format_number(-0.0), "0");
    assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    assert_eq!(format_number(-2.5), "-2.5");
    assert_eq!(format_number(f64::INFINITY), "Infinity");
    assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    assert_eq!(format_number(f64::NAN), "NaN");
}

#[test]
fn test_value_to_json() {
    let value = crate::evaluate_source("{n: 1.5, s: \"x\", l: [1, 2], f: \\y: y}").unwrap();
    let json = value.to_json();
    assert_eq!(json["n"], 1.5);
    assert_eq!(json["s"], "x");
    assert_eq!(json["l"], serde_json::json!([1.0, 2.0]));
    assert_eq!(json["f"], "lambda<y>");
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["n", "s", "l", "f"]);
}

#[test]
fn test_parse_float_prefix() {
    use crate::intrinsics::parse_float_prefix;
    assert_eq!(parse_float_prefix("42"), Some(42.0));
    assert_eq!(parse_float_prefix(" .5x"), Some(0.5));
    assert_eq!(parse_float_prefix("-Infinity"), Some(f64::NEG_INFINITY));
    assert_eq!(parse_float_prefix("1e"), Some(1.0));
    assert_eq!(parse_float_prefix("e1"), None);
    assert_eq!(parse_float_prefix(""), None);
}

// ── Graph engine ────────────────────────────────────────────────────

fn text(graph: &Graph, id: NodeId) -> String {
    match graph.output(id).unwrap() {
        Some(EvalResult::Ok { text, .. }) => text.clone(),
        Some(EvalResult::Err { message }) => format!("error: {}", message),
        None => "unset".to_string(),
    }
}

#[test]
fn test_graph_binds_inputs_by_edge_order() {
    let mut graph = Graph::new();
    let x = graph.add_node("1");
    let y = graph.add_node("2");
    let sum = graph.add_node("a * 10 + b");
    graph.add_edge(y, sum).unwrap();
    graph.add_edge(x, sum).unwrap();
    graph.recompute_all().unwrap();
    assert_eq!(text(&graph, sum), "21");
}

#[test]
fn test_graph_duplicate_edges_bind_twice() {
    let mut graph = Graph::new();
    let x = graph.add_node("3");
    let sum = graph.add_node("a + b");
    graph.add_edge(x, sum).unwrap();
    graph.add_edge(x, sum).unwrap();
    graph.recompute_downstream(x).unwrap();
    assert_eq!(text(&graph, sum), "6");
}

#[test]
fn test_graph_error_propagates_generic_message() {
    let mut graph = Graph::new();
    let a = graph.add_node("1/\"x\"");
    let b = graph.add_node("a + 1");
    graph.add_edge(a, b).unwrap();
    graph.recompute_downstream(a).unwrap();

    match graph.output(a).unwrap() {
        Some(EvalResult::Err { message }) => {
            assert_ne!(message, INPUT_ERROR_MESSAGE);
            assert!(message.contains("Expected number"), "{}", message);
        }
        other => panic!("expected error on producer, got {:?}", other),
    }
    match graph.output(b).unwrap() {
        Some(EvalResult::Err { message }) => assert_eq!(message, "Error in input node"),
        other => panic!("expected error on consumer, got {:?}", other),
    }
}

#[test]
fn test_graph_reuses_cached_siblings() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    let b = graph.add_node("2");
    let c = graph.add_node("a + b");
    graph.add_edge(a, c).unwrap();
    graph.add_edge(b, c).unwrap();
    graph.recompute_all().unwrap();
    assert_eq!(text(&graph, c), "3");

    // Change B without recomputing it: C must keep using B's cached 2.
    graph.set_source(b, "100").unwrap();
    graph.set_source(a, "10").unwrap();
    graph.recompute_downstream(a).unwrap();

    assert_eq!(text(&graph, a), "10");
    assert_eq!(text(&graph, b), "2");
    assert_eq!(text(&graph, c), "12");
}

#[test]
fn test_graph_resolves_unset_producers() {
    let mut graph = Graph::new();
    let a = graph.add_node("[1, 2, 3]");
    let b = graph.add_node("len a");
    graph.add_edge(a, b).unwrap();
    assert!(graph.output(a).unwrap().is_none());

    graph.recompute_downstream(b).unwrap();
    assert_eq!(text(&graph, a), "[1, 2, 3]");
    assert_eq!(text(&graph, b), "3");
}

#[test]
fn test_graph_propagates_through_chain() {
    let mut graph = Graph::new();
    let a = graph.add_node("2");
    let b = graph.add_node("a * a");
    let c = graph.add_node("toStr a");
    graph.add_edge(a, b).unwrap();
    graph.add_edge(b, c).unwrap();
    graph.recompute_all().unwrap();
    assert_eq!(text(&graph, c), "\"4\"");

    graph.set_source(a, "3").unwrap();
    graph.recompute_downstream(a).unwrap();
    assert_eq!(text(&graph, b), "9");
    assert_eq!(text(&graph, c), "\"9\"");
}

#[test]
fn test_graph_edit_forces_recompute() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    graph.recompute_downstream(a).unwrap();
    graph.set_source(a, "2").unwrap();
    assert_eq!(text(&graph, a), "1");
    graph.recompute_downstream(a).unwrap();
    assert_eq!(text(&graph, a), "2");
}

#[test]
fn test_graph_scope_cleared_between_runs() {
    let mut graph = Graph::new();
    let a = graph.add_node("let z = 1; z");
    graph.recompute_downstream(a).unwrap();
    assert_eq!(text(&graph, a), "1");

    graph.set_source(a, "z").unwrap();
    graph.recompute_downstream(a).unwrap();
    assert_eq!(text(&graph, a), "error: Undefined variable z");
}

#[test]
fn test_graph_keeps_last_parsed_expression() {
    let mut graph = Graph::new();
    let a = graph.add_node("1 + 2");
    graph.recompute_downstream(a).unwrap();
    graph.set_source(a, "1 +").unwrap();
    graph.recompute_downstream(a).unwrap();

    assert!(text(&graph, a).starts_with("error: Unexpected EOF"));
    assert!(matches!(
        graph.node(a).unwrap().compiled(),
        Some(Expr::Binary { op: BinaryOp::Add, .. })
    ));
}

#[test]
fn test_graph_delete_node_removes_edges_only() {
    let mut graph = Graph::new();
    let a = graph.add_node("5");
    let b = graph.add_node("a + 1");
    let c = graph.add_node("a");
    graph.add_edge(a, b).unwrap();
    graph.add_edge(b, c).unwrap();
    graph.recompute_all().unwrap();
    assert_eq!(text(&graph, b), "6");

    graph.delete_node(a).unwrap();
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.len(), 2);
    // No recompute happened: B still shows its old value.
    assert_eq!(text(&graph, b), "6");

    graph.recompute_downstream(b).unwrap();
    assert_eq!(text(&graph, b), "error: Undefined variable a");
    assert_eq!(text(&graph, c), "error: Error in input node");
    assert!(matches!(
        graph.delete_node(a),
        Err(GraphError::UnknownNode(_))
    ));
}

#[test]
fn test_graph_remove_edge() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    let b = graph.add_node("2");
    graph.add_edge(a, b).unwrap();
    graph.add_edge(a, b).unwrap();
    assert!(graph.remove_edge(a, b));
    assert_eq!(graph.inputs_of(b), vec![a]);
    assert!(graph.remove_edge(a, b));
    assert!(!graph.remove_edge(a, b));
}

#[test]
fn test_graph_cycle_in_downstream_pass() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    let b = graph.add_node("a");
    graph.add_edge(a, b).unwrap();
    graph.recompute_all().unwrap();
    graph.add_edge(b, a).unwrap();

    let err = graph.recompute_downstream(a).unwrap_err();
    assert!(matches!(err, GraphError::CycleDetected(id) if id == a));
}

#[test]
fn test_graph_cycle_while_resolving_inputs() {
    let mut graph = Graph::new();
    let a = graph.add_node("b");
    let b = graph.add_node("a");
    graph.add_edge(a, b).unwrap();
    graph.add_edge(b, a).unwrap();

    let err = graph.recompute_all().unwrap_err();
    assert!(matches!(err, GraphError::CycleDetected(_)));
    assert_eq!(err.code(), "graph-cycle-detected");
}

#[test]
fn test_graph_self_edge_is_a_cycle() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    assert!(graph.creates_cycle(a, a));
    graph.add_edge(a, a).unwrap();
    assert!(graph.recompute_downstream(a).is_err());
}

#[test]
fn test_graph_creates_cycle() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    let b = graph.add_node("a");
    let c = graph.add_node("a");
    graph.add_edge(a, b).unwrap();
    graph.add_edge(b, c).unwrap();
    assert!(graph.creates_cycle(c, a));
    assert!(!graph.creates_cycle(a, c));
}

#[test]
fn test_graph_unknown_node() {
    let mut graph = Graph::new();
    let a = graph.add_node("1");
    let mut other = Graph::new();
    other.add_node("1");
    let stray = other.add_node("2");
    assert!(matches!(
        graph.add_edge(a, stray),
        Err(GraphError::UnknownNode(_))
    ));
    assert!(graph.set_source(stray, "3").is_err());
}

// ── Serialization ───────────────────────────────────────────────────

fn sample_graph() -> Graph {
    let mut graph = Graph::new();
    let a = graph.add_node("[1, 2, 3]");
    let b = graph.add_node("map (\\x: x + 1) a");
    let c = graph.add_node("len b");
    graph.set_title(a, Some("numbers".to_string())).unwrap();
    graph.set_position(b, 120.0, 40.5).unwrap();
    graph.set_size(b, 300.0, 200.0).unwrap();
    graph.add_edge(a, b).unwrap();
    graph.add_edge(b, c).unwrap();
    graph.add_edge(a, c).unwrap();
    graph
}

#[test]
fn test_json_round_trip() {
    let graph = sample_graph();
    let saved = graph.save_json();
    let reloaded = Graph::from_json(&saved).unwrap();
    assert_eq!(reloaded.save_json(), saved);
    assert_eq!(reloaded.to_data(), graph.to_data());
}

#[test]
fn test_json_schema_shape() {
    let saved = sample_graph().save_json();
    let v: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(v["node_data"][0]["title"], "numbers");
    assert!(v["node_data"][1].get("title").is_none());
    assert_eq!(v["node_data"][1]["x"], 120.0);
    assert_eq!(v["node_data"][1]["w"], 300.0);
    assert_eq!(v["edges"][2], serde_json::json!({ "a": 0, "b": 2 }));
}

#[test]
fn test_json_edges_follow_node_positions_after_delete() {
    let mut graph = sample_graph();
    let first = graph.node_at(0).unwrap();
    graph.delete_node(first).unwrap();
    let data = graph.to_data();
    assert_eq!(data.node_data.len(), 2);
    assert_eq!(data.edges.len(), 1);
    assert_eq!((data.edges[0].a, data.edges[0].b), (0, 1));
}

#[test]
fn test_json_load_and_evaluate() {
    let input = r#"{
        "node_data": [
            {"src": "\"a,b\"", "x": 0, "y": 0, "w": 100, "h": 50},
            {"title": "parts", "src": "split \",\" a", "x": 10, "y": 0, "w": 100, "h": 50}
        ],
        "edges": [{"a": 0, "b": 1}]
    }"#;
    let mut graph = Graph::from_json(input).unwrap();
    graph.recompute_all().unwrap();
    let parts = graph.node_at(1).unwrap();
    assert_eq!(graph.node(parts).unwrap().title.as_deref(), Some("parts"));
    assert_eq!(text(&graph, parts), "[\"a\", \"b\"]");
}

#[test]
fn test_json_rejects_bad_edge() {
    let input = r#"{"node_data": [{"src": "1", "x": 0, "y": 0, "w": 0, "h": 0}], "edges": [{"a": 0, "b": 3}]}"#;
    match Graph::from_json(input) {
        Err(GraphError::InvalidEdge { a, b, nodes }) => assert_eq!((a, b, nodes), (0, 3, 1)),
        other => panic!("expected invalid edge, got {:?}", other.map(|g| g.len())),
    }
    assert!(matches!(
        Graph::from_json("{not json"),
        Err(GraphError::Json(_))
    ));
}

#[test]
fn test_json_load_replaces_contents() {
    let mut graph = sample_graph();
    graph
        .load_json(r#"{"node_data": [{"src": "1", "x": 0, "y": 0, "w": 0, "h": 0}], "edges": []}"#)
        .unwrap();
    assert_eq!(graph.len(), 1);
    assert!(graph.edges().is_empty());
    assert!(graph.root().lookup("len").is_some());
}

// ── Session FFI ─────────────────────────────────────────────────────

unsafe fn take_c_string(ptr: *const u8) -> String {
    let s = unsafe { std::ffi::CStr::from_ptr(ptr as *const std::ffi::c_char) }
        .to_str()
        .unwrap()
        .to_string();
    unsafe { crate::dealloc(ptr as *mut u8, s.len() + 1) };
    s
}

fn ffi_json(ptr: *const u8) -> serde_json::Value {
    let s = unsafe { take_c_string(ptr) };
    serde_json::from_str(&s).unwrap()
}

#[test]
fn test_ffi_session() {
    let id = crate::wasm_graph_new();
    let data = r#"{"node_data": [{"src": "2", "x": 0, "y": 0, "w": 0, "h": 0}, {"src": "a * 2", "x": 0, "y": 0, "w": 0, "h": 0}], "edges": [{"a": 0, "b": 1}]}"#;

    let status = ffi_json(unsafe { crate::wasm_graph_load(id, data.as_ptr(), data.len()) });
    assert_eq!(status["ok"], true);
    let output = ffi_json(crate::wasm_graph_output(id, 1));
    assert_eq!(output["kind"], "ok");
    assert_eq!(output["text"], "4");

    let src = "5";
    let status = ffi_json(unsafe { crate::wasm_graph_set_source(id, 0, src.as_ptr(), src.len()) });
    assert_eq!(status["ok"], true);
    let status = ffi_json(crate::wasm_graph_recompute(id, 0));
    assert_eq!(status["ok"], true);
    assert_eq!(ffi_json(crate::wasm_graph_output(id, 1))["value"], 10.0);

    let src = "a + \"!\"";
    let index = unsafe { crate::wasm_graph_add_node(id, src.as_ptr(), src.len()) };
    assert_eq!(index, 2);
    assert_eq!(ffi_json(crate::wasm_graph_add_edge(id, 1, 2))["ok"], true);
    ffi_json(crate::wasm_graph_recompute(id, 1));
    let output = ffi_json(crate::wasm_graph_output(id, 2));
    assert_eq!(output["kind"], "err");
    assert_eq!(
        output["message"],
        "Operand to the right of '+': Expected number, found string"
    );

    let status = ffi_json(crate::wasm_graph_recompute(id, 9));
    assert_eq!(status["code"], "graph-node-index-out-of-range");

    assert_eq!(ffi_json(crate::wasm_graph_delete_node(id, 0))["ok"], true);
    let saved = ffi_json(crate::wasm_graph_save(id));
    assert_eq!(saved["node_data"].as_array().unwrap().len(), 2);
    assert_eq!(saved["edges"], serde_json::json!([{ "a": 0, "b": 1 }]));

    crate::wasm_graph_free(id);
    assert!(ffi_json(crate::wasm_graph_output(id, 0)).is_null());
    assert_eq!(ffi_json(crate::wasm_graph_recompute(id, 0))["code"], "unknown-session");
}
