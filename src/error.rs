use std::fmt;

use crate::graph::NodeId;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (character offset within the line)
    pub column: usize,
    /// 0-based character offset from the start of input
    pub offset: usize,
}

/// The lexer met a character outside the language's alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub character: char,
    pub position: Position,
}

impl LexError {
    pub fn code(&self) -> &'static str {
        "lex-unrecognized-character"
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unrecognized token '{}' at {}:{}",
            self.character, self.position.line, self.position.column
        )
    }
}

impl std::error::Error for LexError {}

/// The parser met a token (or the end of input) it could not use.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Description of the offending token, `None` at end of input.
    pub found: Option<String>,
    /// The kind of token or construct that was expected instead.
    pub expected: String,
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self.found {
            Some(_) => "parse-unexpected-token",
            None => "parse-unexpected-eof",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            Some(found) => write!(f, "Unexpected {}, expected {}", found, self.expected),
            None => write!(f, "Unexpected EOF, expected {}", self.expected),
        }
    }
}

impl std::error::Error for ParseError {}

/// Everything that can go wrong while evaluating a well-formed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UndefinedVariable {
        name: String,
    },
    /// Something other than a lambda sits in function position.
    ApplyNonFunction {
        found: &'static str,
    },
    /// An operator or intrinsic received an operand of the wrong kind.
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },
    FieldAccessOnNonRecord {
        field: String,
        found: &'static str,
    },
    UndefinedField {
        field: String,
    },
    EmptyListAccess {
        function: &'static str,
    },
    IndexOutOfBounds {
        index: f64,
        len: usize,
    },
    NonNumericCondition {
        found: &'static str,
    },
    /// A string did not convert to a number.
    NotANumber {
        input: String,
    },
    /// A `regex` pattern did not compile.
    InvalidPattern {
        pattern: String,
        message: String,
    },
}

impl EvalError {
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UndefinedVariable { .. } => "eval-undefined-variable",
            EvalError::ApplyNonFunction { .. } => "eval-apply-non-function",
            EvalError::TypeMismatch { .. } => "eval-type-mismatch",
            EvalError::FieldAccessOnNonRecord { .. } => "eval-field-access-on-non-record",
            EvalError::UndefinedField { .. } => "eval-undefined-field",
            EvalError::EmptyListAccess { .. } => "eval-empty-list",
            EvalError::IndexOutOfBounds { .. } => "eval-index-out-of-bounds",
            EvalError::NonNumericCondition { .. } => "eval-non-numeric-condition",
            EvalError::NotANumber { .. } => "eval-not-a-number",
            EvalError::InvalidPattern { .. } => "eval-invalid-pattern",
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedVariable { name } => write!(f, "Undefined variable {}", name),
            EvalError::ApplyNonFunction { found } => {
                write!(f, "Error during apply. Expected lambda, found {}", found)
            }
            EvalError::TypeMismatch {
                context,
                expected,
                found,
            } => write!(f, "{}: Expected {}, found {}", context, expected, found),
            EvalError::FieldAccessOnNonRecord { field, found } => write!(
                f,
                "Field access (.{}) only works on records, found {}",
                field, found
            ),
            EvalError::UndefinedField { field } => {
                write!(f, "Undefined field '{}' in record", field)
            }
            EvalError::EmptyListAccess { function } => write!(f, "{}: Empty list", function),
            EvalError::IndexOutOfBounds { index, len } => write!(
                f,
                "nth: Index {} out of bounds for list of length {}",
                crate::value::format_number(*index),
                len
            ),
            EvalError::NonNumericCondition { found } => write!(
                f,
                "Only numbers can be used as if conditions, found {}",
                found
            ),
            EvalError::NotANumber { input } => {
                write!(f, "toNum: String \"{}\" evaluates to NaN", input)
            }
            EvalError::InvalidPattern { pattern, message } => {
                write!(f, "regex: Invalid pattern \"{}\": {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Any failure on the way from source text to a value.
#[derive(Debug, Clone, PartialEq)]
pub enum LangError {
    Lex(LexError),
    Parse(ParseError),
    Eval(EvalError),
}

impl LangError {
    pub fn code(&self) -> &'static str {
        match self {
            LangError::Lex(e) => e.code(),
            LangError::Parse(e) => e.code(),
            LangError::Eval(e) => e.code(),
        }
    }
}

impl fmt::Display for LangError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LangError::Lex(e) => e.fmt(f),
            LangError::Parse(e) => e.fmt(f),
            LangError::Eval(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for LangError {}

impl From<LexError> for LangError {
    fn from(e: LexError) -> Self {
        LangError::Lex(e)
    }
}

impl From<ParseError> for LangError {
    fn from(e: ParseError) -> Self {
        LangError::Parse(e)
    }
}

impl From<EvalError> for LangError {
    fn from(e: EvalError) -> Self {
        LangError::Eval(e)
    }
}

/// Failures of the graph engine itself. These abort a whole graph
/// operation, unlike per-node language errors which land in the node's
/// output cache.
#[derive(Debug)]
pub enum GraphError {
    UnknownNode(NodeId),
    /// A serialized edge points outside `node_data`.
    InvalidEdge {
        a: usize,
        b: usize,
        nodes: usize,
    },
    /// A positional node index past the end of the node order.
    NodeIndexOutOfRange {
        index: usize,
        nodes: usize,
    },
    /// The node was reached again while it was still being resolved.
    CycleDetected(NodeId),
    Json(serde_json::Error),
}

impl GraphError {
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::UnknownNode(_) => "graph-unknown-node",
            GraphError::InvalidEdge { .. } => "graph-invalid-edge",
            GraphError::NodeIndexOutOfRange { .. } => "graph-node-index-out-of-range",
            GraphError::CycleDetected(_) => "graph-cycle-detected",
            GraphError::Json(_) => "graph-invalid-json",
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode(id) => write!(f, "Unknown node {}", id),
            GraphError::InvalidEdge { a, b, nodes } => write!(
                f,
                "Edge {} -> {} refers outside the {} serialized node(s)",
                a, b, nodes
            ),
            GraphError::NodeIndexOutOfRange { index, nodes } => {
                write!(f, "Node index {} out of range for {} node(s)", index, nodes)
            }
            GraphError::CycleDetected(id) => {
                write!(f, "Dependency cycle detected at node {}", id)
            }
            GraphError::Json(e) => write!(f, "Invalid graph data: {}", e),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Json(e)
    }
}
