use crate::ast::Expr;
use crate::error::EvalError;
use crate::interpreter::Scope;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Body of a built-in function: receives the argument and the scope of the
/// caller, which it may only use to apply function values it was given.
pub type NativeFn = Rc<dyn Fn(Value, &Scope) -> Result<Value, EvalError>>;

/// A runtime value. Records and lists are immutable once built, so they
/// are shared rather than copied.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Record(Rc<IndexMap<String, Value>>),
    List(Rc<Vec<Value>>),
    Lambda(Rc<Lambda>),
}

/// A one-parameter function value.
pub enum Lambda {
    /// A user function. `scope` is the live scope it was created in, not a
    /// snapshot: later `let`s in that scope are visible to the body.
    Closure {
        param: String,
        body: Rc<Expr>,
        scope: Scope,
    },
    Native {
        param: &'static str,
        func: NativeFn,
    },
}

impl Lambda {
    pub fn param(&self) -> &str {
        match self {
            Lambda::Closure { param, .. } => param,
            Lambda::Native { param, .. } => param,
        }
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lambda::Closure { param, body, .. } => f
                .debug_struct("Closure")
                .field("param", param)
                .field("body", body)
                .finish_non_exhaustive(),
            Lambda::Native { param, .. } => f
                .debug_struct("Native")
                .field("param", param)
                .finish_non_exhaustive(),
        }
    }
}

impl Value {
    pub fn record(fields: IndexMap<String, Value>) -> Self {
        Value::Record(Rc::new(fields))
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Rc::new(elements))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn boolean(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }

    pub fn native(
        param: &'static str,
        func: impl Fn(Value, &Scope) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Value::Lambda(Rc::new(Lambda::Native {
            param,
            func: Rc::new(func),
        }))
    }

    /// The kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Lambda(_) => "lambda",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical display text, as shown under a node.
    pub fn stringify(&self) -> String {
        self.to_string()
    }

    /// Convert to JSON for hosts that want structured output.
    pub fn to_json(&self) -> serde_json::Value {
        crate::json::value_to_json(self)
    }
}

/// Structural equality as the `==` operator sees it.
///
/// Numbers and strings compare by value and records by key set and field
/// values, ignoring field order. Lists and lambdas never compare equal,
/// not even to themselves, and neither do values of different kinds.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Record(a), Value::Record(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, l)| b.get(key).is_some_and(|r| values_equal(l, r)))
        }
        _ => false,
    }
}

/// Render a number the way the editor displays it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // Integral values within the exactly-representable range print
    // without a fractional part (this also maps -0 to "0").
    if n.fract() == 0.0 && n.abs() < (1u64 << 53) as f64 {
        return (n as i64).to_string();
    }
    format!("{}", n)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Record(fields) => {
                f.write_str("{ ")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str(" }")
            }
            Value::List(elements) => {
                f.write_str("[")?;
                for (i, value) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            Value::Lambda(lambda) => write!(f, "lambda<{}>", lambda.param()),
        }
    }
}
