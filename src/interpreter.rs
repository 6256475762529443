use crate::ast::*;
use crate::error::EvalError;
use crate::value::*;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct ScopeData {
    bindings: RefCell<IndexMap<String, Value>>,
    parent: Option<Scope>,
}

/// A lexical environment: local bindings plus an optional parent.
///
/// Cloning a `Scope` yields another handle to the same environment.
/// Closures hold such a handle, so bindings added after a closure was
/// created are still visible to it.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

impl Scope {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(IndexMap::new()),
            parent: None,
        }))
    }

    /// A fresh, empty scope whose lookups fall back to `self`.
    pub fn child(&self) -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(IndexMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Bind `name` in this scope, replacing any existing local binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Drop every local binding; the parent chain is untouched.
    pub fn clear(&self) {
        self.0.bindings.borrow_mut().clear();
    }

    /// Resolve `name`, walking outward through the parent chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            current = scope.0.parent.as_ref();
        }
        None
    }

    /// Names bound directly in this scope, in binding order.
    pub fn local_names(&self) -> Vec<String> {
        self.0.bindings.borrow().keys().cloned().collect()
    }

    pub fn same_as(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Evaluate an expression in this scope.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Ident(name) => self
                .lookup(name)
                .ok_or_else(|| EvalError::UndefinedVariable { name: name.clone() }),
            Expr::Field { base, fields } => {
                let mut current = self
                    .lookup(base)
                    .ok_or_else(|| EvalError::UndefinedVariable { name: base.clone() })?;
                for field in fields {
                    current = match &current {
                        Value::Record(record) => record
                            .get(field)
                            .cloned()
                            .ok_or_else(|| EvalError::UndefinedField {
                                field: field.clone(),
                            })?,
                        other => {
                            return Err(EvalError::FieldAccessOnNonRecord {
                                field: field.clone(),
                                found: other.kind(),
                            })
                        }
                    };
                }
                Ok(current)
            }
            Expr::Let { name, value, next } => {
                // `let` extends the current scope in place.
                let value = self.evaluate(value)?;
                self.define(name.clone(), value);
                self.evaluate(next)
            }
            Expr::Lambda { param, body } => Ok(Value::Lambda(Rc::new(Lambda::Closure {
                param: param.clone(),
                body: Rc::clone(body),
                scope: self.clone(),
            }))),
            Expr::Record(fields) => {
                let mut values = IndexMap::with_capacity(fields.len());
                for (name, field) in fields {
                    values.insert(name.clone(), self.evaluate(field)?);
                }
                Ok(Value::record(values))
            }
            Expr::List(elements) => {
                let values = elements
                    .iter()
                    .map(|e| self.evaluate(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => match self.evaluate(cond)? {
                Value::Number(n) if n != 0.0 => self.evaluate(then),
                Value::Number(_) => self.evaluate(otherwise),
                other => Err(EvalError::NonNumericCondition {
                    found: other.kind(),
                }),
            },
            Expr::Apply { callee, args } => {
                let mut current = self.evaluate(callee)?;
                for arg in args {
                    if !matches!(current, Value::Lambda(_)) {
                        return Err(EvalError::ApplyNonFunction {
                            found: current.kind(),
                        });
                    }
                    let arg = self.evaluate(arg)?;
                    current = self.apply(&current, arg)?;
                }
                Ok(current)
            }
            Expr::Pipe { seed, stages } => {
                let mut current = self.evaluate(seed)?;
                for stage in stages {
                    let func = self.evaluate(stage)?;
                    current = self.apply(&func, current)?;
                }
                Ok(current)
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                eval_binary(*op, left, right)
            }
        }
    }

    /// Apply a function value to one argument.
    ///
    /// Closures run in a new child of their captured scope; natives get
    /// `self` as the calling scope.
    pub fn apply(&self, func: &Value, arg: Value) -> Result<Value, EvalError> {
        let lambda = match func {
            Value::Lambda(lambda) => lambda,
            other => {
                return Err(EvalError::ApplyNonFunction {
                    found: other.kind(),
                })
            }
        };
        match lambda.as_ref() {
            Lambda::Closure { param, body, scope } => {
                let frame = scope.child();
                frame.define(param.clone(), arg);
                frame.evaluate(body)
            }
            Lambda::Native { func, .. } => func(arg, self),
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("locals", &self.local_names())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if let (BinaryOp::Add, Value::String(l), Value::String(r)) = (op, &left, &right) {
        return Ok(Value::String(format!("{}{}", l, r)));
    }
    if op == BinaryOp::Eq {
        return Ok(Value::boolean(values_equal(&left, &right)));
    }

    let l = operand(op, "left", &left)?;
    let r = operand(op, "right", &right)?;
    let n = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        // IEEE semantics: x/0 is an infinity or NaN, not an error.
        BinaryOp::Div => l / r,
        BinaryOp::Rem => l % r,
        BinaryOp::Eq => unreachable!("equality handled above"),
    };
    Ok(Value::Number(n))
}

fn operand(op: BinaryOp, side: &str, value: &Value) -> Result<f64, EvalError> {
    value.as_number().ok_or_else(|| EvalError::TypeMismatch {
        context: format!("Operand to the {} of '{}'", side, op),
        expected: "number",
        found: value.kind(),
    })
}
