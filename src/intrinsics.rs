//! Built-in functions. Every intrinsic takes one argument and returns
//! either its result or the next native in its curried chain.

use crate::error::EvalError;
use crate::interpreter::Scope;
use crate::value::{format_number, Value};
use indexmap::IndexMap;
use regex::Regex;
use std::rc::Rc;
use std::sync::OnceLock;

/// Register every intrinsic in `scope`.
pub fn install(scope: &Scope) {
    install_list_module(scope);
    install_string_module(scope);
    install_number_module(scope);
}

// ── Argument checks ─────────────────────────────────────────────────

fn mismatch(function: &str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context: function.to_string(),
        expected,
        found: found.kind(),
    }
}

fn expect_list(function: &str, value: &Value) -> Result<Rc<Vec<Value>>, EvalError> {
    match value {
        Value::List(elements) => Ok(Rc::clone(elements)),
        other => Err(mismatch(function, "list", other)),
    }
}

fn expect_number(function: &str, value: &Value) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| mismatch(function, "number", value))
}

fn expect_string(function: &str, value: Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(mismatch(function, "string", &other)),
    }
}

fn expect_lambda(function: &str, value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Lambda(_) => Ok(value),
        other => Err(mismatch(function, "lambda", &other)),
    }
}

/// Resolve a count against a length the way a slice does: truncate toward
/// zero, count negative values from the end, clamp to `0..=len`.
fn slice_bound(count: f64, len: usize) -> usize {
    if count.is_nan() {
        return 0;
    }
    let count = count.trunc();
    let len_f = len as f64;
    if count < 0.0 {
        (len_f + count).max(0.0) as usize
    } else {
        count.min(len_f) as usize
    }
}

// ── Lists ───────────────────────────────────────────────────────────

fn install_list_module(scope: &Scope) {
    scope.define(
        "len",
        Value::native("list", |list, _| {
            let list = expect_list("len", &list)?;
            Ok(Value::Number(list.len() as f64))
        }),
    );

    scope.define(
        "first",
        Value::native("list", |list, _| {
            let list = expect_list("first", &list)?;
            list.first()
                .cloned()
                .ok_or(EvalError::EmptyListAccess { function: "first" })
        }),
    );

    scope.define(
        "last",
        Value::native("list", |list, _| {
            let list = expect_list("last", &list)?;
            list.last()
                .cloned()
                .ok_or(EvalError::EmptyListAccess { function: "last" })
        }),
    );

    scope.define(
        "take",
        Value::native("count", |count, _| {
            let count = expect_number("take", &count)?;
            Ok(Value::native("list", move |list, _| {
                let list = expect_list("take", &list)?;
                let end = slice_bound(count, list.len());
                Ok(Value::list(list[..end].to_vec()))
            }))
        }),
    );

    scope.define(
        "skip",
        Value::native("count", |count, _| {
            let count = expect_number("skip", &count)?;
            Ok(Value::native("list", move |list, _| {
                let list = expect_list("skip", &list)?;
                let start = slice_bound(count, list.len());
                Ok(Value::list(list[start..].to_vec()))
            }))
        }),
    );

    scope.define(
        "nth",
        Value::native("index", |index, _| {
            let index = expect_number("nth", &index)?;
            Ok(Value::native("list", move |list, _| {
                let list = expect_list("nth", &list)?;
                let in_bounds = index >= 0.0 && index.fract() == 0.0 && index < list.len() as f64;
                if !in_bounds {
                    return Err(EvalError::IndexOutOfBounds {
                        index,
                        len: list.len(),
                    });
                }
                Ok(list[index as usize].clone())
            }))
        }),
    );

    scope.define(
        "map",
        Value::native("mapper", |mapper, _| {
            let mapper = expect_lambda("map", mapper)?;
            Ok(Value::native("list", move |list, caller| {
                let list = expect_list("map", &list)?;
                let mapped = list
                    .iter()
                    .map(|element| caller.apply(&mapper, element.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(mapped))
            }))
        }),
    );

    scope.define(
        "filter",
        Value::native("predicate", |predicate, _| {
            let predicate = expect_lambda("filter", predicate)?;
            Ok(Value::native("list", move |list, caller| {
                let list = expect_list("filter", &list)?;
                let mut kept = Vec::new();
                for element in list.iter() {
                    let verdict = caller.apply(&predicate, element.clone())?;
                    // Non-numbers count as false.
                    if matches!(verdict, Value::Number(n) if n != 0.0) {
                        kept.push(element.clone());
                    }
                }
                Ok(Value::list(kept))
            }))
        }),
    );

    scope.define(
        "reduce",
        Value::native("acc", |accumulator, _| {
            let accumulator = expect_lambda("reduce", accumulator)?;
            Ok(Value::native("seed", move |seed, _| {
                let accumulator = accumulator.clone();
                Ok(Value::native("list", move |list, caller| {
                    let list = expect_list("reduce", &list)?;
                    let mut acc = seed.clone();
                    for element in list.iter() {
                        let step = caller.apply(&accumulator, acc)?;
                        let step = expect_lambda("reduce", step)?;
                        acc = caller.apply(&step, element.clone())?;
                    }
                    Ok(acc)
                }))
            }))
        }),
    );

    scope.define(
        "append",
        Value::native("value", |value, _| {
            Ok(Value::native("list", move |list, _| {
                let list = expect_list("append", &list)?;
                let mut extended = Vec::with_capacity(list.len() + 1);
                extended.extend(list.iter().cloned());
                extended.push(value.clone());
                Ok(Value::list(extended))
            }))
        }),
    );
}

// ── Numbers ─────────────────────────────────────────────────────────

fn install_number_module(scope: &Scope) {
    scope.define(
        "toStr",
        Value::native("num", |num, _| {
            let num = expect_number("toStr", &num)?;
            Ok(Value::String(format_number(num)))
        }),
    );
}

/// The longest numeric prefix of `input` after leading whitespace, read
/// as a float: digits with an optional fraction and exponent, or
/// `Infinity`, each with an optional sign.
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = PREFIX.get_or_init(|| {
        Regex::new(r"^[+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
            .expect("numeric prefix pattern is valid")
    });
    let m = re.find(input.trim_start())?;
    m.as_str().parse().ok()
}

// ── Strings ─────────────────────────────────────────────────────────

fn install_string_module(scope: &Scope) {
    scope.define(
        "split",
        Value::native("splitter", |splitter, _| {
            let splitter = expect_string("split", splitter)?;
            Ok(Value::native("str", move |input, _| {
                let input = expect_string("split", input)?;
                let parts: Vec<Value> = if splitter.is_empty() {
                    input.chars().map(|c| Value::String(c.to_string())).collect()
                } else {
                    input.split(splitter.as_str()).map(Value::string).collect()
                };
                Ok(Value::list(parts))
            }))
        }),
    );

    scope.define(
        "regex",
        Value::native("pattern", |pattern, _| {
            let pattern = expect_string("regex", pattern)?;
            Ok(Value::native("str", move |input, _| {
                let input = expect_string("regex", input)?;
                regex_groups(&pattern, &input)
            }))
        }),
    );

    scope.define(
        "isNum",
        Value::native("str", |input, _| {
            let input = expect_string("isNum", input)?;
            let parsed = parse_float_prefix(&input).filter(|n| !n.is_nan());
            Ok(Value::boolean(parsed.is_some()))
        }),
    );

    scope.define(
        "toNum",
        Value::native("str", |input, _| {
            let input = expect_string("toNum", input)?;
            match parse_float_prefix(&input) {
                Some(n) if !n.is_nan() => Ok(Value::Number(n)),
                _ => Err(EvalError::NotANumber { input }),
            }
        }),
    );

    scope.define(
        "starts_with",
        Value::native("prefix", |prefix, _| {
            let prefix = expect_string("starts_with", prefix)?;
            Ok(Value::native("str", move |input, _| {
                let input = expect_string("starts_with", input)?;
                Ok(Value::boolean(input.starts_with(prefix.as_str())))
            }))
        }),
    );

    scope.define(
        "scan",
        Value::native("acc", |accumulator, _| {
            let accumulator = expect_lambda("scan", accumulator)?;
            Ok(Value::native("seed", move |seed, _| {
                let accumulator = accumulator.clone();
                Ok(Value::native("str", move |input, caller| {
                    let input = expect_string("scan", input)?;
                    scan(caller, &accumulator, seed.clone(), &input)
                }))
            }))
        }),
    );
}

/// Run `pattern` once against `input`, returning one field per named group.
fn regex_groups(pattern: &str, input: &str) -> Result<Value, EvalError> {
    let re = Regex::new(pattern).map_err(|e| EvalError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let mut fields = IndexMap::new();
    if let Some(caps) = re.captures(input) {
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                fields.insert(name.to_string(), Value::string(m.as_str()));
            }
        }
    }
    Ok(Value::record(fields))
}

/// Drive a scanner over `input`. The state is a record `{ i, value }`;
/// each step receives the state, then the rest of the input from offset
/// `i`, and must return the next state. A step that does not advance
/// `i` loops forever.
fn scan(caller: &Scope, accumulator: &Value, seed: Value, input: &str) -> Result<Value, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut state = Value::record(IndexMap::from([
        ("i".to_string(), Value::Number(0.0)),
        ("value".to_string(), seed),
    ]));
    let mut offset = 0.0;
    while offset < chars.len() as f64 {
        let step = caller.apply(accumulator, state)?;
        let step = expect_lambda("scan", step)?;
        let rest: String = chars[slice_bound(offset, chars.len())..].iter().collect();
        state = caller.apply(&step, Value::String(rest))?;
        offset = match &state {
            Value::Record(fields) => match fields.get("i") {
                Some(i) => expect_number("scan", i)?,
                None => {
                    return Err(EvalError::UndefinedField {
                        field: "i".to_string(),
                    })
                }
            },
            other => return Err(mismatch("scan", "record", other)),
        };
    }
    Ok(state)
}
