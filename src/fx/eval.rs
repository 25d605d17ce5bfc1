//! Interpreter for parsed FX expressions
//!
//! Values are `serde_json::Value`s. Operators follow the loose,
//! JavaScript-flavoured semantics users write in bound props (`+` joins
//! strings, `||` returns an operand, `==` coerces numbers), but only the
//! grammar in [`crate::fx::ast`] and a fixed set of functions exist.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::ast::{BinaryOp, Expr, Literal, UnaryOp};
use super::context::EvalContext;

/// Runtime failures while evaluating an expression
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("{name} is not defined")]
    Undefined { name: String },

    #[error("Cannot read properties of null (reading '{property}')")]
    NullAccess { property: String },

    #[error("{callee} is not a function")]
    NotCallable { callee: String },

    #[error("{type_name}.{method} is not a supported method")]
    UnknownMethod { type_name: String, method: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },
}

type Builtin = fn(&[Value]) -> Result<Value, EvalError>;

/// Evaluate an expression against a context
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Number(n) => number_value(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
        }),
        Expr::Ident(name) => ctx
            .lookup(name)
            .ok_or_else(|| EvalError::Undefined { name: name.clone() }),
        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), evaluate(value, ctx)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
            Ok(eval_link(expr, ctx)?.unwrap_or(Value::Null))
        }
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, ctx)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Neg => number_value(-to_number(&value)),
                UnaryOp::Plus => number_value(to_number(&value)),
            })
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, ctx),
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if truthy(&evaluate(cond, ctx)?) {
                evaluate(then, ctx)
            } else {
                evaluate(otherwise, ctx)
            }
        }
    }
}

/// Evaluate a member/index/call chain. `None` means an optional link
/// (`?.`) hit null and the rest of the chain short-circuited.
fn eval_link(expr: &Expr, ctx: &EvalContext) -> Result<Option<Value>, EvalError> {
    if let Expr::Member { .. } = expr {
        if let Some((root, links)) = member_chain(expr) {
            return eval_member_chain(root, &links, ctx);
        }
    }
    match expr {
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let Some(base) = eval_link(object, ctx)? else {
                return Ok(None);
            };
            if base.is_null() {
                if *optional {
                    return Ok(None);
                }
                return Err(EvalError::NullAccess {
                    property: property.clone(),
                });
            }
            Ok(Some(get_property(&base, property)))
        }
        Expr::Index { object, index } => {
            let Some(base) = eval_link(object, ctx)? else {
                return Ok(None);
            };
            let key = evaluate(index, ctx)?;
            if base.is_null() {
                return Err(EvalError::NullAccess {
                    property: to_js_string(&key),
                });
            }
            Ok(Some(get_index(&base, &key)))
        }
        Expr::Call { callee, args } => eval_call(callee, args, ctx),
        other => evaluate(other, ctx).map(Some),
    }
}

/// Root identifier and `(property, optional)` links of a plain
/// `a.b?.c` chain
fn member_chain(expr: &Expr) -> Option<(&str, Vec<(&str, bool)>)> {
    match expr {
        Expr::Ident(name) => Some((name.as_str(), Vec::new())),
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let (root, mut links) = member_chain(object)?;
            links.push((property.as_str(), *optional));
            Some((root, links))
        }
        _ => None,
    }
}

/// Walk object keys inside the context by reference, then apply the
/// remaining links to the cloned value
fn eval_member_chain(
    root: &str,
    links: &[(&str, bool)],
    ctx: &EvalContext,
) -> Result<Option<Value>, EvalError> {
    let keys: Vec<&str> = links.iter().map(|(key, _)| *key).collect();
    let (mut value, used) = ctx
        .lookup_path(root, &keys)
        .ok_or_else(|| EvalError::Undefined {
            name: root.to_string(),
        })?;
    for (property, optional) in &links[used..] {
        if value.is_null() {
            if *optional {
                return Ok(None);
            }
            return Err(EvalError::NullAccess {
                property: property.to_string(),
            });
        }
        value = get_property(&value, property);
    }
    Ok(Some(value))
}

fn eval_call(callee: &Expr, args: &[Expr], ctx: &EvalContext) -> Result<Option<Value>, EvalError> {
    let eval_args = || -> Result<Vec<Value>, EvalError> {
        args.iter().map(|a| evaluate(a, ctx)).collect()
    };

    if let Some(path) = callee.dotted_path() {
        if let Some(function) = global_function(&path) {
            return function(&eval_args()?).map(Some);
        }
    }

    match callee {
        Expr::Member {
            object,
            property,
            optional,
        } => {
            let Some(receiver) = eval_link(object, ctx)? else {
                return Ok(None);
            };
            if receiver.is_null() {
                if *optional {
                    return Ok(None);
                }
                return Err(EvalError::NullAccess {
                    property: property.clone(),
                });
            }
            call_method(&receiver, property, &eval_args()?).map(Some)
        }
        other => Err(EvalError::NotCallable {
            callee: other.dotted_path().unwrap_or_else(|| "expression".to_string()),
        }),
    }
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    // Short-circuiting operators return an operand, not a boolean
    match op {
        BinaryOp::And => {
            let l = evaluate(left, ctx)?;
            return if truthy(&l) { evaluate(right, ctx) } else { Ok(l) };
        }
        BinaryOp::Or => {
            let l = evaluate(left, ctx)?;
            return if truthy(&l) { Ok(l) } else { evaluate(right, ctx) };
        }
        BinaryOp::Nullish => {
            let l = evaluate(left, ctx)?;
            return if l.is_null() { evaluate(right, ctx) } else { Ok(l) };
        }
        _ => {}
    }

    let l = evaluate(left, ctx)?;
    let r = evaluate(right, ctx)?;
    Ok(match op {
        BinaryOp::Add => {
            if is_stringish(&l) || is_stringish(&r) {
                Value::String(format!("{}{}", to_js_string(&l), to_js_string(&r)))
            } else {
                number_value(to_number(&l) + to_number(&r))
            }
        }
        BinaryOp::Sub => number_value(to_number(&l) - to_number(&r)),
        BinaryOp::Mul => number_value(to_number(&l) * to_number(&r)),
        BinaryOp::Div | BinaryOp::Rem => {
            let divisor = to_number(&r);
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let dividend = to_number(&l);
            number_value(if op == BinaryOp::Div {
                dividend / divisor
            } else {
                dividend % divisor
            })
        }
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            Value::Bool(compare(op, &l, &r))
        }
        BinaryOp::Eq => Value::Bool(loose_eq(&l, &r)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(&l, &r)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(&l, &r)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_eq(&l, &r)),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => unreachable!("handled above"),
    })
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return match op {
            BinaryOp::Less => a < b,
            BinaryOp::LessOrEqual => a <= b,
            BinaryOp::Greater => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (to_number(l), to_number(r));
    match op {
        BinaryOp::Less => a < b,
        BinaryOp::LessOrEqual => a <= b,
        BinaryOp::Greater => a > b,
        _ => a >= b,
    }
}

fn get_property(base: &Value, property: &str) -> Value {
    match (base, property) {
        (Value::Array(items), "length") => Value::from(items.len()),
        (Value::String(s), "length") => Value::from(s.chars().count()),
        (Value::Object(map), key) => map.get(key).cloned().unwrap_or(Value::Null),
        (Value::Array(items), key) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn get_index(base: &Value, key: &Value) -> Value {
    match (base, key) {
        (Value::Array(items), Value::Number(n)) => n
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .and_then(|f| items.get(f as usize).cloned())
            .unwrap_or(Value::Null),
        (Value::String(s), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| s.chars().nth(i as usize))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => get_property(base, &to_js_string(key)),
    }
}

fn global_function(path: &str) -> Option<Builtin> {
    let f: Builtin = match path {
        "Math.min" => |args| Ok(number_value(args.iter().map(to_number).fold(f64::INFINITY, f64::min))),
        "Math.max" => |args| Ok(number_value(args.iter().map(to_number).fold(f64::NEG_INFINITY, f64::max))),
        "Math.round" => |args| Ok(number_value((first_number(args) + 0.5).floor())),
        "Math.floor" => |args| Ok(number_value(first_number(args).floor())),
        "Math.ceil" => |args| Ok(number_value(first_number(args).ceil())),
        "Math.abs" => |args| Ok(number_value(first_number(args).abs())),
        "String" => |args| Ok(Value::String(args.first().map(to_js_string).unwrap_or_default())),
        "Number" => |args| Ok(number_value(args.first().map(to_number).unwrap_or(0.0))),
        "Boolean" => |args| Ok(Value::Bool(args.first().is_some_and(truthy))),
        "JSON.stringify" => |args| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            serde_json::to_string(&value)
                .map(Value::String)
                .map_err(|e| EvalError::InvalidArgument {
                    function: "JSON.stringify".to_string(),
                    message: e.to_string(),
                })
        },
        "JSON.parse" => |args| {
            let text = args.first().map(to_js_string).unwrap_or_default();
            serde_json::from_str(&text).map_err(|e| EvalError::InvalidArgument {
                function: "JSON.parse".to_string(),
                message: e.to_string(),
            })
        },
        _ => return None,
    };
    Some(f)
}

fn first_number(args: &[Value]) -> f64 {
    args.first().map(to_number).unwrap_or(f64::NAN)
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(to_js_string).unwrap_or_default()
}

/// Resolve JS-style `slice` bounds (negative counts from the end)
fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let resolve = |v: Option<&Value>, default: usize| -> usize {
        match v {
            None | Some(Value::Null) => default,
            Some(v) => {
                let n = to_number(v);
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    len.saturating_sub((-n) as usize)
                } else {
                    (n as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    match receiver {
        Value::String(s) => match method {
            "toUpperCase" => Ok(Value::String(s.to_uppercase())),
            "toLowerCase" => Ok(Value::String(s.to_lowercase())),
            "trim" => Ok(Value::String(s.trim().to_string())),
            "includes" => Ok(Value::Bool(s.contains(&string_arg(args, 0)))),
            "startsWith" => Ok(Value::Bool(s.starts_with(&string_arg(args, 0)))),
            "endsWith" => Ok(Value::Bool(s.ends_with(&string_arg(args, 0)))),
            "slice" => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = slice_bounds(args, chars.len());
                Ok(Value::String(chars[start..end].iter().collect()))
            }
            _ => Err(unknown_method("String", method)),
        },
        Value::Array(items) => match method {
            "includes" => {
                let needle = args.first().cloned().unwrap_or(Value::Null);
                Ok(Value::Bool(items.iter().any(|i| strict_eq(i, &needle))))
            }
            "join" => {
                let separator = match args.first() {
                    None | Some(Value::Null) => ",".to_string(),
                    Some(v) => to_js_string(v),
                };
                Ok(Value::String(
                    items
                        .iter()
                        .map(|i| if i.is_null() { String::new() } else { to_js_string(i) })
                        .collect::<Vec<_>>()
                        .join(&separator),
                ))
            }
            "slice" => {
                let (start, end) = slice_bounds(args, items.len());
                Ok(Value::Array(items[start..end].to_vec()))
            }
            _ => Err(unknown_method("Array", method)),
        },
        Value::Number(n) => match method {
            "toFixed" => {
                let digits = args.first().map(to_number).unwrap_or(0.0).clamp(0.0, 20.0) as usize;
                Ok(Value::String(format!(
                    "{:.*}",
                    digits,
                    n.as_f64().unwrap_or_default()
                )))
            }
            _ => Err(unknown_method("Number", method)),
        },
        _ => Err(unknown_method(type_name(receiver), method)),
    }
}

fn unknown_method(type_name: &str, method: &str) -> EvalError {
    EvalError::UnknownMethod {
        type_name: type_name.to_string(),
        method: method.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn is_stringish(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

/// Build a JSON number, keeping integral values integral. Non-finite
/// results have no JSON form and become null.
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Numeric coercion (`Number(x)`)
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(items) if items.is_empty() => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// String coercion used by `+` and `String(x)`; objects render as JSON
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i64),
            Some(f) => format!("{}", f),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|i| if i.is_null() { String::new() } else { to_js_string(i) })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Standard truthiness: null, false, 0, NaN and "" are falsy
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn strict_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => l == r,
    }
}

fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => to_number(l) == to_number(r),
        _ => strict_eq(l, r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::parse;
    use serde_json::json;

    fn eval(src: &str, ctx: &EvalContext) -> Result<Value, EvalError> {
        let expr = parse(src).expect("Should parse");
        evaluate(&expr, ctx)
    }

    fn eval_ok(src: &str) -> Value {
        eval(src, &EvalContext::new()).expect("Should evaluate")
    }

    #[test]
    fn test_arithmetic_stays_integral() {
        assert_eq!(eval_ok("1 + 1"), json!(2));
        assert_eq!(eval_ok("7 % 4 * 2"), json!(6));
        assert_eq!(eval_ok("1 / 4"), json!(0.25));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_ok("'Hello ' + 'world'"), json!("Hello world"));
        assert_eq!(eval_ok("'n=' + 3"), json!("n=3"));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval_ok("null || 'fallback'"), json!("fallback"));
        assert_eq!(eval_ok("0 ?? 5"), json!(0));
        assert_eq!(eval_ok("null ?? 5"), json!(5));
        assert_eq!(eval_ok("'a' && 'b'"), json!("b"));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval_ok("'1' == 1"), json!(true));
        assert_eq!(eval_ok("'1' === 1"), json!(false));
        assert_eq!(eval_ok("null == undefined"), json!(true));
        assert_eq!(eval_ok("2 !== 2.0"), json!(false));
    }

    #[test]
    fn test_widget_and_query_access() {
        let ctx = EvalContext::new()
            .with_component("textInput1", json!({"value": "abc"}))
            .with_query("getUsers", json!([{"name": "ada"}]), false);
        assert_eq!(eval("textInput1.value", &ctx).unwrap(), json!("abc"));
        assert_eq!(
            eval("components.textInput1.value.length", &ctx).unwrap(),
            json!(3)
        );
        assert_eq!(eval("getUsers.data[0].name", &ctx).unwrap(), json!("ada"));
        assert_eq!(
            eval("queries.getUsers.isFetching ? 'loading' : 'ready'", &ctx).unwrap(),
            json!("ready")
        );
    }

    #[test]
    fn test_member_chain_through_context_roots() {
        let ctx = EvalContext::new()
            .with_component("table1", json!({"selectedRow": {"id": 7}}))
            .with_state(json!({"items": [1, 2, 3]}));
        assert_eq!(eval("components.table1.selectedRow.id", &ctx).unwrap(), json!(7));
        assert_eq!(eval("state.items.length", &ctx).unwrap(), json!(3));
        assert_eq!(eval("components.ghost?.value", &ctx).unwrap(), Value::Null);
        assert_eq!(
            eval("components.ghost.value", &ctx).unwrap_err(),
            EvalError::NullAccess {
                property: "value".to_string()
            }
        );
    }

    #[test]
    fn test_undefined_identifier_is_error() {
        let err = eval("nope.value", &EvalContext::new()).unwrap_err();
        assert_eq!(err, EvalError::Undefined { name: "nope".to_string() });
    }

    #[test]
    fn test_null_access_and_optional_chaining() {
        let ctx = EvalContext::new().with_state(json!({"user": null}));
        assert!(matches!(
            eval("state.user.name", &ctx),
            Err(EvalError::NullAccess { .. })
        ));
        assert_eq!(eval("state.user?.name.first", &ctx).unwrap(), Value::Null);
        assert_eq!(eval("state.user?.name.trim()", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_whitelisted_functions() {
        assert_eq!(eval_ok("Math.max(1, 9, 3)"), json!(9));
        assert_eq!(eval_ok("Math.round(2.5)"), json!(3));
        assert_eq!(eval_ok("String(12) + Number('3')"), json!("123"));
        assert_eq!(eval_ok("JSON.parse('[1,2]').length"), json!(2));
        assert_eq!(eval_ok("JSON.stringify({a: 1})"), json!("{\"a\":1}"));
    }

    #[test]
    fn test_methods() {
        assert_eq!(eval_ok("' Ab '.trim().toLowerCase()"), json!("ab"));
        assert_eq!(eval_ok("[1, 2, 3].join('-')"), json!("1-2-3"));
        assert_eq!(eval_ok("[1, 2, 3].slice(-2)"), json!([2, 3]));
        assert_eq!(eval_ok("'builder'.slice(0, 5)"), json!("build"));
        assert_eq!(eval_ok("(3.14159).toFixed(2)"), json!("3.14"));
        assert_eq!(eval_ok("['a', 'b'].includes('b')"), json!(true));
    }

    #[test]
    fn test_unknown_function_is_not_callable() {
        let err = eval("alert('x')", &EvalContext::new()).unwrap_err();
        assert_eq!(err, EvalError::NotCallable { callee: "alert".to_string() });
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            eval("'x'.replaceAll('x', 'y')", &EvalContext::new()),
            Err(EvalError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / 0", &EvalContext::new()), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(0)));
        assert!(truthy(&json!("0")));
        assert!(truthy(&json!([])));
    }
}
