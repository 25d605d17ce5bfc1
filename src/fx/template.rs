//! Expression and template modes for bound prop values
//!
//! A bound value is a string containing `{{ ... }}` segments. In
//! expression mode the whole value is one expression and may produce any
//! JSON value. In template mode literal text is kept and every segment is
//! substituted in place, unless the value is exactly one segment, in
//! which case it behaves like expression mode.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ParseError;

use super::context::EvalContext;
use super::eval::{evaluate, to_js_string, EvalError};
use super::grammar::parse;

/// Failure of a bound value, reported to callers as a value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    #[error("{}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<Vec<ParseError>> for FxError {
    fn from(errors: Vec<ParseError>) -> Self {
        FxError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A piece of a template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// Expression source between the delimiters, untrimmed
    Expr(&'a str),
}

/// True when the value contains at least one complete `{{ }}` segment
pub fn is_bound(raw: &str) -> bool {
    split_segments(raw)
        .iter()
        .any(|s| matches!(s, Segment::Expr(_)))
}

/// Split a template into literal text and expression segments.
///
/// Braces inside a segment are balanced so object literals such as
/// `{{ {a: {b: 1}} }}` stay in one segment. An unterminated `{{` is
/// literal text.
pub fn split_segments(raw: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find("{{") {
        let body_start = open + 2;
        let Some(body_len) = find_close(&rest[body_start..]) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Expr(&rest[body_start..body_start + body_len]));
        rest = &rest[body_start + body_len + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

/// Byte length of a segment body up to its closing `}}`
fn find_close(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Strip one outer `{{ }}` wrapper if the whole trimmed value is a single segment
pub fn strip_wrapper(raw: &str) -> &str {
    let trimmed = raw.trim();
    match split_segments(trimmed).as_slice() {
        [Segment::Expr(inner)] => inner.trim(),
        _ => trimmed,
    }
}

/// Expression mode: evaluate the whole value as one expression
pub fn resolve_expression(raw: &str, ctx: &EvalContext) -> Result<Value, FxError> {
    let source = strip_wrapper(raw);
    if source.is_empty() {
        return Ok(Value::Null);
    }
    let expr = parse(source)?;
    Ok(evaluate(&expr, ctx)?)
}

/// Template mode: substitute each segment into the surrounding text
pub fn resolve_template(raw: &str, ctx: &EvalContext) -> Result<Value, FxError> {
    let segments = split_segments(raw.trim());
    match segments.as_slice() {
        [] => return Ok(Value::String(raw.to_string())),
        [Segment::Expr(_)] => return resolve_expression(raw, ctx),
        _ => {}
    }
    if !segments.iter().any(|s| matches!(s, Segment::Expr(_))) {
        return Ok(Value::String(raw.to_string()));
    }

    let mut out = String::new();
    // Leading/trailing whitespace of the raw value is literal text too
    for segment in split_segments(raw) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Expr(source) => {
                tracing::trace!(source, "evaluating template segment");
                let value = resolve_expression(source, ctx)?;
                out.push_str(&template_text(&value));
            }
        }
    }
    Ok(Value::String(out))
}

/// Text substituted for a segment; null renders as nothing
fn template_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => to_js_string(other),
    }
}

/// Resolve any JSON prop value: strings go through template mode,
/// arrays and objects are resolved element-wise
pub fn resolve_value(value: &Value, ctx: &EvalContext) -> Result<Value, FxError> {
    match value {
        Value::String(s) => resolve_template(s, ctx),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(key.clone(), resolve_value(item, ctx)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Resolve a bound value, keeping `previous` when evaluation fails.
///
/// Returns the value to display and the error to surface as an inline
/// hint, if any.
pub fn resolve_or_keep(previous: &Value, raw: &str, ctx: &EvalContext) -> (Value, Option<FxError>) {
    match resolve_template(raw, ctx) {
        Ok(value) => (value, None),
        Err(err) => (previous.clone(), Some(err)),
    }
}

/// Result of resolving a whole prop map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedProps {
    pub values: Map<String, Value>,
    /// Prop name -> failure; the prop keeps its previous (or raw) value
    pub errors: Vec<(String, FxError)>,
}

/// Resolve every prop of a widget. Failed props keep the value from
/// `previous` if present, otherwise their raw value.
pub fn resolve_props(
    props: &Map<String, Value>,
    previous: Option<&Map<String, Value>>,
    ctx: &EvalContext,
) -> ResolvedProps {
    let mut resolved = ResolvedProps::default();
    for (key, raw) in props {
        match resolve_value(raw, ctx) {
            Ok(value) => {
                resolved.values.insert(key.clone(), value);
            }
            Err(err) => {
                let kept = previous
                    .and_then(|p| p.get(key))
                    .cloned()
                    .unwrap_or_else(|| raw.clone());
                resolved.values.insert(key.clone(), kept);
                resolved.errors.push((key.clone(), err));
            }
        }
    }
    resolved
}
