//! Type coercion from raw values to declared field types.
//!
//! Casting is deliberately forgiving about inputs that HTTP layers produce:
//! numeric strings parse by their leading numeric prefix ("12.34" casts to
//! integer 12), booleans accept the usual token spellings, lists split on
//! commas. Already-correctly-typed values always pass through unchanged, so
//! non-HTTP callers can hand the engine native values.
//!
//! Null and empty-string inputs pass through untyped; whether that is
//! acceptable is the walker's question (required check, default
//! substitution), not the caster's.

use chrono::{NaiveDate, NaiveDateTime};
use smallvec::smallvec;

use crate::engine::RunOptions;
use crate::error::Messages;
use crate::plugin::{CastOutcome, Registry};
use crate::schema::{CastFn, FieldType};
use crate::value::Value;

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Casts a raw value to a field type, in priority order: blank passthrough,
/// `Passthrough` identity, user cast functions, list-of-element recursion,
/// then registry resolution (built-ins included, so a configured plugin may
/// shadow any built-in type).
pub fn cast(
    value: &Value,
    ty: &FieldType,
    opts: &RunOptions,
    registry: &Registry,
) -> Result<Value, Messages> {
    // Blank input defers to the walker's required/default handling. Function
    // types still see the blank value: they stand in for the type itself.
    if value.is_blank() && !matches!(ty, FieldType::Func(_)) {
        return Ok(value.clone());
    }

    match ty {
        FieldType::Passthrough => Ok(value.clone()),

        FieldType::Func(f) => {
            let outcome = match f {
                CastFn::OneArg(f) => f(value),
                CastFn::TwoArg(f) => f(value, &ty.type_id()),
                CastFn::ThreeArg(f) => f(value, &ty.type_id(), opts),
            };
            match outcome {
                CastOutcome::Cast(v) => Ok(v),
                CastOutcome::Fail(messages) => Err(messages),
                CastOutcome::NotHandled => Err(smallvec!["no cast available".to_owned()]),
            }
        }

        FieldType::ListOf(element) => {
            let items = split_into_items(value)?;
            let mut cast_items = Vec::with_capacity(items.len());
            let mut errors = Messages::new();
            for item in &items {
                match cast(item, element, opts, registry) {
                    Ok(v) => cast_items.push(v),
                    Err(messages) => {
                        for msg in messages {
                            if !errors.contains(&msg) {
                                errors.push(msg);
                            }
                        }
                    }
                }
            }
            if errors.is_empty() {
                Ok(Value::List(cast_items))
            } else {
                Err(errors)
            }
        }

        // The walker recurses into list-of-schema branches itself; a direct
        // cast keeps the raw value.
        FieldType::ListOfSchema(_) => Ok(value.clone()),

        _ => {
            let id = ty.type_id();
            if !registry.knows(&id) {
                return Err(smallvec![format!("unsupported type `{id}`")]);
            }
            for plugin in registry.candidates(&id) {
                match plugin.cast(value, &id, opts) {
                    CastOutcome::Cast(v) => return Ok(v),
                    CastOutcome::Fail(messages) => return Err(messages),
                    CastOutcome::NotHandled => {}
                }
            }
            Err(smallvec![format!("no cast available for type `{id}`")])
        }
    }
}

/// The raw form of a list field: native lists as-is, strings comma-split.
fn split_into_items(value: &Value) -> Result<Vec<Value>, Messages> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Str(s) => Ok(split_list(s)),
        _ => Err(smallvec!["is not a list".to_owned()]),
    }
}

/// Splits a comma-separated string, trimming segments and discarding empty
/// ones ("a, ,b," splits to ["a", "b"]).
pub(crate) fn split_list(s: &str) -> Vec<Value> {
    s.split(',')
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .map(Value::str)
        .collect()
}

// ============================================================================
// BUILT-IN TYPE CASTS
// ============================================================================

/// Casting for the built-in type identifiers; the [`BuiltinPlugin`]'s cast
/// handler. Blank values never reach here.
///
/// [`BuiltinPlugin`]: crate::plugin::BuiltinPlugin
pub(crate) fn cast_builtin(value: &Value, id: &str) -> CastOutcome {
    match id {
        "string" => match value {
            Value::Str(_) => CastOutcome::Cast(value.clone()),
            _ => CastOutcome::fail("is not a string"),
        },
        "integer" => match value {
            Value::Int(_) => CastOutcome::Cast(value.clone()),
            Value::Float(f) => CastOutcome::Cast(Value::Int(f.trunc() as i64)),
            Value::Str(s) => int_prefix(s)
                .map(Value::Int)
                .map_or_else(|| CastOutcome::fail("is not a valid integer"), CastOutcome::Cast),
            _ => CastOutcome::fail("is not a valid integer"),
        },
        "float" => match value {
            Value::Float(_) => CastOutcome::Cast(value.clone()),
            Value::Int(i) => CastOutcome::Cast(Value::Float(*i as f64)),
            Value::Str(s) => float_prefix(s)
                .map(Value::Float)
                .map_or_else(|| CastOutcome::fail("is not a valid number"), CastOutcome::Cast),
            _ => CastOutcome::fail("is not a valid number"),
        },
        "boolean" => match value {
            Value::Bool(_) => CastOutcome::Cast(value.clone()),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => CastOutcome::Cast(Value::Bool(true)),
                "false" | "0" | "no" => CastOutcome::Cast(Value::Bool(false)),
                _ => CastOutcome::fail("is not a boolean"),
            },
            _ => CastOutcome::fail("is not a boolean"),
        },
        "date" => match value {
            Value::Date(_) => CastOutcome::Cast(value.clone()),
            // Richer temporal values narrow to the target granularity.
            Value::DateTime(dt) => CastOutcome::Cast(Value::Date(dt.date())),
            Value::Str(s) => parse_date(s)
                .map(Value::Date)
                .map_or_else(|| CastOutcome::fail("is not a valid date"), CastOutcome::Cast),
            _ => CastOutcome::fail("is not a valid date"),
        },
        "datetime" => match value {
            Value::DateTime(_) => CastOutcome::Cast(value.clone()),
            Value::Date(d) => d.and_hms_opt(0, 0, 0).map_or_else(
                || CastOutcome::fail("is not a valid datetime"),
                |dt| CastOutcome::Cast(Value::DateTime(dt)),
            ),
            Value::Str(s) => parse_datetime(s).map_or_else(
                || CastOutcome::fail("is not a valid datetime"),
                |dt| CastOutcome::Cast(Value::DateTime(dt)),
            ),
            _ => CastOutcome::fail("is not a valid datetime"),
        },
        "list" => match value {
            Value::List(_) => CastOutcome::Cast(value.clone()),
            Value::Str(s) => CastOutcome::Cast(Value::List(split_list(s))),
            _ => CastOutcome::fail("is not a list"),
        },
        _ => CastOutcome::NotHandled,
    }
}

// ============================================================================
// PARSING PRIMITIVES
// ============================================================================

/// Longest leading `[+-]?digits` prefix, parsed as i64.
fn int_prefix(s: &str) -> Option<i64> {
    let t = s.trim();
    let bytes = t.as_bytes();
    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let end = start
        + bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
    if end == start {
        return None;
    }
    t[..end].parse().ok()
}

/// Longest leading `[+-]?digits[.digits]` prefix, parsed as f64.
fn float_prefix(s: &str) -> Option<f64> {
    let t = s.trim();
    let bytes = t.as_bytes();
    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut end = start
        + bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
    if end == start {
        return None;
    }
    if bytes.get(end) == Some(&b'.') {
        let frac = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if frac > 0 {
            end += 1 + frac;
        }
    }
    t[..end].parse().ok()
}

/// Parses an ISO-8601 date, accepting full datetimes and narrowing them.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(t).map(|dt| dt.date()))
}

/// Parses an ISO-8601 datetime: RFC 3339 (offset normalized to UTC),
/// `T`- or space-separated naive forms with optional fractional seconds,
/// or a bare date widened to midnight.
pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let t = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ============================================================================
// TESTS
// ============================================================================
