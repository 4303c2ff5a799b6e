//! Declarative validation rules.
//!
//! Rules are pure data descriptions of constraints, checked against a value
//! that already cast successfully. Each rule applies only to the types it is
//! meaningful for: the checker silently skips a rule declared on a type it
//! does not cover (`pattern` on an integer, `unique` on a string, ...).
//! `one_of` is universal: on scalars it is membership, on lists it means
//! every element must be a member.
//!
//! All applicable rules for a field run independently; their failure
//! messages are unioned, never short-circuited.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::engine::RunOptions;
use crate::error::ConfigError;
use crate::schema::{FieldType, TypeId};
use crate::value::Value;

// ============================================================================
// RULE
// ============================================================================

/// A single declarative constraint with an optional message override.
#[derive(Clone)]
pub enum Rule {
    /// Inclusive lower bound: character length for strings, numeric value
    /// for numbers, chronological for dates, element count for lists.
    Min { value: Value, message: Option<String> },
    /// Inclusive upper bound, dual of [`Rule::Min`].
    Max { value: Value, message: Option<String> },
    /// Exact character length (strings) or element count (lists).
    Length { value: usize, message: Option<String> },
    /// Regex match, string-only. Compiled once at rule construction.
    Pattern { regex: Regex, message: Option<String> },
    /// String must start with the prefix.
    StartsWith { prefix: String, message: Option<String> },
    /// String must end with the suffix.
    EndsWith { suffix: String, message: Option<String> },
    /// String must contain the needle.
    Contains { needle: String, message: Option<String> },
    /// String must consist of ASCII letters and digits only.
    Alphanumeric { message: Option<String> },
    /// Number must be strictly greater than zero.
    Positive { message: Option<String> },
    /// Number must be strictly less than zero.
    Negative { message: Option<String> },
    /// List must not contain duplicate elements.
    Unique { message: Option<String> },
    /// List must not be empty.
    NonEmpty { message: Option<String> },
    /// Membership: scalars must be one of `values`; for lists every element
    /// must be one of `values`.
    In { values: Vec<Value>, message: Option<String> },
    /// A user-supplied check function.
    Custom(CheckFn),
}

/// User-supplied check function, tagged by arity.
#[derive(Clone)]
pub enum CheckFn {
    /// `(value) -> outcome`
    OneArg(Arc<dyn Fn(&Value) -> RuleOutcome + Send + Sync>),
    /// `(value, type) -> outcome`
    TwoArg(Arc<dyn Fn(&Value, &TypeId) -> RuleOutcome + Send + Sync>),
    /// `(value, type, opts) -> outcome`
    ThreeArg(Arc<dyn Fn(&Value, &TypeId, &RunOptions) -> RuleOutcome + Send + Sync>),
}

/// Result of a user-supplied check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The value passes.
    Pass,
    /// The value fails with the generic message ("invalid value").
    Fail,
    /// The value fails with a specific message.
    FailWith(String),
}

impl From<bool> for RuleOutcome {
    fn from(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }
}

impl Rule {
    /// Inclusive lower bound.
    pub fn min(value: impl Into<Value>) -> Self {
        Self::Min { value: value.into(), message: None }
    }

    /// Inclusive upper bound.
    pub fn max(value: impl Into<Value>) -> Self {
        Self::Max { value: value.into(), message: None }
    }

    /// Exact length / element count.
    #[must_use]
    pub fn length(value: usize) -> Self {
        Self::Length { value, message: None }
    }

    /// Regex match. Invalid patterns are a setup-time [`ConfigError`].
    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self::Pattern { regex, message: None })
    }

    /// Prefix check.
    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self::StartsWith { prefix: prefix.into(), message: None }
    }

    /// Suffix check.
    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Self::EndsWith { suffix: suffix.into(), message: None }
    }

    /// Substring check.
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains { needle: needle.into(), message: None }
    }

    /// ASCII letters and digits only.
    #[must_use]
    pub fn alphanumeric() -> Self {
        Self::Alphanumeric { message: None }
    }

    /// Strictly positive.
    #[must_use]
    pub fn positive() -> Self {
        Self::Positive { message: None }
    }

    /// Strictly negative.
    #[must_use]
    pub fn negative() -> Self {
        Self::Negative { message: None }
    }

    /// No duplicate elements.
    #[must_use]
    pub fn unique() -> Self {
        Self::Unique { message: None }
    }

    /// At least one element.
    #[must_use]
    pub fn non_empty() -> Self {
        Self::NonEmpty { message: None }
    }

    /// Membership in an allowed set.
    pub fn one_of<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::In {
            values: values.into_iter().map(Into::into).collect(),
            message: None,
        }
    }

    /// One-argument custom check.
    pub fn custom<F, O>(f: F) -> Self
    where
        F: Fn(&Value) -> O + Send + Sync + 'static,
        O: Into<RuleOutcome>,
    {
        Self::Custom(CheckFn::OneArg(Arc::new(move |v| f(v).into())))
    }

    /// Two-argument custom check receiving the field's type identifier.
    pub fn custom_typed<F, O>(f: F) -> Self
    where
        F: Fn(&Value, &TypeId) -> O + Send + Sync + 'static,
        O: Into<RuleOutcome>,
    {
        Self::Custom(CheckFn::TwoArg(Arc::new(move |v, t| f(v, t).into())))
    }

    /// Three-argument custom check receiving type and run options.
    pub fn custom_with_opts<F, O>(f: F) -> Self
    where
        F: Fn(&Value, &TypeId, &RunOptions) -> O + Send + Sync + 'static,
        O: Into<RuleOutcome>,
    {
        Self::Custom(CheckFn::ThreeArg(Arc::new(move |v, t, o| f(v, t, o).into())))
    }

    /// Overrides the failure message for this rule.
    #[must_use]
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        let slot = match &mut self {
            Self::Min { message, .. }
            | Self::Max { message, .. }
            | Self::Length { message, .. }
            | Self::Pattern { message, .. }
            | Self::StartsWith { message, .. }
            | Self::EndsWith { message, .. }
            | Self::Contains { message, .. }
            | Self::Alphanumeric { message }
            | Self::Positive { message }
            | Self::Negative { message }
            | Self::Unique { message }
            | Self::NonEmpty { message }
            | Self::In { message, .. } => message,
            // Custom checks carry their own messages.
            Self::Custom(_) => return self,
        };
        *slot = Some(msg.into());
        self
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min { value, .. } => f.debug_tuple("Min").field(value).finish(),
            Self::Max { value, .. } => f.debug_tuple("Max").field(value).finish(),
            Self::Length { value, .. } => f.debug_tuple("Length").field(value).finish(),
            Self::Pattern { regex, .. } => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::StartsWith { prefix, .. } => f.debug_tuple("StartsWith").field(prefix).finish(),
            Self::EndsWith { suffix, .. } => f.debug_tuple("EndsWith").field(suffix).finish(),
            Self::Contains { needle, .. } => f.debug_tuple("Contains").field(needle).finish(),
            Self::Alphanumeric { .. } => f.write_str("Alphanumeric"),
            Self::Positive { .. } => f.write_str("Positive"),
            Self::Negative { .. } => f.write_str("Negative"),
            Self::Unique { .. } => f.write_str("Unique"),
            Self::NonEmpty { .. } => f.write_str("NonEmpty"),
            Self::In { values, .. } => f.debug_tuple("In").field(values).finish(),
            Self::Custom(_) => f.write_str("Custom(fn)"),
        }
    }
}

// ============================================================================
// CHECKING
// ============================================================================

/// Checks one rule against a cast value. Returns the failure message, or
/// `None` when the rule passes or does not apply to the field's type.
pub(crate) fn check_one(
    value: &Value,
    ty: &FieldType,
    rule: &Rule,
    opts: &RunOptions,
) -> Option<String> {
    match rule {
        Rule::Min { value: bound, message } => check_min(value, ty, bound).map(|m| pick(message, m)),
        Rule::Max { value: bound, message } => check_max(value, ty, bound).map(|m| pick(message, m)),
        Rule::Length { value: expected, message } => {
            check_length(value, *expected).map(|m| pick(message, m))
        }
        Rule::Pattern { regex, message } => match value {
            Value::Str(s) if !regex.is_match(s) => {
                Some(pick(message, "does not match pattern".to_owned()))
            }
            _ => None,
        },
        Rule::StartsWith { prefix, message } => match value {
            Value::Str(s) if !s.starts_with(prefix.as_str()) => {
                Some(pick(message, format!("must start with {prefix}")))
            }
            _ => None,
        },
        Rule::EndsWith { suffix, message } => match value {
            Value::Str(s) if !s.ends_with(suffix.as_str()) => {
                Some(pick(message, format!("must end with {suffix}")))
            }
            _ => None,
        },
        Rule::Contains { needle, message } => match value {
            Value::Str(s) if !s.contains(needle.as_str()) => {
                Some(pick(message, format!("must contain {needle}")))
            }
            _ => None,
        },
        Rule::Alphanumeric { message } => match value {
            Value::Str(s) if !s.bytes().all(|b| b.is_ascii_alphanumeric()) => {
                Some(pick(message, "must be alphanumeric".to_owned()))
            }
            _ => None,
        },
        Rule::Positive { message } => match value.as_float() {
            Some(n) if n <= 0.0 => Some(pick(message, "must be positive".to_owned())),
            _ => None,
        },
        Rule::Negative { message } => match value.as_float() {
            Some(n) if n >= 0.0 => Some(pick(message, "must be negative".to_owned())),
            _ => None,
        },
        Rule::Unique { message } => match value {
            Value::List(items) if has_duplicates(items) => {
                Some(pick(message, "must not contain duplicate elements".to_owned()))
            }
            _ => None,
        },
        Rule::NonEmpty { message } => match value {
            Value::List(items) if items.is_empty() => {
                Some(pick(message, "must not be empty".to_owned()))
            }
            _ => None,
        },
        Rule::In { values, message } => {
            let ok = match value {
                Value::List(items) => items.iter().all(|item| values.contains(item)),
                scalar => values.contains(scalar),
            };
            if ok {
                None
            } else {
                Some(pick(message, "is not an allowed value".to_owned()))
            }
        }
        Rule::Custom(check) => {
            let outcome = match check {
                CheckFn::OneArg(f) => f(value),
                CheckFn::TwoArg(f) => f(value, &ty.type_id()),
                CheckFn::ThreeArg(f) => f(value, &ty.type_id(), opts),
            };
            match outcome {
                RuleOutcome::Pass => None,
                RuleOutcome::Fail => Some("invalid value".to_owned()),
                RuleOutcome::FailWith(msg) => Some(msg),
            }
        }
    }
}

fn pick(over: &Option<String>, fallback: String) -> String {
    over.clone().unwrap_or(fallback)
}

fn check_min(value: &Value, ty: &FieldType, bound: &Value) -> Option<String> {
    match value {
        Value::Str(s) => {
            let min = bound.as_int()? as usize;
            (s.chars().count() < min).then(|| format!("must be at least {min} characters"))
        }
        Value::Int(_) | Value::Float(_) => {
            let min = bound.as_float()?;
            (value.as_float()? < min).then(|| format!("must be at least {}", bound))
        }
        Value::Date(_) | Value::DateTime(_) => {
            let min = bound_as_temporal(ty, bound)?;
            (temporal_key(value)? < temporal_key(&min)?)
                .then(|| format!("must not be before {min}"))
        }
        Value::List(items) => {
            let min = bound.as_int()? as usize;
            (items.len() < min).then(|| format!("must have at least {min} elements"))
        }
        _ => None,
    }
}

fn check_max(value: &Value, ty: &FieldType, bound: &Value) -> Option<String> {
    match value {
        Value::Str(s) => {
            let max = bound.as_int()? as usize;
            (s.chars().count() > max).then(|| format!("must be at most {max} characters"))
        }
        Value::Int(_) | Value::Float(_) => {
            let max = bound.as_float()?;
            (value.as_float()? > max).then(|| format!("must be at most {}", bound))
        }
        Value::Date(_) | Value::DateTime(_) => {
            let max = bound_as_temporal(ty, bound)?;
            (temporal_key(value)? > temporal_key(&max)?)
                .then(|| format!("must not be after {max}"))
        }
        Value::List(items) => {
            let max = bound.as_int()? as usize;
            (items.len() > max).then(|| format!("must have at most {max} elements"))
        }
        _ => None,
    }
}

fn check_length(value: &Value, expected: usize) -> Option<String> {
    match value {
        Value::Str(s) => (s.chars().count() != expected)
            .then(|| format!("must be exactly {expected} characters")),
        Value::List(items) => {
            (items.len() != expected).then(|| format!("must have exactly {expected} elements"))
        }
        _ => None,
    }
}

/// Date bounds may be declared as ISO strings; parse them against the
/// field's declared granularity.
fn bound_as_temporal(ty: &FieldType, bound: &Value) -> Option<Value> {
    match bound {
        Value::Date(_) | Value::DateTime(_) => Some(bound.clone()),
        Value::Str(s) => match ty {
            FieldType::DateTime => crate::cast::parse_datetime(s).map(Value::DateTime),
            _ => crate::cast::parse_date(s).map(Value::Date),
        },
        _ => None,
    }
}

/// Chronological comparison key: dates compare as midnight datetimes.
fn temporal_key(value: &Value) -> Option<chrono::NaiveDateTime> {
    match value {
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[..i].contains(item))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunOptions;

    fn check(value: &Value, ty: &FieldType, rule: &Rule) -> Option<String> {
        check_one(value, ty, rule, &RunOptions::default())
    }

    #[test]
    fn test_min_on_integer_value() {
        let rule = Rule::min(18);
        assert_eq!(
            check(&Value::Int(10), &FieldType::Int, &rule),
            Some("must be at least 18".to_owned())
        );
        assert_eq!(check(&Value::Int(18), &FieldType::Int, &rule), None);
    }

    #[test]
    fn test_min_on_string_is_char_length() {
        let rule = Rule::min(3);
        assert_eq!(
            check(&Value::str("ab"), &FieldType::Str, &rule),
            Some("must be at least 3 characters".to_owned())
        );
        assert_eq!(check(&Value::str("abc"), &FieldType::Str, &rule), None);
        // Unicode scalar values, not bytes.
        assert_eq!(check(&Value::str("héé"), &FieldType::Str, &rule), None);
    }

    #[test]
    fn test_max_on_list_is_element_count() {
        let rule = Rule::max(2);
        let list = Value::from(vec![1i64, 2, 3]);
        assert_eq!(
            check(&list, &FieldType::List, &rule),
            Some("must have at most 2 elements".to_owned())
        );
    }

    #[test]
    fn test_pattern_only_applies_to_strings() {
        let rule = Rule::pattern("@").unwrap();
        assert_eq!(
            check(&Value::str("bad"), &FieldType::Str, &rule),
            Some("does not match pattern".to_owned())
        );
        assert_eq!(check(&Value::str("a@b"), &FieldType::Str, &rule), None);
        // Skipped, not failed, on a non-string.
        assert_eq!(check(&Value::Int(5), &FieldType::Int, &rule), None);
    }

    #[test]
    fn test_positive_is_strict() {
        let rule = Rule::positive();
        assert_eq!(check(&Value::Int(0), &FieldType::Int, &rule).as_deref(), Some("must be positive"));
        assert_eq!(check(&Value::Int(1), &FieldType::Int, &rule), None);
    }

    #[test]
    fn test_date_bounds_chronological() {
        let d = |s: &str| Value::Date(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        let rule = Rule::min(Value::str("2024-01-01"));
        assert!(check(&d("2023-12-31"), &FieldType::Date, &rule).is_some());
        assert_eq!(check(&d("2024-01-01"), &FieldType::Date, &rule), None);
    }

    #[test]
    fn test_unique_and_non_empty() {
        let dup = Value::from(vec!["a", "b", "a"]);
        assert!(check(&dup, &FieldType::List, &Rule::unique()).is_some());
        let empty = Value::List(vec![]);
        assert_eq!(
            check(&empty, &FieldType::List, &Rule::non_empty()).as_deref(),
            Some("must not be empty")
        );
    }

    #[test]
    fn test_in_on_list_means_every_element() {
        let rule = Rule::one_of(["a", "b"]);
        assert_eq!(check(&Value::from(vec!["a", "b"]), &FieldType::List, &rule), None);
        assert!(check(&Value::from(vec!["a", "z"]), &FieldType::List, &rule).is_some());
        assert!(check(&Value::str("z"), &FieldType::Str, &rule).is_some());
    }

    #[test]
    fn test_custom_outcomes() {
        let generic = Rule::custom(|v: &Value| v.as_int() == Some(1));
        assert_eq!(
            check(&Value::Int(2), &FieldType::Int, &generic).as_deref(),
            Some("invalid value")
        );

        let specific = Rule::custom(|_| RuleOutcome::FailWith("nope".to_owned()));
        assert_eq!(
            check(&Value::Int(2), &FieldType::Int, &specific).as_deref(),
            Some("nope")
        );
    }

    #[test]
    fn test_message_override() {
        let rule = Rule::min(18).message("too young");
        assert_eq!(
            check(&Value::Int(10), &FieldType::Int, &rule).as_deref(),
            Some("too young")
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        assert!(matches!(
            Rule::pattern("("),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
