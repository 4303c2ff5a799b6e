//! Error-handling policy for failing fields.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::value::Value;

// ============================================================================
// ERROR MODE
// ============================================================================

/// What the engine does with a field whose cast or validation failed.
///
/// Precedence, highest first: field-level override, run-level option,
/// process-wide configured default, built-in default (`Fallback`).
#[derive(Clone, Default)]
pub enum ErrorMode {
    /// The field becomes an in-place error marker; every other field is
    /// still fully processed and the result keeps the schema's shape.
    Strict,
    /// The field is silently replaced with its resolved default (or null
    /// when no default is declared).
    #[default]
    Fallback,
    /// The first failing field aborts the whole run with
    /// [`RunError::Raised`](crate::error::RunError::Raised).
    Raise,
    /// A callback decides the replacement value for the failing field.
    /// The callback is local to the field: its return value becomes that
    /// field's output and the walk continues.
    Custom(ModeFn),
}

/// Replacement callback for [`ErrorMode::Custom`], tagged by arity.
#[derive(Clone)]
pub enum ModeFn {
    /// `(field_key, messages) -> replacement`
    KeyErrors(Arc<dyn Fn(&str, &[String]) -> Value + Send + Sync>),
    /// `(field_key, messages, raw_input) -> replacement`
    KeyErrorsInput(Arc<dyn Fn(&str, &[String], &Value) -> Value + Send + Sync>),
}

impl ModeFn {
    /// Invokes the callback with the failing field's key, its messages and
    /// the full raw input.
    pub fn invoke(&self, key: &str, messages: &[String], raw: &Value) -> Value {
        match self {
            Self::KeyErrors(f) => f(key, messages),
            Self::KeyErrorsInput(f) => f(key, messages, raw),
        }
    }
}

impl ErrorMode {
    /// Custom mode from a `(key, messages)` callback.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &[String]) -> Value + Send + Sync + 'static,
    {
        Self::Custom(ModeFn::KeyErrors(Arc::new(f)))
    }

    /// Custom mode from a `(key, messages, raw_input)` callback.
    pub fn custom_with_input<F>(f: F) -> Self
    where
        F: Fn(&str, &[String], &Value) -> Value + Send + Sync + 'static,
    {
        Self::Custom(ModeFn::KeyErrorsInput(Arc::new(f)))
    }

    /// The mode's configuration name (`Custom` has none).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Fallback => "fallback",
            Self::Raise => "raise",
            Self::Custom(_) => "custom",
        }
    }
}

impl FromStr for ErrorMode {
    type Err = ConfigError;

    /// Parses a configured mode name. Unknown names are a setup-time fault,
    /// never deferred to run time.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "fallback" => Ok(Self::Fallback),
            "raise" => Ok(Self::Raise),
            other => Err(ConfigError::UnknownErrorMode(other.to_owned())),
        }
    }
}

impl fmt::Debug for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(ModeFn::KeyErrors(_)) => f.write_str("Custom(fn(key, errors))"),
            Self::Custom(ModeFn::KeyErrorsInput(_)) => {
                f.write_str("Custom(fn(key, errors, raw))")
            }
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_modes() {
        assert!(matches!("strict".parse(), Ok(ErrorMode::Strict)));
        assert!(matches!("fallback".parse(), Ok(ErrorMode::Fallback)));
        assert!(matches!("raise".parse(), Ok(ErrorMode::Raise)));
    }

    #[test]
    fn test_parse_unknown_mode_is_config_error() {
        let err = ErrorMode::from_str("lenient").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownErrorMode(_)));
    }

    #[test]
    fn test_custom_invoke_arity() {
        let two = ErrorMode::custom(|key, _| Value::str(key));
        let three = ErrorMode::custom_with_input(|_, _, raw| raw.clone());

        let raw = Value::str("input");
        if let ErrorMode::Custom(f) = &two {
            assert_eq!(f.invoke("name", &[], &raw), Value::str("name"));
        }
        if let ErrorMode::Custom(f) = &three {
            assert_eq!(f.invoke("name", &[], &raw), raw);
        }
    }
}
