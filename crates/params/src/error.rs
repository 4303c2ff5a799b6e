//! Error taxonomy.
//!
//! Field-level failures (cast, validation, required, unsupported type) never
//! surface here; they live inside the result tree as error markers and are
//! plain message lists. This module covers the two error classes that escape
//! a field: aborting a whole run (`raise` mode) and malformed configuration
//! detected at schema/setup time.

use smallvec::SmallVec;
use thiserror::Error;

/// Field-level error messages. Most fields fail with one or two messages,
/// so the list is inlined.
pub type Messages = SmallVec<[String; 2]>;

// ============================================================================
// RUN ERRORS
// ============================================================================

/// Errors that abort an entire `run` call.
#[derive(Debug, Error)]
pub enum RunError {
    /// A field failed while the effective error mode was `raise`. The walk
    /// stops at the first failing field; no partial result is produced.
    #[error("parameter `{field}` is invalid: {}", messages.join(", "))]
    Raised {
        /// Dotted path of the failing field (`user.email`, `tags[2]`).
        field: String,
        /// Every cast/validation message collected for the field.
        messages: Messages,
    },
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

/// Errors raised while a schema or engine configuration is being built.
///
/// These are setup-time faults: a process should fail to start rather than
/// carry a malformed schema to its first request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error-mode name did not parse.
    #[error("unknown error mode `{0}` (expected `strict`, `fallback` or `raise`)")]
    UnknownErrorMode(String),

    /// A `pattern` rule carried an invalid regular expression.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A schema field was declared with an empty key.
    #[error("schema field keys must not be empty")]
    EmptySchemaKey,

    /// A schema field was declared twice.
    #[error("schema field `{0}` is declared twice")]
    DuplicateField(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_raised_display_joins_messages() {
        let err = RunError::Raised {
            field: "age".to_owned(),
            messages: smallvec!["must be at least 18".to_owned(), "required".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "parameter `age` is invalid: must be at least 18, required"
        );
    }

    #[test]
    fn test_unknown_error_mode_display() {
        let err = ConfigError::UnknownErrorMode("lenient".to_owned());
        assert!(err.to_string().contains("`lenient`"));
    }
}
