//! Pluggable type ownership.
//!
//! A [`Plugin`] declares the type identifiers it owns and may provide
//! casting and rule-checking for them. Handlers return an explicit
//! `NotHandled` to decline an input and fall through to the next candidate
//! (candidates are consulted in reverse registration order, so the
//! most-recently-registered plugin wins, and the built-in plugin, always
//! registered first, is the candidate of last resort).

pub mod registry;

use crate::engine::RunOptions;
use crate::error::Messages;
use crate::rules::Rule;
use crate::schema::TypeId;
use crate::value::Value;

pub use registry::{EngineConfig, Registry};

// ============================================================================
// HANDLER OUTCOMES
// ============================================================================

/// Result of a plugin (or function-type) cast attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome {
    /// Cast succeeded with the given typed value.
    Cast(Value),
    /// Cast failed with one or more messages.
    Fail(Messages),
    /// This handler declines; try the next candidate.
    NotHandled,
}

impl CastOutcome {
    /// Failure with a single message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(smallvec::smallvec![message.into()])
    }
}

/// Result of a plugin rule-check attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The rule passes.
    Pass,
    /// The rule fails with a message.
    Fail(String),
    /// This handler declines; the built-in rule semantics apply.
    NotHandled,
}

// ============================================================================
// PLUGIN TRAIT
// ============================================================================

/// An owner of one or more type identifiers' casting and validation logic.
pub trait Plugin: Send + Sync {
    /// A short name for diagnostics.
    fn name(&self) -> &str;

    /// The type identifiers this plugin declares ownership of.
    fn types(&self) -> Vec<TypeId>;

    /// Attempts to cast `value` to `ty`. The default declines everything.
    fn cast(&self, value: &Value, ty: &TypeId, opts: &RunOptions) -> CastOutcome {
        let _ = (value, ty, opts);
        CastOutcome::NotHandled
    }

    /// Attempts to check `rule` against an already-cast `value`. The default
    /// declines, deferring to the built-in rule semantics.
    fn check(&self, value: &Value, ty: &TypeId, rule: &Rule, opts: &RunOptions) -> CheckOutcome {
        let _ = (value, ty, rule, opts);
        CheckOutcome::NotHandled
    }
}

// ============================================================================
// BUILT-IN PLUGIN
// ============================================================================

/// The plugin owning the built-in scalar types. Registered first, so any
/// configured plugin can shadow a built-in type outright or decline back to
/// it per input.
#[derive(Debug, Default)]
pub struct BuiltinPlugin;

impl Plugin for BuiltinPlugin {
    fn name(&self) -> &str {
        "builtin"
    }

    fn types(&self) -> Vec<TypeId> {
        ["string", "integer", "float", "boolean", "date", "datetime", "list"]
            .into_iter()
            .map(TypeId::new)
            .collect()
    }

    fn cast(&self, value: &Value, ty: &TypeId, _opts: &RunOptions) -> CastOutcome {
        crate::cast::cast_builtin(value, ty.as_str())
    }
}
