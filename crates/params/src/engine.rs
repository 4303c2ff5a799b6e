//! The schema walker: `run` and its result tree.
//!
//! The walk is depth-first in declaration order. Every schema entry resolves
//! independently: one field's failure never prevents siblings or unrelated
//! nested branches from being processed. The exception is `raise` mode,
//! where the first failure aborts the whole run with no partial result.

use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::smallvec;
use tracing::debug;

use crate::cast;
use crate::error::{Messages, RunError};
use crate::plugin::{self, CheckOutcome, Registry};
use crate::rules::{self, Rule};
use crate::schema::{DefaultSpec, Entry, ErrorMode, FieldSpec, FieldType, Schema};
use crate::value::{Map, Value};

// ============================================================================
// OUTCOME
// ============================================================================

/// The result of a run, isomorphic to the schema's shape: every leaf is a
/// typed value or an error marker, nested schemas become nested maps, list
/// fields become per-element outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A successfully cast and validated value (or a substituted default).
    Value(Value),
    /// An error marker: the field failed with these messages.
    Invalid(Messages),
    /// A nested schema's results.
    Map(IndexMap<String, Outcome>),
    /// A list field's per-element results.
    List(Vec<Outcome>),
}

impl Outcome {
    /// True when no error marker exists anywhere in the tree.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Value(_) => true,
            Self::Invalid(_) => false,
            Self::Map(m) => m.values().all(Outcome::is_valid),
            Self::List(items) => items.iter().all(Outcome::is_valid),
        }
    }

    /// Looks up a field of a map outcome.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Outcome> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// The typed value of a leaf outcome.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The error messages of a marker outcome.
    #[must_use]
    pub fn errors(&self) -> Option<&[String]> {
        match self {
            Self::Invalid(messages) => Some(messages),
            _ => None,
        }
    }

    /// Collapses the tree into a plain [`Value`], dropping error markers to
    /// null. Intended for consumers that already checked validity.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Invalid(_) => Value::Null,
            Self::Map(m) => Value::Map(m.iter().map(|(k, o)| (k.clone(), o.to_value())).collect()),
            Self::List(items) => Value::List(items.iter().map(Outcome::to_value).collect()),
        }
    }
}

// ============================================================================
// RUN OPTIONS
// ============================================================================

/// Per-run options.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Run-level error mode. Overridden per field, overrides the process
    /// default.
    pub error_mode: Option<ErrorMode>,
    /// Registry override for injection in tests; the process-wide registry
    /// is used when unset.
    pub registry: Option<Arc<Registry>>,
    /// Opaque options passed through to plugin handlers and three-argument
    /// custom functions.
    pub plugin_opts: Map,
}

impl RunOptions {
    /// Sets the run-level error mode.
    #[must_use]
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = Some(mode);
        self
    }

    /// Injects a registry, bypassing the process-wide cache.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Adds an opaque plugin option.
    #[must_use]
    pub fn with_plugin_opt(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.plugin_opts.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("error_mode", &self.error_mode)
            .field("registry", &self.registry.is_some())
            .field("plugin_opts", &self.plugin_opts)
            .finish()
    }
}

// ============================================================================
// RUN
// ============================================================================

/// Validates and coerces `raw` against `schema`.
///
/// Returns the shape-preserving result tree, or [`RunError::Raised`] when
/// the effective error mode is `raise` and a field fails. Non-map raw
/// inputs are treated as an empty map (every field missing).
pub fn run(schema: &Schema, raw: &Value, options: &RunOptions) -> Result<Outcome, RunError> {
    let registry = options
        .registry
        .clone()
        .unwrap_or_else(plugin::registry::global);
    let mode = options
        .error_mode
        .clone()
        .unwrap_or_else(|| registry.default_mode().clone());

    debug!(fields = schema.len(), mode = mode.name(), "running schema");

    let ctx = WalkCtx {
        raw_root: raw,
        options,
        registry: &registry,
    };
    walk(schema, raw, &mode, &ctx, "").map(Outcome::Map)
}

/// Immutable state shared by every recursion level.
struct WalkCtx<'a> {
    raw_root: &'a Value,
    options: &'a RunOptions,
    registry: &'a Registry,
}

fn walk(
    schema: &Schema,
    raw: &Value,
    mode: &ErrorMode,
    ctx: &WalkCtx<'_>,
    path: &str,
) -> Result<IndexMap<String, Outcome>, RunError> {
    let mut output = IndexMap::with_capacity(schema.len());

    for (key, entry) in schema.entries() {
        let field_path = join_path(path, key);
        let outcome = match entry {
            Entry::Nested { schema, error_mode } => {
                let sub_mode = error_mode.as_ref().unwrap_or(mode);
                let sub_raw = raw.get(key).cloned().unwrap_or_else(Value::map_empty);
                Outcome::Map(walk(schema, &sub_raw, sub_mode, ctx, &field_path)?)
            }
            Entry::Field(spec) => {
                let eff_mode = spec.error_mode.as_ref().unwrap_or(mode);
                walk_field(key, &field_path, spec, raw, eff_mode, ctx)?
            }
        };
        output.insert(key.clone(), outcome);
    }

    Ok(output)
}

fn walk_field(
    key: &str,
    path: &str,
    spec: &FieldSpec,
    raw: &Value,
    mode: &ErrorMode,
    ctx: &WalkCtx<'_>,
) -> Result<Outcome, RunError> {
    match &spec.ty {
        FieldType::ListOfSchema(sub) => walk_list_of_schema(key, path, spec, sub, raw, mode, ctx),
        FieldType::ListOf(element) => walk_list_of(key, path, spec, element, raw, mode, ctx),
        _ => walk_scalar(key, path, spec, raw, mode, ctx),
    }
}

fn walk_list_of_schema(
    key: &str,
    path: &str,
    spec: &FieldSpec,
    sub: &Schema,
    raw: &Value,
    mode: &ErrorMode,
    ctx: &WalkCtx<'_>,
) -> Result<Outcome, RunError> {
    let items: Vec<Value> = match raw.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::List(items)) => items.clone(),
        Some(_) => {
            let messages = smallvec!["is not a list".to_owned()];
            return apply_policy(mode, key, path, messages, spec.default.as_ref(), ctx);
        }
    };

    let mut outcomes = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let element_path = format!("{path}[{index}]");
        outcomes.push(Outcome::Map(walk(sub, item, mode, ctx, &element_path)?));
    }
    Ok(Outcome::List(outcomes))
}

fn walk_list_of(
    key: &str,
    path: &str,
    spec: &FieldSpec,
    element: &FieldType,
    raw: &Value,
    mode: &ErrorMode,
    ctx: &WalkCtx<'_>,
) -> Result<Outcome, RunError> {
    let items: Vec<Value> = match raw.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::List(items)) => items.clone(),
        Some(Value::Str(s)) => cast::split_list(s),
        Some(_) => {
            let messages = smallvec!["is not a list".to_owned()];
            return apply_policy(mode, key, path, messages, spec.default.as_ref(), ctx);
        }
    };

    // Each element casts and validates independently: one bad element never
    // poisons its siblings.
    let mut outcomes = Vec::with_capacity(items.len());
    let mut cast_values = Vec::with_capacity(items.len());
    let mut any_failed = false;
    for (index, item) in items.iter().enumerate() {
        let element_path = format!("{path}[{index}]");
        let mut messages = Messages::new();
        match cast::cast(item, element, ctx.options, ctx.registry) {
            Ok(value) => {
                messages.extend(check_rules(
                    &value,
                    element,
                    &spec.element_rules,
                    ctx.options,
                    ctx.registry,
                ));
                if messages.is_empty() {
                    cast_values.push(value.clone());
                    outcomes.push(Outcome::Value(value));
                    continue;
                }
            }
            Err(cast_messages) => messages = cast_messages,
        }
        any_failed = true;
        // Elements have no defaults of their own: fallback nulls them out.
        outcomes.push(apply_policy(mode, key, &element_path, messages, None, ctx)?);
    }

    // Field-level rules (element count, uniqueness, membership) judge the
    // assembled list, but only once every element is individually sound.
    if !any_failed {
        let list = Value::List(cast_values);
        let messages = check_rules(&list, &spec.ty, &spec.rules, ctx.options, ctx.registry);
        if !messages.is_empty() {
            return apply_policy(mode, key, path, messages, spec.default.as_ref(), ctx);
        }
    }

    Ok(Outcome::List(outcomes))
}

fn walk_scalar(
    key: &str,
    path: &str,
    spec: &FieldSpec,
    raw: &Value,
    mode: &ErrorMode,
    ctx: &WalkCtx<'_>,
) -> Result<Outcome, RunError> {
    let raw_value = raw.get(key);

    // An absent field with a default short-circuits: the default is trusted,
    // pre-typed data and skips cast/validate entirely.
    if raw_value.is_none_or(Value::is_null) {
        if let Some(default) = &spec.default {
            return Ok(Outcome::Value(default.resolve(key, ctx.raw_root)));
        }
    }

    let raw_value = raw_value.cloned().unwrap_or(Value::Null);

    let cast_value = match cast::cast(&raw_value, &spec.ty, ctx.options, ctx.registry) {
        Ok(value) => value,
        Err(messages) => {
            return apply_policy(mode, key, path, messages, spec.default.as_ref(), ctx);
        }
    };

    // Required is checked before the rule loop; blank means missing.
    if spec.required && cast_value.is_blank() {
        let messages = smallvec!["required".to_owned()];
        return apply_policy(mode, key, path, messages, spec.default.as_ref(), ctx);
    }

    // Nothing to validate on an absent optional value.
    if cast_value.is_null() {
        return Ok(Outcome::Value(cast_value));
    }

    let messages = check_rules(&cast_value, &spec.ty, &spec.rules, ctx.options, ctx.registry);
    if messages.is_empty() {
        Ok(Outcome::Value(cast_value))
    } else {
        apply_policy(mode, key, path, messages, spec.default.as_ref(), ctx)
    }
}

/// Runs every rule, offering each to the plugin chain first (newest
/// registration wins; NotHandled falls through to the built-in semantics).
/// All rules run; messages are unioned.
fn check_rules(
    value: &Value,
    ty: &FieldType,
    rules: &[Rule],
    options: &RunOptions,
    registry: &Registry,
) -> Messages {
    let id = ty.type_id();
    let mut messages = Messages::new();

    for rule in rules {
        let mut outcome = CheckOutcome::NotHandled;
        for plugin in registry.candidates(&id) {
            match plugin.check(value, &id, rule, options) {
                CheckOutcome::NotHandled => {}
                decided => {
                    outcome = decided;
                    break;
                }
            }
        }
        match outcome {
            CheckOutcome::Pass => {}
            CheckOutcome::Fail(msg) => messages.push(msg),
            CheckOutcome::NotHandled => {
                if let Some(msg) = rules::check_one(value, ty, rule, options) {
                    messages.push(msg);
                }
            }
        }
    }

    messages
}

/// Turns a field failure into its final outcome under the effective error
/// mode. `raise` aborts the whole run; `custom` callbacks are local to the
/// field, their return value replaces the field and the walk continues.
fn apply_policy(
    mode: &ErrorMode,
    key: &str,
    path: &str,
    messages: Messages,
    default: Option<&DefaultSpec>,
    ctx: &WalkCtx<'_>,
) -> Result<Outcome, RunError> {
    match mode {
        ErrorMode::Strict => Ok(Outcome::Invalid(messages)),
        ErrorMode::Fallback => Ok(Outcome::Value(
            default.map_or(Value::Null, |d| d.resolve(key, ctx.raw_root)),
        )),
        ErrorMode::Raise => Err(RunError::Raised {
            field: path.to_owned(),
            messages,
        }),
        ErrorMode::Custom(f) => Ok(Outcome::Value(f.invoke(key, &messages, ctx.raw_root))),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}
