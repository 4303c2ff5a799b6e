//! Default values for absent or fallback-replaced fields.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

// ============================================================================
// DEFAULT SPEC
// ============================================================================

/// The declared default for a field: a static value or a producer function.
///
/// Defaults are resolved lazily: only when the field is actually absent, or
/// when it failed and the effective error mode is `fallback`. Producer
/// functions with side effects (clocks, ID generators) therefore run at most
/// once per failing/absent field and never for present, valid fields.
#[derive(Clone)]
pub enum DefaultSpec {
    /// A static value, cloned on resolution.
    Value(Value),
    /// A producer function, invoked on resolution.
    Func(DefaultFn),
}

/// Default-producing function, tagged by arity.
#[derive(Clone)]
pub enum DefaultFn {
    /// `() -> value`
    Zero(Arc<dyn Fn() -> Value + Send + Sync>),
    /// `(field_key) -> value`
    Key(Arc<dyn Fn(&str) -> Value + Send + Sync>),
    /// `(field_key, raw_input) -> value`
    KeyInput(Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>),
}

impl DefaultSpec {
    /// Static default.
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }

    /// Zero-argument producer.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::Func(DefaultFn::Zero(Arc::new(f)))
    }

    /// One-argument producer receiving the field key.
    pub fn from_key_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        Self::Func(DefaultFn::Key(Arc::new(f)))
    }

    /// Two-argument producer receiving the field key and the full raw input.
    pub fn from_input_fn<F>(f: F) -> Self
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        Self::Func(DefaultFn::KeyInput(Arc::new(f)))
    }

    /// Resolves the default for a field.
    pub fn resolve(&self, key: &str, raw: &Value) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Func(DefaultFn::Zero(f)) => f(),
            Self::Func(DefaultFn::Key(f)) => f(key),
            Self::Func(DefaultFn::KeyInput(f)) => f(key, raw),
        }
    }
}

impl<T: Into<Value>> From<T> for DefaultSpec {
    fn from(v: T) -> Self {
        Self::Value(v.into())
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Func(DefaultFn::Zero(_)) => f.write_str("Func(fn())"),
            Self::Func(DefaultFn::Key(_)) => f.write_str("Func(fn(key))"),
            Self::Func(DefaultFn::KeyInput(_)) => f.write_str("Func(fn(key, raw))"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_static_default() {
        let spec = DefaultSpec::value(1);
        assert_eq!(spec.resolve("page", &Value::Null), Value::Int(1));
    }

    #[test]
    fn test_key_fn_receives_field_key() {
        let spec = DefaultSpec::from_key_fn(|key| Value::str(format!("missing:{key}")));
        assert_eq!(
            spec.resolve("name", &Value::Null),
            Value::str("missing:name")
        );
    }

    #[test]
    fn test_input_fn_receives_raw_input() {
        let spec = DefaultSpec::from_input_fn(|_, raw| raw.get("other").cloned().unwrap_or_default());
        let raw = Value::Map(crate::value::Map::from_iter([(
            "other".to_owned(),
            Value::Int(7),
        )]));
        assert_eq!(spec.resolve("page", &raw), Value::Int(7));
    }

    #[test]
    fn test_producer_runs_only_on_resolution() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let spec = DefaultSpec::from_fn(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Value::Int(0)
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        spec.resolve("n", &Value::Null);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
