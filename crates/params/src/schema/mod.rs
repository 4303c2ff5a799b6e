//! Schema model: field declarations, types and the schema builder.
//!
//! A [`Schema`] maps field names to entries. An entry is either a leaf
//! [`FieldSpec`] (type + rules + default + required + error-mode override)
//! or a nested schema for object-valued fields. List fields come in two
//! flavors: `ListOf` (homogeneous scalars) and `ListOfSchema`
//! (lists of objects).
//!
//! Schemas are static configuration: build them once at startup. Builders
//! surface malformed declarations as [`ConfigError`] immediately, so a
//! process never carries a broken schema to its first request.

pub mod default;
pub mod mode;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ConfigError;
use crate::plugin::CastOutcome;
use crate::rules::Rule;
use crate::value::Value;

pub use default::{DefaultFn, DefaultSpec};
pub use mode::{ErrorMode, ModeFn};

// ============================================================================
// TYPE IDENTIFIER
// ============================================================================

/// Identifier under which a type is registered with the plugin registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeId(String);

impl TypeId {
    /// Creates a type identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// FIELD TYPE
// ============================================================================

/// The declared type of a schema leaf. Immutable after construction.
#[derive(Clone)]
pub enum FieldType {
    /// UTF-8 string, accepted as-is.
    Str,
    /// 64-bit integer; numeric strings parse permissively by prefix.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean; accepts `true/1/yes` and `false/0/no`, case-insensitive.
    Bool,
    /// Calendar date, ISO-8601.
    Date,
    /// Date and time, ISO-8601.
    DateTime,
    /// Untyped list; comma-split when the raw value is a string.
    List,
    /// No casting or validation; the raw value flows through unchanged.
    Passthrough,
    /// A plugin-registered type.
    Custom(TypeId),
    /// A user-supplied cast function standing in for a type.
    Func(CastFn),
    /// Homogeneous list with a scalar element type.
    ListOf(Box<FieldType>),
    /// List of objects, each validated against a nested schema.
    ListOfSchema(Schema),
}

impl FieldType {
    /// The registry identifier this type resolves under. Structural types
    /// report `list`; function and passthrough types use reserved sentinels.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::Str => TypeId::new("string"),
            Self::Int => TypeId::new("integer"),
            Self::Float => TypeId::new("float"),
            Self::Bool => TypeId::new("boolean"),
            Self::Date => TypeId::new("date"),
            Self::DateTime => TypeId::new("datetime"),
            Self::List | Self::ListOf(_) | Self::ListOfSchema(_) => TypeId::new("list"),
            Self::Passthrough => TypeId::new("__none__"),
            Self::Custom(id) => id.clone(),
            Self::Func(_) => TypeId::new("__func__"),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(id) => f.debug_tuple("Custom").field(id).finish(),
            Self::Func(_) => f.write_str("Func(fn)"),
            Self::ListOf(inner) => f.debug_tuple("ListOf").field(inner).finish(),
            Self::ListOfSchema(s) => f.debug_tuple("ListOfSchema").field(s).finish(),
            other => f.write_str(other.type_id().as_str()),
        }
    }
}

/// User-supplied cast function, tagged by arity. Resolved once at schema
/// construction; the engine never re-inspects call shapes per invocation.
#[derive(Clone)]
pub enum CastFn {
    /// `(value) -> outcome`
    OneArg(Arc<dyn Fn(&Value) -> CastOutcome + Send + Sync>),
    /// `(value, type) -> outcome`
    TwoArg(Arc<dyn Fn(&Value, &TypeId) -> CastOutcome + Send + Sync>),
    /// `(value, type, opts) -> outcome`
    ThreeArg(
        Arc<dyn Fn(&Value, &TypeId, &crate::engine::RunOptions) -> CastOutcome + Send + Sync>,
    ),
}

// ============================================================================
// FIELD SPEC
// ============================================================================

/// Declaration of one schema leaf.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) ty: FieldType,
    pub(crate) rules: Vec<Rule>,
    /// Rules applied to each element of a list-typed field.
    pub(crate) element_rules: Vec<Rule>,
    pub(crate) default: Option<DefaultSpec>,
    pub(crate) required: bool,
    pub(crate) error_mode: Option<ErrorMode>,
}

impl FieldSpec {
    /// Creates a field spec for a type with no rules, no default, optional.
    #[must_use]
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            rules: Vec::new(),
            element_rules: Vec::new(),
            default: None,
            required: false,
            error_mode: None,
        }
    }

    /// Adds a validation rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several validation rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Adds a rule checked against each element of a list-typed field.
    #[must_use]
    pub fn element_rule(mut self, rule: Rule) -> Self {
        self.element_rules.push(rule);
        self
    }

    /// Declares the default used when the field is absent or fails under
    /// fallback mode.
    #[must_use]
    pub fn default_to(mut self, default: impl Into<DefaultSpec>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Marks the field required: null and empty-string values fail with
    /// "required" before any other rule runs.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Overrides the error mode for this field (and, through list-of-schema
    /// recursion, its descendants).
    #[must_use]
    pub fn on_error(mut self, mode: ErrorMode) -> Self {
        self.error_mode = Some(mode);
        self
    }

    /// The declared type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }
}

// Free-function constructors: `string().required()` reads
// better in schema declarations than `FieldSpec::new(FieldType::Str)`.

/// String field.
#[must_use]
pub fn string() -> FieldSpec {
    FieldSpec::new(FieldType::Str)
}

/// Integer field.
#[must_use]
pub fn integer() -> FieldSpec {
    FieldSpec::new(FieldType::Int)
}

/// Float field.
#[must_use]
pub fn float() -> FieldSpec {
    FieldSpec::new(FieldType::Float)
}

/// Boolean field.
#[must_use]
pub fn boolean() -> FieldSpec {
    FieldSpec::new(FieldType::Bool)
}

/// Date field.
#[must_use]
pub fn date() -> FieldSpec {
    FieldSpec::new(FieldType::Date)
}

/// Datetime field.
#[must_use]
pub fn datetime() -> FieldSpec {
    FieldSpec::new(FieldType::DateTime)
}

/// Untyped list field.
#[must_use]
pub fn list() -> FieldSpec {
    FieldSpec::new(FieldType::List)
}

/// Homogeneous list field with a scalar element type.
#[must_use]
pub fn list_of(element: FieldType) -> FieldSpec {
    FieldSpec::new(FieldType::ListOf(Box::new(element)))
}

/// List-of-objects field validated against a nested schema.
#[must_use]
pub fn list_of_schema(schema: Schema) -> FieldSpec {
    FieldSpec::new(FieldType::ListOfSchema(schema))
}

/// Field of a plugin-registered type.
pub fn custom(id: impl Into<TypeId>) -> FieldSpec {
    FieldSpec::new(FieldType::Custom(id.into()))
}

/// Field that passes the raw value through untouched.
#[must_use]
pub fn passthrough() -> FieldSpec {
    FieldSpec::new(FieldType::Passthrough)
}

/// Field cast by a one-argument function.
pub fn cast_with<F>(f: F) -> FieldSpec
where
    F: Fn(&Value) -> CastOutcome + Send + Sync + 'static,
{
    FieldSpec::new(FieldType::Func(CastFn::OneArg(Arc::new(f))))
}

// ============================================================================
// SCHEMA
// ============================================================================

/// One schema entry: a leaf field or a nested schema.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Leaf field.
    Field(FieldSpec),
    /// Object-valued field with its own schema. An error-mode override here
    /// is inherited by every descendant unless re-overridden.
    Nested {
        schema: Schema,
        error_mode: Option<ErrorMode>,
    },
}

/// An ordered mapping from field name to entry. Declaration order is
/// preserved and drives the walk order (significant under `raise` mode).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: IndexMap<String, Entry>,
}

impl Schema {
    /// Starts a schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The schema's entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &IndexMap<String, Entry> {
        &self.entries
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`Schema`]. Declaration faults surface from [`build`].
///
/// [`build`]: SchemaBuilder::build
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: IndexMap<String, Entry>,
    error: Option<ConfigError>,
}

impl SchemaBuilder {
    /// Declares a leaf field.
    #[must_use]
    pub fn field(self, key: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(key.into(), Entry::Field(spec))
    }

    /// Declares a nested object field.
    #[must_use]
    pub fn nested(self, key: impl Into<String>, schema: Schema) -> Self {
        self.insert(
            key.into(),
            Entry::Nested {
                schema,
                error_mode: None,
            },
        )
    }

    /// Declares a nested object field whose subtree uses its own error mode.
    #[must_use]
    pub fn nested_on_error(self, key: impl Into<String>, schema: Schema, mode: ErrorMode) -> Self {
        self.insert(
            key.into(),
            Entry::Nested {
                schema,
                error_mode: Some(mode),
            },
        )
    }

    fn insert(mut self, key: String, entry: Entry) -> Self {
        if self.error.is_some() {
            return self;
        }
        if key.is_empty() {
            self.error = Some(ConfigError::EmptySchemaKey);
            return self;
        }
        if self.entries.contains_key(&key) {
            self.error = Some(ConfigError::DuplicateField(key));
            return self;
        }
        self.entries.insert(key, entry);
        self
    }

    /// Finishes the schema, reporting the first declaration fault.
    pub fn build(self) -> Result<Schema, ConfigError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Schema {
                entries: self.entries,
            }),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let schema = Schema::builder()
            .field("b", string())
            .field("a", integer())
            .build()
            .unwrap();
        let keys: Vec<_> = schema.entries().keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_duplicate_field_is_config_error() {
        let err = Schema::builder()
            .field("a", string())
            .field("a", integer())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField(k) if k == "a"));
    }

    #[test]
    fn test_empty_key_is_config_error() {
        let err = Schema::builder().field("", string()).build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptySchemaKey));
    }

    #[test]
    fn test_type_ids() {
        assert_eq!(FieldType::Int.type_id().as_str(), "integer");
        assert_eq!(
            FieldType::ListOf(Box::new(FieldType::Str)).type_id().as_str(),
            "list"
        );
        assert_eq!(
            FieldType::Custom(TypeId::new("uuid")).type_id().as_str(),
            "uuid"
        );
    }
}
