//! # sift-params
//!
//! A declarative, schema-based parameter validation and type-coercion
//! engine. Feed it a schema and a raw parameter map (as parsed from an HTTP
//! query string or form body) and get back a fully-typed, validated result.
//! Failures turn into per-field error markers, silent defaults or a hard
//! abort, depending on the configured error mode.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sift_params::prelude::*;
//!
//! let schema = Schema::builder()
//!     .field("name", string().required())
//!     .field("age", integer().rule(Rule::min(18)).rule(Rule::max(120)))
//!     .field("page", integer().default_to(1))
//!     .build()?;
//!
//! let raw = Value::from_json(&serde_json::json!({"name": "John", "age": "25"}));
//! let result = run(&schema, &raw, &RunOptions::default().with_error_mode(ErrorMode::Strict))?;
//!
//! assert!(result.is_valid());
//! assert_eq!(collect_errors(&result), None);
//! ```
//!
//! ## Error modes
//!
//! - `strict`: failing fields become in-place error markers; the result
//!   always keeps the schema's shape.
//! - `fallback`: failing fields are silently replaced with their default
//!   (the engine-wide default mode).
//! - `raise`: the first failing field aborts the run.
//! - custom: a callback picks the replacement value per failing field.
//!
//! ## Plugins
//!
//! Custom types register through [`Plugin`](plugin::Plugin) and an
//! [`EngineConfig`](plugin::EngineConfig); the most-recently-registered
//! plugin owns a type, and handlers can decline per input to fall through
//! to earlier registrations (the built-ins included).

// Error markers travel in results, not in Err variants, so the error types
// here stay small; no boxing needed.
#![allow(clippy::result_large_err)]

pub mod cast;
pub mod collect;
pub mod engine;
pub mod error;
pub mod plugin;
pub mod prelude;
pub mod rules;
pub mod schema;
pub mod value;

pub use collect::{ErrorTree, collect_errors};
pub use engine::{Outcome, RunOptions, run};
pub use error::{ConfigError, Messages, RunError};
pub use schema::{ErrorMode, FieldSpec, FieldType, Schema, TypeId};
pub use value::Value;
