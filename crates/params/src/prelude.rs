//! Common imports for schema declaration and running the engine.
//!
//! ```rust,ignore
//! use sift_params::prelude::*;
//! ```

pub use crate::collect::{ErrorTree, collect_errors};
pub use crate::engine::{Outcome, RunOptions, run};
pub use crate::error::{ConfigError, Messages, RunError};
pub use crate::plugin::{
    CastOutcome, CheckOutcome, EngineConfig, Plugin, Registry,
    registry::{configure, configured_error_mode, configured_plugins, rebuild},
};
pub use crate::rules::{Rule, RuleOutcome};
pub use crate::schema::{
    DefaultSpec, Entry, ErrorMode, FieldSpec, FieldType, Schema, TypeId, boolean, cast_with,
    custom, date, datetime, float, integer, list, list_of, list_of_schema, passthrough, string,
};
pub use crate::value::{Map, Value, normalize_indexed_lists};
