//! Plugin resolution through the engine: custom types, chaining and the
//! process-wide configuration.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use sift_params::prelude::*;

fn raw(json: serde_json::Value) -> Value {
    Value::from_json(&json)
}

fn strict_with(config: EngineConfig) -> RunOptions {
    RunOptions::default()
        .with_error_mode(ErrorMode::Strict)
        .with_registry(Arc::new(Registry::build(&config)))
}

// ============================================================================
// FIXTURE PLUGINS
// ============================================================================

/// Owns `uuid`: accepts hyphenated 36-char strings, lowercased.
struct UuidPlugin;

impl Plugin for UuidPlugin {
    fn name(&self) -> &str {
        "uuid"
    }

    fn types(&self) -> Vec<TypeId> {
        vec![TypeId::new("uuid")]
    }

    fn cast(&self, value: &Value, _ty: &TypeId, _opts: &RunOptions) -> CastOutcome {
        match value.as_str() {
            Some(s) if s.len() == 36 && s.bytes().filter(|&b| b == b'-').count() == 4 => {
                CastOutcome::Cast(Value::str(s.to_lowercase()))
            }
            _ => CastOutcome::fail("is not a valid uuid"),
        }
    }
}

/// Also claims `uuid`, but only handles the nil uuid and declines the rest.
struct NilUuidPlugin;

impl Plugin for NilUuidPlugin {
    fn name(&self) -> &str {
        "nil-uuid"
    }

    fn types(&self) -> Vec<TypeId> {
        vec![TypeId::new("uuid")]
    }

    fn cast(&self, value: &Value, _ty: &TypeId, _opts: &RunOptions) -> CastOutcome {
        match value.as_str() {
            Some("nil") => CastOutcome::Cast(Value::str("00000000-0000-0000-0000-000000000000")),
            _ => CastOutcome::NotHandled,
        }
    }
}

/// Shadows the built-in `integer`: parses strictly, no prefix forgiveness,
/// and declines non-strings back to the built-in.
struct StrictIntPlugin;

impl Plugin for StrictIntPlugin {
    fn name(&self) -> &str {
        "strict-int"
    }

    fn types(&self) -> Vec<TypeId> {
        vec![TypeId::new("integer")]
    }

    fn cast(&self, value: &Value, _ty: &TypeId, _opts: &RunOptions) -> CastOutcome {
        match value.as_str() {
            Some(s) => match s.parse::<i64>() {
                Ok(i) => CastOutcome::Cast(Value::Int(i)),
                Err(_) => CastOutcome::fail("is not a strict integer"),
            },
            None => CastOutcome::NotHandled,
        }
    }
}

/// Replaces the failure message of `min` rules on `integer` fields and
/// declines everything else.
struct MinMessagePlugin;

impl Plugin for MinMessagePlugin {
    fn name(&self) -> &str {
        "min-message"
    }

    fn types(&self) -> Vec<TypeId> {
        vec![TypeId::new("integer")]
    }

    fn check(&self, value: &Value, _ty: &TypeId, rule: &Rule, _opts: &RunOptions) -> CheckOutcome {
        match (rule, value.as_int()) {
            (Rule::Min { value: bound, .. }, Some(n)) => match bound.as_int() {
                Some(min) if n < min => CheckOutcome::Fail(format!("below the floor of {min}")),
                Some(_) => CheckOutcome::Pass,
                None => CheckOutcome::NotHandled,
            },
            _ => CheckOutcome::NotHandled,
        }
    }
}

// ============================================================================
// CAST RESOLUTION
// ============================================================================

#[test]
fn custom_type_casts_through_its_plugin() {
    let schema = Schema::builder().field("id", custom("uuid")).build().unwrap();
    let options = strict_with(EngineConfig::default().with_plugin(UuidPlugin));

    let result = run(
        &schema,
        &raw(json!({"id": "123E4567-E89B-12D3-A456-426614174000"})),
        &options,
    )
    .unwrap();
    assert_eq!(
        result.get("id").unwrap().value(),
        Some(&Value::str("123e4567-e89b-12d3-a456-426614174000"))
    );

    let result = run(&schema, &raw(json!({"id": "nope"})), &options).unwrap();
    assert_eq!(
        result.get("id").unwrap().errors(),
        Some(&["is not a valid uuid".to_owned()][..])
    );
}

#[test]
fn later_registration_wins_and_declining_falls_through() {
    let schema = Schema::builder().field("id", custom("uuid")).build().unwrap();
    let options = strict_with(
        EngineConfig::default()
            .with_plugin(UuidPlugin)
            .with_plugin(NilUuidPlugin),
    );

    // The newest plugin handles its special case.
    let result = run(&schema, &raw(json!({"id": "nil"})), &options).unwrap();
    assert_eq!(
        result.get("id").unwrap().value(),
        Some(&Value::str("00000000-0000-0000-0000-000000000000"))
    );

    // Everything it declines reaches the earlier registration.
    let result = run(
        &schema,
        &raw(json!({"id": "123e4567-e89b-12d3-a456-426614174000"})),
        &options,
    )
    .unwrap();
    assert!(result.get("id").unwrap().value().is_some());
}

#[test]
fn plugin_shadows_builtin_type_for_strings_only() {
    let schema = Schema::builder().field("n", integer()).build().unwrap();
    let options = strict_with(EngineConfig::default().with_plugin(StrictIntPlugin));

    // The shadowing plugin rejects what the built-in would forgive.
    let result = run(&schema, &raw(json!({"n": "12.34"})), &options).unwrap();
    assert_eq!(
        result.get("n").unwrap().errors(),
        Some(&["is not a strict integer".to_owned()][..])
    );

    // Non-strings decline back to the built-in float truncation.
    let result = run(&schema, &raw(json!({"n": 12.34})), &options).unwrap();
    assert_eq!(result.get("n").unwrap().value(), Some(&Value::Int(12)));
}

#[test]
fn unclaimed_type_with_no_willing_handler_fails_the_field() {
    struct Mute;
    impl Plugin for Mute {
        fn name(&self) -> &str {
            "mute"
        }
        fn types(&self) -> Vec<TypeId> {
            vec![TypeId::new("opaque")]
        }
        // No cast override: every input is declined.
    }

    let schema = Schema::builder().field("x", custom("opaque")).build().unwrap();
    let options = strict_with(EngineConfig::default().with_plugin(Mute));
    let result = run(&schema, &raw(json!({"x": "anything"})), &options).unwrap();
    assert_eq!(
        result.get("x").unwrap().errors(),
        Some(&["no cast available for type `opaque`".to_owned()][..])
    );
}

// ============================================================================
// RULE-CHECK RESOLUTION
// ============================================================================

#[test]
fn plugin_check_overrides_builtin_rule_semantics() {
    let schema = Schema::builder()
        .field("age", integer().rule(Rule::min(18)).rule(Rule::max(120)))
        .build()
        .unwrap();
    let options = strict_with(EngineConfig::default().with_plugin(MinMessagePlugin));

    let result = run(&schema, &raw(json!({"age": "10"})), &options).unwrap();
    assert_eq!(
        result.get("age").unwrap().errors(),
        Some(&["below the floor of 18".to_owned()][..])
    );

    // The declined `max` rule still runs with built-in semantics.
    let result = run(&schema, &raw(json!({"age": "200"})), &options).unwrap();
    assert_eq!(
        result.get("age").unwrap().errors(),
        Some(&["must be at most 120".to_owned()][..])
    );
}

// ============================================================================
// PROCESS-WIDE CONFIGURATION
// ============================================================================

// Global state is touched by exactly one test in this binary; everything
// else injects a registry through the run options.
#[test]
fn configure_installs_defaults_and_plugins_process_wide() {
    assert!(matches!(configured_error_mode(), ErrorMode::Fallback));

    configure(
        EngineConfig::default()
            .with_error_mode(ErrorMode::Strict)
            .with_plugin(UuidPlugin),
    );
    assert!(matches!(configured_error_mode(), ErrorMode::Strict));
    assert_eq!(configured_plugins().len(), 1);

    // Without a run-level mode, the configured default applies.
    let schema = Schema::builder()
        .field("name", string().required())
        .field("id", custom("uuid"))
        .build()
        .unwrap();
    let result = run(&schema, &raw(json!({"id": "nope"})), &RunOptions::default()).unwrap();
    assert_eq!(
        result.get("name").unwrap().errors(),
        Some(&["required".to_owned()][..])
    );
    assert_eq!(
        result.get("id").unwrap().errors(),
        Some(&["is not a valid uuid".to_owned()][..])
    );

    // Reconfiguring invalidates the cached registry.
    configure(EngineConfig::default());
    let registry = rebuild();
    assert!(!registry.knows(&TypeId::new("uuid")));
    let result = run(&schema, &raw(json!({})), &RunOptions::default()).unwrap();
    // Back to the built-in fallback default: failures become nulls.
    assert_eq!(result.get("name").unwrap().value(), Some(&Value::Null));
}
