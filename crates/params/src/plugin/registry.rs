//! Type registry: maps type identifiers to their candidate plugins.
//!
//! The registry is a pure function of the engine configuration, built once
//! and cached process-wide. The cache slot is published atomically
//! (publish-then-read); a race that builds it twice produces identical
//! registries and is harmless. Tests and runtime reconfiguration force a
//! rebuild via [`configure`] or [`rebuild`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use tracing::debug;

use crate::plugin::{BuiltinPlugin, Plugin};
use crate::schema::{ErrorMode, TypeId};

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Process-wide configuration read at registry-build time.
#[derive(Clone, Default)]
pub struct EngineConfig {
    /// Error mode used when neither the field nor the run options declare
    /// one. Defaults to [`ErrorMode::Fallback`].
    pub default_error_mode: ErrorMode,
    /// Additional plugins, in registration order. Later plugins shadow
    /// earlier ones (and the built-ins) for the types they declare.
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl EngineConfig {
    /// Sets the process default error mode.
    #[must_use]
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.default_error_mode = mode;
        self
    }

    /// Registers an additional plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("default_error_mode", &self.default_error_mode)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Immutable resolution table from type identifier to candidate plugins.
pub struct Registry {
    /// All plugins in registration order, built-in first.
    plugins: Vec<Arc<dyn Plugin>>,
    /// Candidate indices per type, newest registration first.
    by_type: HashMap<TypeId, Vec<usize>>,
    /// The configured process default error mode, captured at build time.
    default_mode: ErrorMode,
}

impl Registry {
    /// Builds a registry from a configuration: the built-in plugin first,
    /// then every configured plugin in order.
    #[must_use]
    pub fn build(config: &EngineConfig) -> Self {
        let mut plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(BuiltinPlugin)];
        plugins.extend(config.plugins.iter().cloned());

        let mut by_type: HashMap<TypeId, Vec<usize>> = HashMap::new();
        for (index, plugin) in plugins.iter().enumerate() {
            for ty in plugin.types() {
                // Newest first: each registration prepends itself.
                by_type.entry(ty).or_default().insert(0, index);
            }
        }

        debug!(
            plugins = plugins.len(),
            types = by_type.len(),
            "built type registry"
        );

        Self {
            plugins,
            by_type,
            default_mode: config.default_error_mode.clone(),
        }
    }

    /// Candidate plugins for a type, most-recently-registered first.
    /// Empty for unregistered types (an "unsupported type" cast error at
    /// the call site).
    pub fn candidates(&self, ty: &TypeId) -> impl Iterator<Item = &dyn Plugin> {
        self.by_type
            .get(ty)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| self.plugins[i].as_ref())
    }

    /// True when at least one plugin declares the type.
    #[must_use]
    pub fn knows(&self, ty: &TypeId) -> bool {
        self.by_type.contains_key(ty)
    }

    /// The configured process default error mode.
    #[must_use]
    pub fn default_mode(&self) -> &ErrorMode {
        &self.default_mode
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("types", &self.by_type.len())
            .field("default_mode", &self.default_mode)
            .finish()
    }
}

// ============================================================================
// PROCESS-WIDE CACHE
// ============================================================================

static CONFIG: RwLock<Option<EngineConfig>> = RwLock::new(None);
static REGISTRY: ArcSwapOption<Registry> = ArcSwapOption::const_empty();

/// Installs the process-wide engine configuration and invalidates the
/// cached registry. Typically called once at startup.
pub fn configure(config: EngineConfig) {
    *CONFIG.write() = Some(config);
    REGISTRY.store(None);
}

/// The configured process default error mode (`fallback` when unset).
#[must_use]
pub fn configured_error_mode() -> ErrorMode {
    CONFIG
        .read()
        .as_ref()
        .map(|c| c.default_error_mode.clone())
        .unwrap_or_default()
}

/// The configured additional plugins (empty when unset).
#[must_use]
pub fn configured_plugins() -> Vec<Arc<dyn Plugin>> {
    CONFIG
        .read()
        .as_ref()
        .map(|c| c.plugins.clone())
        .unwrap_or_default()
}

/// The process-wide registry, built lazily from the installed configuration.
#[must_use]
pub fn global() -> Arc<Registry> {
    if let Some(registry) = REGISTRY.load_full() {
        return registry;
    }
    let config = CONFIG.read().clone().unwrap_or_default();
    let built = Arc::new(Registry::build(&config));
    REGISTRY.store(Some(Arc::clone(&built)));
    built
}

/// Drops the cached registry and rebuilds it from the current
/// configuration. Exposed so tests can force a clean build.
#[must_use]
pub fn rebuild() -> Arc<Registry> {
    REGISTRY.store(None);
    global()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Owner(&'static str, &'static str);

    impl Plugin for Owner {
        fn name(&self) -> &str {
            self.0
        }
        fn types(&self) -> Vec<TypeId> {
            vec![TypeId::new(self.1)]
        }
    }

    #[test]
    fn test_builtin_is_always_registered() {
        let registry = Registry::build(&EngineConfig::default());
        assert!(registry.knows(&TypeId::new("integer")));
        let names: Vec<_> = registry
            .candidates(&TypeId::new("integer"))
            .map(Plugin::name)
            .collect();
        assert_eq!(names, ["builtin"]);
    }

    #[test]
    fn test_later_registration_wins() {
        let config = EngineConfig::default()
            .with_plugin(Owner("first", "uuid"))
            .with_plugin(Owner("second", "uuid"));
        let registry = Registry::build(&config);

        let names: Vec<_> = registry
            .candidates(&TypeId::new("uuid"))
            .map(Plugin::name)
            .collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[test]
    fn test_plugin_can_shadow_builtin_type() {
        let config = EngineConfig::default().with_plugin(Owner("mine", "integer"));
        let registry = Registry::build(&config);

        let names: Vec<_> = registry
            .candidates(&TypeId::new("integer"))
            .map(Plugin::name)
            .collect();
        assert_eq!(names, ["mine", "builtin"]);
    }

    #[test]
    fn test_unregistered_type_has_no_candidates() {
        let registry = Registry::build(&EngineConfig::default());
        assert!(!registry.knows(&TypeId::new("nope")));
        assert_eq!(registry.candidates(&TypeId::new("nope")).count(), 0);
    }
}
