//! Plugin catalogue: maps plugin identifiers to constructors.
//!
//! Built-in plugins are registered as named factories by the host binary.
//! Identifiers that are not built in fall through to the dynamic loader.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::PluginError;
use crate::loader::DynamicLoader;
use crate::traits::Plugin;

/// Creates a fresh plugin instance.
pub type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Registry of known plugin constructors.
#[derive(Default)]
pub struct PluginCatalog {
    /// Plugin ID → factory.
    factories: BTreeMap<String, PluginFactory>,
    /// Fallback for identifiers without a factory.
    loader: DynamicLoader,
}

impl PluginCatalog {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory, builder style.
    pub fn with<F>(mut self, plugin_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.add(plugin_id, factory);
        self
    }

    /// Adds a factory, replacing any previous one with the same identifier.
    pub fn add<F>(&mut self, plugin_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(plugin_id.into(), Box::new(factory));
    }

    /// Whether a built-in factory exists for `plugin_id`.
    pub fn contains(&self, plugin_id: &str) -> bool {
        self.factories.contains_key(plugin_id)
    }

    /// Built-in identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiates `plugin_id`.
    ///
    /// Built-in factories win; otherwise the dynamic loader looks in
    /// `plugin_dir`. Any failure is [`PluginError::Unresolved`].
    pub fn resolve(&self, plugin_id: &str, plugin_dir: &Path) -> Result<Box<dyn Plugin>, PluginError> {
        if let Some(factory) = self.factories.get(plugin_id) {
            return Ok(factory());
        }

        self.loader
            .load(plugin_dir, plugin_id)
            .map_err(|reason| PluginError::Unresolved {
                plugin: plugin_id.to_string(),
                reason,
            })
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("plugins", &self.ids())
            .field("loader", &self.loader)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginDescriptor;
    use crate::hooks::registry::HookRegistrar;
    use crate::logger::PluginLogger;
    use harvest_core::config::AppConfig;

    struct Quiet;

    impl Plugin for Quiet {
        fn initialize(
            &mut self,
            _config: &AppConfig,
            _descriptor: &PluginDescriptor,
            _hooks: &mut HookRegistrar<'_>,
            _logger: &PluginLogger,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_builtin() {
        let catalog = PluginCatalog::new()
            .with("quiet", || Box::new(Quiet))
            .with("another", || Box::new(Quiet));

        assert!(catalog.contains("quiet"));
        assert_eq!(catalog.ids(), vec!["another", "quiet"]);
        assert!(catalog.resolve("quiet", Path::new("./plugins")).is_ok());
    }

    #[test]
    fn test_resolve_unknown_is_unresolved() {
        let catalog = PluginCatalog::new();
        let dir = std::env::temp_dir().join("harvest-catalog-empty");
        match catalog.resolve("nope", &dir) {
            Err(PluginError::Unresolved { plugin, .. }) => assert_eq!(plugin, "nope"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown plugin resolved"),
        }
    }
}
