//! Plugin manager: loads plugins from configuration and owns their hooks.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use harvest_core::config::AppConfig;

use crate::catalog::PluginCatalog;
use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use crate::hooks::dispatcher::HookDispatcher;
use crate::hooks::registry::{HookRegistrar, HookRegistry};
use crate::logger::PluginLogger;
use crate::traits::Plugin;

/// A plugin that finished initialization.
struct LoadedPlugin {
    descriptor: PluginDescriptor,
    _instance: Box<dyn Plugin>,
}

/// Owns the loaded plugins and the hook registry they populated.
///
/// Loading happens once, in [`PluginManager::load`]. Afterwards the registry
/// is read-only and shared through [`HookDispatcher`]s.
pub struct PluginManager {
    /// Loaded plugins in configuration order.
    plugins: Vec<LoadedPlugin>,
    /// Configuration index → reason, for every skipped descriptor.
    skipped: Vec<(usize, PluginError)>,
    /// Hook registry, frozen once loading is done.
    hook_registry: Arc<HookRegistry>,
}

impl PluginManager {
    /// A manager with no plugins and no hooks.
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
            skipped: Vec::new(),
            hook_registry: Arc::new(HookRegistry::new()),
        }
    }

    /// Loads every plugin listed in `config.plugins`, in order.
    ///
    /// Invalid, duplicate and unresolvable descriptors are logged and
    /// skipped. The first plugin whose initialization fails aborts loading;
    /// plugins after it are not loaded.
    pub fn load(config: &AppConfig, catalog: &PluginCatalog) -> Result<Self, PluginError> {
        if config.plugins.is_empty() {
            info!("No plugins to load");
            return Ok(Self::empty());
        }

        let mut registry = HookRegistry::new();
        let mut plugins: Vec<LoadedPlugin> = Vec::new();
        let mut skipped = Vec::new();
        let mut loaded_ids: HashSet<String> = HashSet::new();

        for (index, raw) in config.plugins.iter().enumerate() {
            let descriptor = match PluginDescriptor::from_value(raw) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!(index, error = %e, "Invalid plugin descriptor");
                    skipped.push((index, e));
                    continue;
                }
            };
            let plugin_id = descriptor.id().to_string();

            if loaded_ids.contains(&plugin_id) {
                let e = PluginError::Duplicate { plugin: plugin_id };
                warn!(index, error = %e, "Duplicate plugin descriptor");
                skipped.push((index, e));
                continue;
            }

            let mut instance = match catalog.resolve(&plugin_id, &config.plugin_dir) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!(index, error = %e, "Plugin could not be resolved");
                    skipped.push((index, e));
                    continue;
                }
            };

            let logger = PluginLogger::new(&plugin_id);
            let hooks_before = registry.len();
            let result = {
                let mut registrar = HookRegistrar::new(&mut registry, &plugin_id);
                logger
                    .span()
                    .in_scope(|| instance.initialize(config, &descriptor, &mut registrar, &logger))
            };

            if let Err(cause) = result {
                error!(plugin_id = %plugin_id, error = %cause, "Plugin initialization failed");
                return Err(PluginError::InitFailed {
                    plugin: plugin_id,
                    source: cause.into(),
                });
            }

            info!(
                plugin_id = %plugin_id,
                hooks = registry.len() - hooks_before,
                "Plugin loaded"
            );

            loaded_ids.insert(plugin_id);
            plugins.push(LoadedPlugin {
                descriptor,
                _instance: instance,
            });
        }

        info!(
            loaded = plugins.len(),
            skipped = skipped.len(),
            hooks = registry.len(),
            "Plugin loading complete"
        );

        Ok(Self {
            plugins,
            skipped,
            hook_registry: Arc::new(registry),
        })
    }

    /// Identifiers of the loaded plugins, in load order.
    pub fn loaded_plugins(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.descriptor.id()).collect()
    }

    /// Descriptor of a loaded plugin.
    pub fn descriptor(&self, plugin_id: &str) -> Option<&PluginDescriptor> {
        self.plugins
            .iter()
            .map(|p| &p.descriptor)
            .find(|d| d.id() == plugin_id)
    }

    /// Descriptors skipped while loading, with their configuration index.
    pub fn skipped(&self) -> &[(usize, PluginError)] {
        &self.skipped
    }

    /// Returns the hook registry.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hook_registry
    }

    /// Returns a dispatcher sharing this manager's registry.
    pub fn dispatcher(&self) -> HookDispatcher {
        HookDispatcher::new(Arc::clone(&self.hook_registry))
    }

    /// Consumes the manager, keeping only its hooks.
    pub fn into_dispatcher(self) -> HookDispatcher {
        HookDispatcher::new(self.hook_registry)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.loaded_plugins())
            .field("skipped", &self.skipped.len())
            .field("hooks", &self.hook_registry.len())
            .finish()
    }
}
