//! Dynamic plugin loader using `libloading` (feature-gated).

/// Symbol every dynamic plugin library exports, see [`declare_plugin!`](crate::declare_plugin).
pub const CREATE_SYMBOL: &[u8] = b"harvest_plugin_create";

#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::path::{Path, PathBuf};

    use tracing::{debug, info};

    use super::CREATE_SYMBOL;
    use crate::traits::Plugin;

    /// Type of the plugin creation function exported by dynamic plugins.
    pub type CreatePluginFn = unsafe extern "Rust" fn() -> Box<dyn Plugin>;

    /// Loads plugins from shared libraries (.so / .dll / .dylib).
    #[derive(Debug, Default)]
    pub struct DynamicLoader;

    impl DynamicLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self
        }

        /// Library path for a plugin identifier, e.g. `<dir>/lib<id>.so`.
        pub fn library_path(plugin_dir: &Path, plugin_id: &str) -> PathBuf {
            plugin_dir.join(libloading::library_filename(plugin_id))
        }

        /// Loads the plugin named `plugin_id` from `plugin_dir`.
        ///
        /// The library must be built against the same `harvest-plugin`
        /// version with the same compiler. It stays mapped for the rest of
        /// the process because its code backs every registered handler.
        pub fn load(&self, plugin_dir: &Path, plugin_id: &str) -> Result<Box<dyn Plugin>, String> {
            let path = Self::library_path(plugin_dir, plugin_id);
            if !path.is_file() {
                return Err(format!("no plugin library at '{}'", path.display()));
            }

            debug!(plugin_id = %plugin_id, path = %path.display(), "Opening plugin library");

            // SAFETY: plugin libraries are trusted code placed in the plugin
            // directory by the operator; initialisers run on load.
            let library = unsafe { libloading::Library::new(&path) }.map_err(|e| {
                format!("failed to load plugin library '{}': {e}", path.display())
            })?;

            let plugin = {
                // SAFETY: the symbol is generated by `declare_plugin!` with
                // exactly the `CreatePluginFn` signature.
                let create: libloading::Symbol<'_, CreatePluginFn> =
                    unsafe { library.get(CREATE_SYMBOL) }.map_err(|e| {
                        format!(
                            "plugin library '{}' has no 'harvest_plugin_create' symbol: {e}",
                            path.display()
                        )
                    })?;
                // SAFETY: see above.
                unsafe { create() }
            };

            std::mem::forget(library);

            info!(plugin_id = %plugin_id, path = %path.display(), "Dynamic plugin loaded");

            Ok(plugin)
        }
    }
}

/// Stub loader when dynamic feature is not enabled.
#[cfg(not(feature = "dynamic"))]
pub mod dynamic_loader {
    use std::path::Path;

    use crate::traits::Plugin;

    /// Stub dynamic loader; never resolves anything.
    #[derive(Debug, Default)]
    pub struct DynamicLoader;

    impl DynamicLoader {
        /// Creates a stub loader.
        pub fn new() -> Self {
            Self
        }

        /// Always fails: the `dynamic` feature is disabled.
        pub fn load(&self, _plugin_dir: &Path, plugin_id: &str) -> Result<Box<dyn Plugin>, String> {
            Err(format!(
                "'{plugin_id}' is not a built-in plugin and dynamic loading is disabled"
            ))
        }
    }
}

pub use dynamic_loader::DynamicLoader;
