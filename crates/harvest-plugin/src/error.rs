//! Plugin subsystem errors.

use thiserror::Error;

use harvest_core::error::{AppError, ErrorKind};

/// Boxed error carried as the cause of a plugin failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while loading plugins or notifying hooks.
///
/// The first three variants are recovered by the loader (logged and the
/// descriptor skipped). The last two abort the operation that raised them.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin descriptor is not an object with a string `plugin` key.
    #[error("Skipping invalid plugin configuration: {descriptor}")]
    InvalidDescriptor {
        /// The offending configuration entry, rendered as JSON.
        descriptor: String,
    },

    /// A plugin with the same identifier is already loaded.
    #[error("Plugin {plugin} is already loaded, skipping")]
    Duplicate {
        /// Plugin identifier.
        plugin: String,
    },

    /// The identifier does not name a known plugin.
    #[error("Plugin {plugin} could not be resolved: {reason}")]
    Unresolved {
        /// Plugin identifier.
        plugin: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The plugin returned an error from its initialization routine.
    #[error("Plugin {plugin} failed to initialize: {source}")]
    InitFailed {
        /// Plugin identifier.
        plugin: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// A hook handler returned an error.
    #[error("Hook {hook} registered by plugin {plugin} failed: {source}")]
    NotifyFailed {
        /// Plugin that registered the failing handler.
        plugin: String,
        /// Name of the notified hook.
        hook: &'static str,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },
}

impl PluginError {
    /// Whether the loader skips the descriptor instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidDescriptor { .. } | Self::Duplicate { .. } | Self::Unresolved { .. }
        )
    }

    /// Identifier of the plugin involved, when known.
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::InvalidDescriptor { .. } => None,
            Self::Duplicate { plugin }
            | Self::Unresolved { plugin, .. }
            | Self::InitFailed { plugin, .. }
            | Self::NotifyFailed { plugin, .. } => Some(plugin),
        }
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        AppError::with_source(ErrorKind::Plugin, err.to_string(), err)
    }
}
