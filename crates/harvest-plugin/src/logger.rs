//! Per-plugin logger handed to plugins during initialization.

use std::sync::Arc;

use tracing::{Span, info_span};

/// Logs on behalf of one plugin.
///
/// Every event is recorded inside a `plugin{plugin_id=...}` span so plugin
/// output can be filtered like any other target.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin_id: Arc<str>,
    span: Span,
}

impl PluginLogger {
    /// Creates a logger scoped to `plugin_id`.
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: Arc::from(plugin_id),
            span: info_span!("plugin", plugin_id = %plugin_id),
        }
    }

    /// Plugin this logger belongs to.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// The plugin span; handlers may clone it to log from hook callbacks.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Logs at debug level.
    pub fn debug(&self, message: &str) {
        self.span.in_scope(|| tracing::debug!("{message}"));
    }

    /// Logs at info level.
    pub fn info(&self, message: &str) {
        self.span.in_scope(|| tracing::info!("{message}"));
    }

    /// Logs a warning.
    pub fn warn(&self, message: &str) {
        self.span.in_scope(|| tracing::warn!("{message}"));
    }

    /// Logs an error.
    pub fn error(&self, message: &str) {
        self.span.in_scope(|| tracing::error!("{message}"));
    }
}
