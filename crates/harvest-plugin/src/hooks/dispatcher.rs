//! Hook dispatcher: notifies registered handlers of pipeline events.
//!
//! - Handlers are called sequentially, in registration order.
//! - Each handler receives the same payload and configuration instances,
//!   so mutations made by one handler are visible to the next one and to
//!   the caller once `notify` returns.
//! - The first failing handler stops the notification; handlers after it
//!   do not run.
//!
//! There is no timeout: a handler that never returns blocks the caller.

use std::sync::Arc;

use tracing::{debug, debug_span, error};

use harvest_core::config::AppConfig;

use super::definitions::{HookPayload, HookType};
use super::registry::HookRegistry;
use crate::error::PluginError;

/// Dispatches payloads to all handlers registered for their type.
///
/// Cloning is cheap; every parallel worker may hold its own dispatcher.
#[derive(Debug, Clone, Default)]
pub struct HookDispatcher {
    /// Hook registry, read-only once plugins are loaded.
    registry: Arc<HookRegistry>,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a dispatcher without any handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Notifies every handler registered for `P`.
    ///
    /// Returns `Ok(())` immediately when nothing is registered.
    pub fn notify<P: HookPayload>(
        &self,
        payload: &mut P,
        config: &mut AppConfig,
    ) -> Result<(), PluginError> {
        let hook = HookType::of::<P>();
        let entries = self.registry.lookup(hook);

        if entries.is_empty() {
            return Ok(());
        }

        debug!(hook = %hook, handler_count = entries.len(), "Notifying hook");

        for entry in entries {
            let span = debug_span!("hook", hook = %hook, plugin_id = %entry.plugin_id());
            let _guard = span.enter();

            if let Err(cause) = entry.invoke(payload, config) {
                error!(
                    hook = %hook,
                    plugin_id = %entry.plugin_id(),
                    error = %cause,
                    "Hook handler failed"
                );
                return Err(PluginError::NotifyFailed {
                    plugin: entry.plugin_id().to_string(),
                    hook: hook.name(),
                    source: cause.into(),
                });
            }
        }

        Ok(())
    }

    /// Returns whether any handler is registered for `P`.
    pub fn has_handlers<P: HookPayload>(&self) -> bool {
        self.registry.has_handlers(HookType::of::<P>())
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}
