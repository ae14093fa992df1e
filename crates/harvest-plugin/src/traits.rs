//! Traits implemented by plugins and their hook handlers.

use std::marker::PhantomData;

use harvest_core::config::AppConfig;

use crate::descriptor::PluginDescriptor;
use crate::hooks::definitions::HookPayload;
use crate::hooks::registry::HookRegistrar;
use crate::logger::PluginLogger;

/// Trait that all plugins must implement.
///
/// A plugin is instantiated once per process by the plugin manager and
/// initialized exactly once. There is no teardown.
pub trait Plugin: Send {
    /// Called once when the plugin is loaded.
    ///
    /// `descriptor` is this plugin's own configuration entry. Every hook
    /// registered through `hooks` is attributed to this plugin. Returning an
    /// error aborts plugin loading for the whole process.
    fn initialize(
        &mut self,
        config: &AppConfig,
        descriptor: &PluginDescriptor,
        hooks: &mut HookRegistrar<'_>,
        logger: &PluginLogger,
    ) -> anyhow::Result<()>;
}

/// Handler for one payload type.
///
/// Handlers run sequentially in registration order on the same payload and
/// configuration instances; mutations are visible to later handlers and to
/// the notifying caller. Returning an error stops the notification.
pub trait HookHandler<P: HookPayload>: Send + Sync + 'static {
    /// Handles one notification.
    fn handle(&self, payload: &mut P, config: &mut AppConfig) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`HookHandler`].
pub struct FnHandler<P, F> {
    /// The wrapped closure.
    handler: F,
    _payload: PhantomData<fn(&mut P)>,
}

impl<P, F> FnHandler<P, F>
where
    P: HookPayload,
    F: Fn(&mut P, &mut AppConfig) -> anyhow::Result<()> + Send + Sync + 'static,
{
    /// Wraps a closure.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _payload: PhantomData,
        }
    }
}

impl<P, F> HookHandler<P> for FnHandler<P, F>
where
    P: HookPayload,
    F: Fn(&mut P, &mut AppConfig) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn handle(&self, payload: &mut P, config: &mut AppConfig) -> anyhow::Result<()> {
        (self.handler)(payload, config)
    }
}

impl<P, F> std::fmt::Debug for FnHandler<P, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("handler", &"<closure>")
            .finish()
    }
}
