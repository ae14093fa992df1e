//! Hook registry: plugins register handlers by payload type, in order.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use harvest_core::config::AppConfig;

use super::definitions::{HookPayload, HookType};
use crate::traits::{FnHandler, HookHandler};

/// Type-erased handler stored in the registry.
trait ErasedHandler: Send + Sync {
    fn call(&self, payload: &mut dyn Any, config: &mut AppConfig) -> anyhow::Result<()>;
}

/// Restores the payload type before calling the typed handler.
struct Typed<P, H> {
    handler: H,
    _payload: PhantomData<fn(&mut P)>,
}

impl<P, H> ErasedHandler for Typed<P, H>
where
    P: HookPayload,
    H: HookHandler<P>,
{
    fn call(&self, payload: &mut dyn Any, config: &mut AppConfig) -> anyhow::Result<()> {
        match payload.downcast_mut::<P>() {
            Some(payload) => self.handler.handle(payload, config),
            None => Err(anyhow::anyhow!(
                "payload does not match hook type '{}'",
                P::NAME
            )),
        }
    }
}

/// One registered hook handler.
///
/// Cloning is cheap; clones share the handler.
#[derive(Clone)]
pub struct HookEntry {
    /// The handler.
    handler: Arc<dyn ErasedHandler>,
    /// Plugin that registered this handler.
    plugin_id: Arc<str>,
    /// Payload type the handler is registered against.
    hook: HookType,
    /// Registration order across the whole registry.
    sequence: usize,
}

impl HookEntry {
    /// Returns the plugin ID owning this handler.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Returns the hook type this handler is registered against.
    pub fn hook(&self) -> HookType {
        self.hook
    }

    /// Returns the registry-wide registration sequence number.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Invokes the handler.
    pub(crate) fn invoke(
        &self,
        payload: &mut dyn Any,
        config: &mut AppConfig,
    ) -> anyhow::Result<()> {
        self.handler.call(payload, config)
    }
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("plugin_id", &self.plugin_id)
            .field("hook", &self.hook.name())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl fmt::Display for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (plugin: {}, #{})",
            self.hook, self.plugin_id, self.sequence
        )
    }
}

/// Registry of hook handlers organized by payload type.
///
/// Registration needs `&mut self` and only happens while plugins are
/// initialized. The registry is then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct HookRegistry {
    /// Hook type → handlers in registration order.
    handlers: HashMap<HookType, Vec<HookEntry>>,
    /// Hook types in the order they were first registered.
    order: Vec<HookType>,
    /// Total registrations so far.
    registered: usize,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for payload type `P` on behalf of `plugin_id`.
    ///
    /// Never fails and never deduplicates.
    pub fn register<P, H>(&mut self, plugin_id: &str, handler: H) -> HookEntry
    where
        P: HookPayload,
        H: HookHandler<P>,
    {
        let hook = HookType::of::<P>();
        let entry = HookEntry {
            handler: Arc::new(Typed {
                handler,
                _payload: PhantomData,
            }),
            plugin_id: Arc::from(plugin_id),
            hook,
            sequence: self.registered,
        };
        self.registered += 1;

        let entries = self.handlers.entry(hook).or_insert_with(|| {
            self.order.push(hook);
            Vec::new()
        });
        entries.push(entry.clone());

        info!(
            hook = %hook,
            plugin_id = %plugin_id,
            position = entries.len(),
            "Hook handler registered"
        );

        entry
    }

    /// Returns the handlers for a hook type, in registration order.
    ///
    /// Unknown hook types yield an empty slice.
    pub fn lookup(&self, hook: HookType) -> &[HookEntry] {
        self.handlers
            .get(&hook)
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the handlers registered for payload type `P`.
    pub fn handlers<P: HookPayload>(&self) -> &[HookEntry] {
        self.lookup(HookType::of::<P>())
    }

    /// Returns whether any handlers are registered for a hook type.
    pub fn has_handlers(&self, hook: HookType) -> bool {
        !self.lookup(hook).is_empty()
    }

    /// Returns the number of handlers registered for a hook type.
    pub fn handler_count(&self, hook: HookType) -> usize {
        self.lookup(hook).len()
    }

    /// Returns all registered hook types in first-registration order.
    pub fn registered_hooks(&self) -> Vec<HookType> {
        self.order.clone()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.registered
    }

    /// Whether no handler has been registered.
    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }
}

/// Registration capability handed to one plugin during initialization.
///
/// Every entry created through it is attributed to that plugin.
pub struct HookRegistrar<'a> {
    registry: &'a mut HookRegistry,
    plugin_id: &'a str,
}

impl<'a> HookRegistrar<'a> {
    /// Creates a registrar scoped to `plugin_id`.
    pub fn new(registry: &'a mut HookRegistry, plugin_id: &'a str) -> Self {
        Self {
            registry,
            plugin_id,
        }
    }

    /// Returns the plugin this registrar is scoped to.
    pub fn plugin_id(&self) -> &str {
        self.plugin_id
    }

    /// Registers a closure for payload type `P`.
    pub fn register<P, F>(&mut self, handler: F) -> HookEntry
    where
        P: HookPayload,
        F: Fn(&mut P, &mut AppConfig) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry
            .register::<P, _>(self.plugin_id, FnHandler::new(handler))
    }

    /// Registers a [`HookHandler`] implementation for payload type `P`.
    pub fn register_handler<P, H>(&mut self, handler: H) -> HookEntry
    where
        P: HookPayload,
        H: HookHandler<P>,
    {
        self.registry.register::<P, H>(self.plugin_id, handler)
    }
}

impl fmt::Debug for HookRegistrar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistrar")
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::definitions::{ComposeSkipped, ContextBuilt, UnitSuccess};

    fn noop(_: &mut ContextBuilt, _: &mut AppConfig) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_lookup_unknown_hook_is_empty() {
        let registry = HookRegistry::new();
        assert!(registry.handlers::<ContextBuilt>().is_empty());
        assert!(!registry.has_handlers(HookType::of::<ComposeSkipped>()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_keeps_order_and_duplicates() {
        let mut registry = HookRegistry::new();
        registry.register::<ContextBuilt, _>("p1", FnHandler::new(noop));
        registry.register::<ContextBuilt, _>("p1", FnHandler::new(noop));
        registry.register::<ContextBuilt, _>("p2", FnHandler::new(noop));

        let entries = registry.handlers::<ContextBuilt>();
        assert_eq!(entries.len(), 3);
        let plugins: Vec<&str> = entries.iter().map(|e| e.plugin_id()).collect();
        assert_eq!(plugins, vec!["p1", "p1", "p2"]);
        let sequences: Vec<usize> = entries.iter().map(|e| e.sequence()).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_registrar_attributes_entries() {
        let mut registry = HookRegistry::new();
        let entry = {
            let mut registrar = HookRegistrar::new(&mut registry, "audit");
            registrar.register(|_: &mut UnitSuccess, _: &mut AppConfig| Ok(()))
        };

        assert_eq!(entry.plugin_id(), "audit");
        assert_eq!(entry.hook(), HookType::of::<UnitSuccess>());
        assert_eq!(registry.handler_count(HookType::of::<UnitSuccess>()), 1);
        assert_eq!(entry.to_string(), "unit_success (plugin: audit, #0)");
    }

    #[test]
    fn test_registered_hooks_in_first_registration_order() {
        let mut registry = HookRegistry::new();
        let mut registrar = HookRegistrar::new(&mut registry, "p1");
        registrar.register(|_: &mut UnitSuccess, _: &mut AppConfig| Ok(()));
        registrar.register(|_: &mut ContextBuilt, _: &mut AppConfig| Ok(()));
        registrar.register(|_: &mut UnitSuccess, _: &mut AppConfig| Ok(()));

        assert_eq!(
            registry.registered_hooks(),
            vec![HookType::of::<UnitSuccess>(), HookType::of::<ContextBuilt>()]
        );
        assert_eq!(registry.len(), 3);
    }
}
