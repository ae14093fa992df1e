//! Shared fixtures for plugin integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use harvest_plugin::prelude::*;
use harvest_plugin::{PluginCatalog, PluginManager};

/// Shared, ordered log of what plugins did.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("call log poisoned").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("call log poisoned").clone()
    }
}

/// Test plugin driven by its descriptor params:
///
/// - `fail_init`: initialization returns an error
/// - `fail_hook`: the context_built handler returns an error
/// - `counter_hooks`: number of context_built handlers incrementing `counter`
pub struct Recorder {
    log: CallLog,
}

impl Recorder {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl Plugin for Recorder {
    fn initialize(
        &mut self,
        _config: &AppConfig,
        descriptor: &PluginDescriptor,
        hooks: &mut HookRegistrar<'_>,
        logger: &PluginLogger,
    ) -> anyhow::Result<()> {
        let id = descriptor.id().to_string();
        self.log.push(format!("init:{id}"));
        logger.info("initializing recorder");

        if descriptor.param_bool("fail_init") {
            anyhow::bail!("init switch set for {id}");
        }

        let counter_hooks = descriptor
            .params()
            .and_then(|p| p.get("counter_hooks"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        for _ in 0..counter_hooks {
            let log = self.log.clone();
            let id = id.clone();
            hooks.register(move |payload: &mut ContextBuilt, _: &mut AppConfig| {
                log.push(format!("context_built:{id}"));
                let counter = payload
                    .context
                    .get("counter")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                payload.context.insert("counter".to_string(), json!(counter + 1));
                Ok(())
            });
        }

        if descriptor.param_bool("fail_hook") {
            let log = self.log.clone();
            let id = id.clone();
            hooks.register(move |_: &mut ContextBuilt, _: &mut AppConfig| {
                log.push(format!("context_built:{id}"));
                anyhow::bail!("handler switch set")
            });
        }

        let log = self.log.clone();
        hooks.register(move |_: &mut ComposeSkipped, _: &mut AppConfig| {
            log.push(format!("compose_skipped:{id}"));
            Ok(())
        });

        Ok(())
    }
}

/// Catalogue where every id in `ids` is a [`Recorder`] sharing `log`.
pub fn catalog(ids: &[&str], log: &CallLog) -> PluginCatalog {
    ids.iter().fold(PluginCatalog::new(), |catalog, id| {
        let log = log.clone();
        catalog.with(*id, move || Box::new(Recorder::new(log.clone())))
    })
}

/// Configuration with the given plugin descriptors.
pub fn config_with(plugins: Vec<Value>) -> AppConfig {
    AppConfig {
        plugins,
        ..AppConfig::default()
    }
}

/// Loads plugins, panicking on a fatal error.
pub fn load(plugins: Vec<Value>, catalog: &PluginCatalog) -> PluginManager {
    PluginManager::load(&config_with(plugins), catalog).expect("plugins load")
}

/// Layer counting `WARN` events.
#[derive(Debug, Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runs `f` under a subscriber and returns its result with the number of
/// warnings it logged.
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let counter = WarnCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, counter.0.load(Ordering::SeqCst))
}
