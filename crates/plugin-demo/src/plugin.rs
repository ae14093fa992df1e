//! Demo plugin implementation.

use harvest_plugin::prelude::*;

use crate::hooks::{IncrementContext, SampleValue, problematic_hook};

/// Identifier the demo plugin is registered under.
pub const PLUGIN_ID: &str = "demo";

/// Demo plugin; see the crate documentation.
#[derive(Debug, Default)]
pub struct DemoPlugin;

impl DemoPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for DemoPlugin {
    fn initialize(
        &mut self,
        _config: &AppConfig,
        descriptor: &PluginDescriptor,
        hooks: &mut HookRegistrar<'_>,
        logger: &PluginLogger,
    ) -> anyhow::Result<()> {
        logger.info("Initializing plugin");

        hooks.register_handler::<ConfigLoaded, _>(SampleValue::new(logger.clone()));
        let log = logger.clone();
        hooks.register(move |_: &mut ConfigLoaded, _: &mut AppConfig| {
            log.info("config_loaded was registered twice, no problems");
            Ok(())
        });
        hooks.register_handler::<ContextBuilt, _>(IncrementContext::new(logger.clone()));

        let log = logger.clone();
        hooks.register(move |payload: &mut UnitSuccess, _: &mut AppConfig| {
            log.info(&format!("Unit built with {} keys", payload.context.len()));
            Ok(())
        });
        let log = logger.clone();
        hooks.register(move |_: &mut UnitSkipped, _: &mut AppConfig| {
            log.info("Unit skipped");
            Ok(())
        });
        let log = logger.clone();
        hooks.register(move |payload: &mut ExecutionSuccess, _: &mut AppConfig| {
            log.info(&format!("Simulation succeeded in {}", payload.unit.dir.display()));
            Ok(())
        });
        let log = logger.clone();
        hooks.register(move |payload: &mut ExecutionFailed, _: &mut AppConfig| {
            log.warn(&format!(
                "Simulation reported {} errors in {}",
                payload.error_line_count(),
                payload.unit.dir.display()
            ));
            Ok(())
        });

        if descriptor.param_bool("raise_init") {
            anyhow::bail!("Testing plugin exception");
        }

        if descriptor.param_bool("raise_hook") {
            hooks.register(problematic_hook);
        }

        Ok(())
    }
}
