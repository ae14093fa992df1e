//! Hook handlers of the demo plugin.

use serde_json::json;

use harvest_plugin::prelude::*;

/// Config key set by [`SampleValue`].
pub const SAMPLE_VALUE_KEY: &str = "sample_value";

/// Context key incremented by [`IncrementContext`].
pub const INCREMENTING_KEY: &str = "incrementing";

/// Stores `sample_value = 1` in the configuration.
pub struct SampleValue {
    logger: PluginLogger,
}

impl SampleValue {
    pub fn new(logger: PluginLogger) -> Self {
        Self { logger }
    }
}

impl HookHandler<ConfigLoaded> for SampleValue {
    fn handle(&self, _payload: &mut ConfigLoaded, config: &mut AppConfig) -> anyhow::Result<()> {
        self.logger.info("Running the sample value hook");
        config.set_extra_value(SAMPLE_VALUE_KEY, json!(1));
        Ok(())
    }
}

/// Increments the `incrementing` counter of every built context.
pub struct IncrementContext {
    logger: PluginLogger,
}

impl IncrementContext {
    pub fn new(logger: PluginLogger) -> Self {
        Self { logger }
    }
}

impl HookHandler<ContextBuilt> for IncrementContext {
    fn handle(&self, payload: &mut ContextBuilt, _config: &mut AppConfig) -> anyhow::Result<()> {
        let current = payload
            .context
            .get(INCREMENTING_KEY)
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        payload
            .context
            .insert(INCREMENTING_KEY.to_string(), json!(current + 1));
        self.logger
            .debug(&format!("Context counter is now {}", current + 1));
        Ok(())
    }
}

/// Always fails.
pub fn problematic_hook(_payload: &mut ConfigLoaded, _config: &mut AppConfig) -> anyhow::Result<()> {
    anyhow::bail!("Testing plugin exception")
}
