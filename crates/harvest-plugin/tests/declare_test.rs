//! The exported entry point produced by `declare_plugin!`.

mod helpers;

use serde_json::json;

use harvest_plugin::declare_plugin;
use harvest_plugin::hooks::definitions::ComposeSkipped;
use harvest_plugin::hooks::registry::{HookRegistrar, HookRegistry};
use harvest_plugin::{HookType, PluginDescriptor, PluginLogger};
use harvest_core::config::AppConfig;
use helpers::{CallLog, Recorder};

impl Default for Recorder {
    fn default() -> Self {
        Recorder::new(CallLog::default())
    }
}

declare_plugin!(Recorder);

#[test]
fn test_entry_point_creates_plugin() {
    let mut plugin = harvest_plugin_create();
    let descriptor = PluginDescriptor::from_value(&json!({"plugin": "exported"})).expect("valid");
    let mut registry = HookRegistry::new();

    plugin
        .initialize(
            &AppConfig::default(),
            &descriptor,
            &mut HookRegistrar::new(&mut registry, descriptor.id()),
            &PluginLogger::new(descriptor.id()),
        )
        .expect("initialize");

    let entries = registry.lookup(HookType::of::<ComposeSkipped>());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].plugin_id(), "exported");
}
