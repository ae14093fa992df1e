//! Prelude for convenient imports.

pub use harvest_core::config::AppConfig;

pub use crate::descriptor::PluginDescriptor;
pub use crate::hooks::definitions::{
    ComposeAllComplete, ComposeSkipped, ComposeSuccess, ConfigLoaded, Context, ContextBuilt,
    ExecutionAllComplete, ExecutionFailed, ExecutionStarting, ExecutionSuccess, HookPayload,
    PostAnalytics, PreAnalytics, RunUnit, UnitInputs, UnitSkipped, UnitSuccess,
};
pub use crate::hooks::registry::HookRegistrar;
pub use crate::logger::PluginLogger;
pub use crate::traits::{HookHandler, Plugin};

pub use crate::{declare_plugin, impl_hook_payload};
