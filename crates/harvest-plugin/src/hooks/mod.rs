//! Hook system: registry, dispatcher, and typed hook definitions.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{HookPayload, HookType};
pub use dispatcher::HookDispatcher;
pub use registry::{HookEntry, HookRegistrar, HookRegistry};
