//! # harvest-plugin
//!
//! Plugin framework for Harvest. Provides:
//!
//! - Typed hook payloads, one Rust type per pipeline event
//! - Hook registry with registration-ordered handler lists
//! - Hook dispatcher that notifies handlers sequentially and stops at the
//!   first failure
//! - Plugin loading from configuration descriptors through a catalogue of
//!   statically known plugin factories
//! - Optional dynamic loading via `libloading` (`dynamic` feature)

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod logger;
pub mod macros;
pub mod manager;
pub mod prelude;
pub mod traits;

pub use catalog::PluginCatalog;
pub use descriptor::PluginDescriptor;
pub use error::PluginError;
pub use hooks::definitions::{HookPayload, HookType};
pub use hooks::dispatcher::HookDispatcher;
pub use hooks::registry::{HookEntry, HookRegistrar, HookRegistry};
pub use logger::PluginLogger;
pub use manager::PluginManager;
pub use traits::{HookHandler, Plugin};
