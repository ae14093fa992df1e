//! Reference plugin for Harvest.
//!
//! Registers a handler on the configuration, context and execution hooks
//! and logs each notification. Two parameters demonstrate failures:
//! `raise_init` makes initialization fail and `raise_hook` registers a
//! `config_loaded` handler that always fails.

pub mod hooks;
pub mod plugin;

pub use plugin::DemoPlugin;

#[cfg(feature = "export")]
harvest_plugin::declare_plugin!(DemoPlugin);
