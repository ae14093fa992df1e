//! Convenience macros for plugin development.

/// Implements [`HookPayload`](crate::hooks::definitions::HookPayload) for a type.
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug)]
/// pub struct YieldReport { pub total: f64 }
///
/// impl_hook_payload!(YieldReport, "yield_report");
/// ```
#[macro_export]
macro_rules! impl_hook_payload {
    ($payload:ty, $name:expr) => {
        impl $crate::hooks::definitions::HookPayload for $payload {
            const NAME: &'static str = $name;
        }
    };
}

/// Exports the entry point the dynamic loader looks up in a plugin library.
///
/// The plugin type must implement [`Plugin`](crate::traits::Plugin). Without a
/// constructor argument `Default::default` is used. Only one plugin per
/// library may be declared.
///
/// # Example
/// ```rust,ignore
/// declare_plugin!(YieldReportPlugin);
/// declare_plugin!(YieldReportPlugin, YieldReportPlugin::new);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($plugin:ty) => {
        $crate::declare_plugin!($plugin, <$plugin as ::std::default::Default>::default);
    };
    ($plugin:ty, $constructor:expr) => {
        #[unsafe(no_mangle)]
        pub extern "Rust" fn harvest_plugin_create() -> ::std::boxed::Box<dyn $crate::traits::Plugin>
        {
            let plugin: $plugin = $constructor();
            ::std::boxed::Box::new(plugin)
        }
    };
}
