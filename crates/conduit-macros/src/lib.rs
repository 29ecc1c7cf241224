//! Procedural macros for Conduit.
//!
//! - `#[export_module("entry")]` registers a plugin module constructor in the
//!   link-time module registry of `conduit-plugin`.

mod export;

use proc_macro::TokenStream;

/// Exports a plugin module under an entry point name.
///
/// The decorated function must be a plain, argument-less `fn` returning
/// `conduit_plugin::PluginModule`. The entry name defaults to the function
/// name.
///
/// ```rust,ignore
/// use conduit_plugin::{PluginContext, PluginModule};
///
/// #[export_module("greeter")]
/// fn greeter() -> PluginModule {
///     PluginModule::new().on_init(|ctx: PluginContext| async move {
///         ctx.listen_for_requests("greeter")
///             .on("hello", |_req| async { Ok(serde_json::json!("hello")) });
///         Ok(())
///     })
/// }
/// ```
///
/// A manifest with `"entry": "greeter"` (or `"name": "greeter"` and no
/// `entry`) then resolves to this module.
#[proc_macro_attribute]
pub fn export_module(attr: TokenStream, item: TokenStream) -> TokenStream {
    match export::export_module(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
