use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Ident, ItemFn, LitStr, spanned::Spanned};

/// Implementation of `#[export_module("entry")]`.
///
/// Leaves the function unchanged and appends a
/// `#[::conduit_plugin::linkme::distributed_slice]` static that adds it to
/// `PLUGIN_MODULES`.
pub fn export_module(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let func: ItemFn = syn::parse2(item)?;
    let sig = &func.sig;

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "#[export_module] expects a plain `fn`; put async work in `on_init`",
        ));
    }
    if !sig.inputs.is_empty() {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "#[export_module] functions take no arguments",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "#[export_module] functions cannot be generic",
        ));
    }

    let fn_name = &sig.ident;
    let entry = if attr.is_empty() {
        LitStr::new(&fn_name.to_string(), fn_name.span())
    } else {
        let entry: LitStr = syn::parse2(attr)?;
        if entry.value().trim().is_empty() {
            return Err(syn::Error::new(
                entry.span(),
                "entry point name must not be empty",
            ));
        }
        entry
    };

    let static_name = Ident::new(
        &format!("_CONDUIT_MODULE_{}", fn_name.to_string().to_uppercase()),
        Span::call_site(),
    );

    Ok(quote! {
        #func

        #[::conduit_plugin::linkme::distributed_slice(::conduit_plugin::PLUGIN_MODULES)]
        #[linkme(crate = ::conduit_plugin::linkme)]
        static #static_name: ::conduit_plugin::ModuleExport = ::conduit_plugin::ModuleExport {
            entry: #entry,
            build: #fn_name,
        };
    })
}
