extern crate proc_macro;

use heck::ToKebabCase;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, ItemFn, LitStr};

/// Registers a function as a design_kit generation target.
///
/// ```ignore
/// /// Markdown summary of every service.
/// #[design_kit::target("docs")]
/// fn docs(design: &ValidatedDesign) -> design_kit::Result<Vec<File>> {
///     // ...
/// }
/// ```
///
/// Without an argument the target is named after the function, kebab-cased.
/// The first doc-comment line becomes the target description. Targets
/// registered this way are picked up by `TargetRegistry::discover()`.
#[proc_macro_attribute]
pub fn target(args: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemFn);
    let name = if args.is_empty() {
        item.sig.ident.to_string().to_kebab_case()
    } else {
        parse_macro_input!(args as LitStr).value()
    };

    if let Some(asyncness) = &item.sig.asyncness {
        return syn::Error::new_spanned(asyncness, "a target must be a plain function")
            .to_compile_error()
            .into();
    }
    if !item.sig.generics.params.is_empty() {
        return syn::Error::new_spanned(&item.sig.generics, "a target cannot be generic")
            .to_compile_error()
            .into();
    }

    let fn_name = &item.sig.ident;
    let summary = parse_doc_summary(&item.attrs);

    let expanded = quote! {
        #item

        ::design_kit::inventory::submit! {
            ::design_kit::codegen::TargetRegistration::new(#name, #summary, #fn_name)
        }
    };
    TokenStream::from(expanded)
}

/// First non-empty line of the doc comments.
fn parse_doc_summary(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|attr| {
            if attr.path().is_ident("doc") {
                if let syn::Meta::NameValue(nv) = &attr.meta {
                    if let syn::Expr::Lit(expr_lit) = &nv.value {
                        if let syn::Lit::Str(lit) = &expr_lit.lit {
                            return Some(lit.value().trim().to_string());
                        }
                    }
                }
            }
            None
        })
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}
