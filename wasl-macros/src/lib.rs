//! Procedural macros for Wasl.
//!
//! `#[derive(Injectable)]` turns a struct's `Arc<T>` fields into its
//! constructor signature.

use darling::ast::{Data, Style};
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{DeriveInput, GenericArgument, Ident, PathArguments, Type, parse_macro_input};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: Ident,
    generics: syn::Generics,
    data: Data<(), InjectField>,

    /// Release through the type's `Dispose` impl.
    #[darling(default)]
    dispose: bool,

    /// Release through the type's `AsyncDispose` impl.
    #[darling(default)]
    async_dispose: bool,

    /// Path to the wasl facade crate.
    #[darling(default, rename = "crate")]
    krate: Option<syn::Path>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectField {
    ident: Option<Ident>,
    ty: Type,

    /// Fill with `Default::default()` instead of resolving.
    #[darling(default)]
    default: bool,
}

/// Derives `Injectable` for a struct.
///
/// Every `Arc<T>` field is a dependency on contract `T`, resolved in
/// field order. Fields marked `#[inject(default)]` are filled with
/// `Default::default()`.
///
/// ```rust,ignore
/// #[derive(Injectable)]
/// #[injectable(dispose)]
/// struct Session {
///     store: Arc<dyn Store>,
///     clock: Arc<Clock>,
///     #[inject(default)]
///     hits: AtomicUsize,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let parsed = match InjectableInput::from_derive_input(&input) {
        Ok(parsed) => parsed,
        Err(err) => return err.write_errors().into(),
    };

    match expand(parsed) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: InjectableInput) -> syn::Result<TokenStream2> {
    let krate = input
        .krate
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::wasl));
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    if input.dispose && input.async_dispose {
        return Err(syn::Error::new(
            ident.span(),
            "choose one of `dispose` or `async_dispose`",
        ));
    }

    let Data::Struct(fields) = &input.data else {
        return Err(syn::Error::new(ident.span(), "Injectable can only be derived for structs"));
    };

    let mut dependencies = Vec::new();
    let mut initializers = Vec::new();

    for field in fields.iter() {
        let name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(field.ty.span(), "expected a named field"))?;

        if field.default {
            initializers.push(quote! { #name: ::core::default::Default::default() });
            continue;
        }

        let contract = arc_inner(&field.ty).ok_or_else(|| {
            syn::Error::new(
                field.ty.span(),
                "injected fields must be `Arc<T>`; mark other fields with #[inject(default)]",
            )
        })?;

        dependencies.push(quote_spanned! { field.ty.span() =>
            #krate::DependencyKey::of::<#contract>()
        });
        initializers.push(quote! { #name: ctx.arg::<#contract>()? });
    }

    let body = match fields.style {
        Style::Unit => quote! { Self },
        _ => quote! { Self { #(#initializers,)* } },
    };

    let releaser = if input.dispose {
        quote! {
            fn releaser(this: &::std::sync::Arc<Self>) -> ::core::option::Option<#krate::Releaser> {
                ::core::option::Option::Some(#krate::Releaser::sync(::std::sync::Arc::clone(this)))
            }
        }
    } else if input.async_dispose {
        quote! {
            fn releaser(this: &::std::sync::Arc<Self>) -> ::core::option::Option<#krate::Releaser> {
                ::core::option::Option::Some(#krate::Releaser::asynchronous(::std::sync::Arc::clone(this)))
            }
        }
    } else {
        TokenStream2::new()
    };

    let ctx = if fields.style == Style::Unit || dependencies.is_empty() {
        quote! { _ctx }
    } else {
        quote! { ctx }
    };

    Ok(quote! {
        impl #impl_generics #krate::Injectable for #ident #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<#krate::DependencyKey> {
                ::std::vec![#(#dependencies),*]
            }

            fn construct(#ctx: &mut #krate::BuildContext<'_>) -> #krate::Result<Self> {
                ::core::result::Result::Ok(#body)
            }

            #releaser
        }
    })
}

/// Returns `T` for a field typed `Arc<T>` (any path ending in `Arc`).
fn arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let last = path.path.segments.last()?;
    if last.ident != "Arc" {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }

    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_inner_plain() {
        let ty: Type = syn::parse_quote!(Arc<Clock>);
        let inner = arc_inner(&ty).unwrap();
        assert_eq!(quote!(#inner).to_string(), "Clock");
    }

    #[test]
    fn arc_inner_qualified_dyn() {
        let ty: Type = syn::parse_quote!(std::sync::Arc<dyn Store + Send>);
        let inner = arc_inner(&ty).unwrap();
        assert_eq!(quote!(#inner).to_string(), "dyn Store + Send");
    }

    #[test]
    fn non_arc_rejected() {
        let ty: Type = syn::parse_quote!(Box<Clock>);
        assert!(arc_inner(&ty).is_none());
        let ty: Type = syn::parse_quote!(u32);
        assert!(arc_inner(&ty).is_none());
    }

    #[test]
    fn expands_named_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct Checkout {
                cart: Arc<Cart>,
                #[inject(default)]
                hits: u32,
            }
        };
        let parsed = InjectableInput::from_derive_input(&input).unwrap();
        let tokens = expand(parsed).unwrap().to_string();
        assert!(tokens.contains("DependencyKey :: of :: < Cart >"));
        assert!(tokens.contains("Default :: default ()"));
        assert!(!tokens.contains("releaser"));
    }

    #[test]
    fn custom_crate_path_and_dispose() {
        let input: DeriveInput = syn::parse_quote! {
            #[injectable(dispose, crate = "::wasl_container")]
            struct Sink;
        };
        let parsed = InjectableInput::from_derive_input(&input).unwrap();
        let tokens = expand(parsed).unwrap().to_string();
        assert!(tokens.contains(":: wasl_container :: Injectable"));
        assert!(tokens.contains("Releaser :: sync"));
    }

    #[test]
    fn both_dispose_flavors_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            #[injectable(dispose, async_dispose)]
            struct Sink;
        };
        let parsed = InjectableInput::from_derive_input(&input).unwrap();
        assert!(expand(parsed).is_err());
    }
}
