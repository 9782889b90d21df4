// Copyright (c) psxc contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Proc macro helpers for psxc-core AST node types.
//!
//! AST nodes are tagged-variant trees (see `psxc_core::ast`): every
//! expression and statement variant carries a `span: Span` field and an
//! `id: NodeId` field, and the containing enum needs a `span()`/`id()`
//! accessor that dispatches to whichever variant is present. Writing that
//! dispatch by hand for every enum is repetitive and easy to leave stale
//! when a variant is added, so `#[derive(Spanned)]` generates it.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Derives `Spanned` for a struct with `span: Span` and `id: NodeId` fields,
/// or for an enum whose every variant wraps a single field that itself
/// implements `Spanned`.
///
/// Struct example:
///
/// ```ignore
/// #[derive(Spanned)]
/// struct Name {
///     span: Span,
///     id: NodeId,
///     value: String,
/// }
/// ```
///
/// Enum example (dispatches to the inner value of whichever variant matched):
///
/// ```ignore
/// #[derive(Spanned)]
/// enum Expr {
///     Name(Name),
///     Literal(Literal),
/// }
/// ```
#[proc_macro_derive(Spanned)]
pub fn derive_spanned(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => {
            let has_span = matches!(&data.fields, Fields::Named(f) if f.named.iter().any(|field| field.ident.as_ref().map(|i| i == "span").unwrap_or(false)));
            let has_id = matches!(&data.fields, Fields::Named(f) if f.named.iter().any(|field| field.ident.as_ref().map(|i| i == "id").unwrap_or(false)));
            if !has_span || !has_id {
                return syn::Error::new_spanned(
                    &input.ident,
                    "Spanned structs must have `span: Span` and `id: NodeId` fields",
                )
                .to_compile_error()
                .into();
            }
            quote! {
                fn span(&self) -> crate::span::Span { self.span }
                fn node_id(&self) -> crate::span::NodeId { self.id }
            }
        }
        Data::Enum(data) => {
            let span_arms = data.variants.iter().map(|variant| {
                let vname = &variant.ident;
                quote! { #name::#vname(inner) => inner.span(), }
            });
            let id_arms = data.variants.iter().map(|variant| {
                let vname = &variant.ident;
                quote! { #name::#vname(inner) => inner.node_id(), }
            });
            quote! {
                fn span(&self) -> crate::span::Span {
                    match self { #(#span_arms)* }
                }
                fn node_id(&self) -> crate::span::NodeId {
                    match self { #(#id_arms)* }
                }
            }
        }
        Data::Union(_) => {
            return syn::Error::new_spanned(&input.ident, "Spanned cannot be derived for unions")
                .to_compile_error()
                .into();
        }
    };

    let expanded = quote! {
        impl #impl_generics crate::span::Spanned for #name #ty_generics #where_clause {
            #body
        }
    };

    expanded.into()
}
