//! Implementation of the `#[derive(NativeType)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use crate::attrs::TypeAttrs;

pub fn derive_native_type_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_native_type_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_native_type_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;
    let type_name = attrs.name.unwrap_or_else(|| ident.to_string());

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::bindery::NativeType for #ident #ty_generics #where_clause {
            const NAME: &'static str = #type_name;
        }
    })
}
