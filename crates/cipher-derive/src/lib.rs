//! `#[derive(Record)]`: declares which top-level fields of a struct are
//! encrypted by `transit-cipher`.
//!
//! ```ignore
//! #[derive(Record)]
//! struct Person {
//!     #[encrypted]
//!     name: String,
//!     #[encrypted = true]
//!     address: String,
//!     #[encrypted] // not a String: never selected
//!     age: u32,
//!     desc: String,
//! }
//! ```
//!
//! The generated impl lists every named field in declaration order and
//! exposes accessors for the `String` fields only. Enums, unions and tuple
//! structs are rejected at compile time.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{ext::IdentExt, Data, DeriveInput, Fields, PathArguments, Type};

mod attr;

/// Implements `transit_cipher::Record` for a struct with named fields.
///
/// Mark sensitive fields with `#[encrypted]`, `#[encrypted = true]` or
/// `#[encrypted = "true"]`. Only fields declared as `String` are eligible.
#[proc_macro_derive(Record, attributes(encrypted))]
pub fn derive_record(item: TokenStream) -> TokenStream {
    let ast = match syn::parse::<DeriveInput>(item) {
        Ok(ast) => ast,
        Err(e) => return e.to_compile_error().into(),
    };
    match expand(&ast) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(ast: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let named = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "#[derive(Record)] requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "#[derive(Record)] only supports structs",
            ))
        }
    };

    let mut descriptors = Vec::with_capacity(named.len());
    let mut string_names = Vec::new();
    let mut string_idents = Vec::new();

    for field in named {
        let Some(ident) = &field.ident else { continue };
        let name = ident.unraw().to_string();
        let sensitive = attr::sensitive(&field.attrs)?;
        let ty = &field.ty;

        let field_type = if is_string(ty) {
            string_names.push(name.clone());
            string_idents.push(ident);
            quote!(::transit_cipher::FieldType::String)
        } else {
            let declared = quote!(#ty).to_string();
            quote!(::transit_cipher::FieldType::Other(#declared))
        };

        descriptors.push(quote! {
            ::transit_cipher::FieldDescriptor::new(#name, #field_type, #sensitive)
        });
    }

    let record = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::transit_cipher::Record for #record #ty_generics #where_clause {
            const FIELDS: &'static [::transit_cipher::FieldDescriptor] = &[#(#descriptors),*];

            #[allow(clippy::match_single_binding)]
            fn string_field(&self, name: &str) -> ::core::option::Option<&str> {
                match name {
                    #(#string_names => ::core::option::Option::Some(self.#string_idents.as_str()),)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(clippy::match_single_binding)]
            fn string_field_mut(
                &mut self,
                name: &str,
            ) -> ::core::option::Option<&mut ::std::string::String> {
                match name {
                    #(#string_names => ::core::option::Option::Some(&mut self.#string_idents),)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// `true` for `String`, `std::string::String` and friends; never for
/// references, generics or wrappers such as `Option<String>`.
fn is_string(ty: &Type) -> bool {
    match ty {
        Type::Path(p) if p.qself.is_none() => p
            .path
            .segments
            .last()
            .is_some_and(|s| s.ident == "String" && matches!(s.arguments, PathArguments::None)),
        Type::Group(g) => is_string(&g.elem),
        Type::Paren(p) => is_string(&p.elem),
        _ => false,
    }
}
