//! Code generation for the `Entity` implementation

use crate::parsing::EntityInfo;
use quote::quote;
use syn::DeriveInput;

pub fn generate_entity_impl(input: &DeriveInput, info: &EntityInfo) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let table = &info.table;
    let fields = &info.fields;
    let entity_name = info.name.clone().unwrap_or_else(|| name.to_string());

    // Without #[primary_key] the trait default (`id`) applies
    let primary_key = info.primary_key.as_ref().map(|key| {
        quote! {
            fn primary_key() -> &'static str {
                #key
            }
        }
    });

    quote! {
        impl #impl_generics store_object::Entity for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }

            fn fields() -> &'static [&'static str] {
                &[#(#fields),*]
            }

            #primary_key

            fn entity_name() -> &'static str {
                #entity_name
            }
        }
    }
}
