use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Error};

/// Adds the derives an entity needs and keeps the struct otherwise unchanged
pub fn model_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    if !matches!(input.data, Data::Struct(_)) {
        return Error::new_spanned(&input.ident, "model can only be used on structs")
            .to_compile_error()
            .into();
    }

    let expanded = quote! {
        #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, Entity)]
        #input
    };

    TokenStream::from(expanded)
}
