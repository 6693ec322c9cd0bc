//! Procedural macros for entity metadata
//!
//! This crate provides the `Entity` derive and the `#[model]` attribute,
//! which generate the table name, the ordered field list and the primary
//! key of a struct for `store_object::Entity`.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod generation;
mod model_macro;
mod parsing;

use generation::generate_entity_impl;
use model_macro::model_attribute;
use parsing::parse_entity;

/// Derive macro for the `Entity` trait
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Serialize, Deserialize, Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: u64,
///     pub name: String,
///     #[field(skip)]
///     #[serde(skip)]
///     pub session: Option<String>,
/// }
/// ```
///
/// `#[entity(name = "...")]` overrides the entity name the connection handle
/// is bound to. Without `#[primary_key]` the key column is `id`.
#[proc_macro_derive(Entity, attributes(entity, primary_key, field))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let info = match parse_entity(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    TokenStream::from(generate_entity_impl(&input, &info))
}

/// Convenience attribute macro that adds all necessary derives for an entity
///
/// ```ignore
/// use entity_derive::{model, Entity};
///
/// #[model]
/// #[entity(table = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: u64,
///     pub name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
