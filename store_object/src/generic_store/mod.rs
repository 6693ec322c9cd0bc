pub mod core;
pub mod store_object;

pub use self::core::EntityStore;
