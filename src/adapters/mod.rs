// Adapters layer: concrete CatalogStore implementations.

pub mod http;
pub mod memory;

pub use http::HttpCatalogStore;
pub use memory::InMemoryCatalogStore;
