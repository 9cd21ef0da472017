//! Remote catalog access over PostgREST.

pub mod catalog_repository;
pub mod query;
pub mod rows;
pub mod transport;

pub use catalog_repository::PostgrestCatalogRepository;
pub use query::{Direction, Filter, SelectQuery};
pub use rows::{category_from_slug, category_slug, kind_from_slug};
pub use transport::{HttpPostgrestTransport, PostgrestTransport, Rows};
