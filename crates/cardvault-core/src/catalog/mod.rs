//! Catalog domain: entries, requests, pagination, and the repository seam.

pub mod model;
pub mod page;
pub mod repository;
pub mod request;
pub mod slug;

pub use model::{
    CatalogItem, Category, Condition, ItemKind, ItemStatus, Language, cents_to_price,
    format_price, price_to_cents,
};
pub use page::{CatalogFilter, DEFAULT_PAGE_SIZE, Page, PageRequest};
pub use repository::{CatalogChanges, CatalogRepository, LookupId, NewCatalogRecord};
pub use request::{
    CreateCatalogItemRequest, MAX_IMAGES, Patch, UpdateCatalogItemRequest, validate_image_refs,
};
pub use slug::{generate_slug, slugify};
