//! Catalog repository trait.
//!
//! Defines the remote catalog operations the admin workflow and the storefront
//! pages are built from.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::model::{CatalogItem, Category, Condition, ItemKind, ItemStatus, Language};
use super::page::{CatalogFilter, Page, PageRequest};
use super::request::Patch;
use crate::error::Result;

/// Primary key of a lookup table row (categories, product types).
pub type LookupId = i64;

/// A fully resolved row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogRecord {
    pub name: String,
    pub slug: String,
    pub category_id: LookupId,
    pub kind_id: LookupId,
    pub set_name: String,
    pub code: String,
    pub language: Language,
    pub condition: Condition,
    pub price: Decimal,
    pub status: ItemStatus,
    pub description: Option<String>,
}

/// Sparse changes to the entry row. Lookups are already resolved to keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogChanges {
    pub name: Patch<String>,
    pub category_id: Patch<LookupId>,
    pub kind_id: Patch<LookupId>,
    pub set_name: Patch<String>,
    pub code: Patch<String>,
    pub language: Patch<Language>,
    pub condition: Patch<Condition>,
    pub price: Patch<Decimal>,
    pub status: Patch<ItemStatus>,
    pub description: Patch<String>,
}

impl CatalogChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_keep()
            && self.category_id.is_keep()
            && self.kind_id.is_keep()
            && self.set_name.is_keep()
            && self.code.is_keep()
            && self.language.is_keep()
            && self.condition.is_keep()
            && self.price.is_keep()
            && self.status.is_keep()
            && self.description.is_keep()
    }
}

/// An abstract repository for the remote catalog.
///
/// Implementations translate between the domain model and the store's wire
/// schema. Listing methods must batch dependent lookups (images, featured
/// membership) per page instead of issuing one request per entry.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Lists one page of entries, newest first.
    async fn list(&self, page: PageRequest, filter: &CatalogFilter) -> Result<Page<CatalogItem>>;

    /// Lists featured entries, most recently featured first.
    async fn list_featured(&self, limit: usize) -> Result<Vec<CatalogItem>>;

    /// Finds an entry with its images and featured flag.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(CatalogItem))`: Entry found
    /// - `Ok(None)`: Entry not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, id: &str) -> Result<Option<CatalogItem>>;

    async fn resolve_category_id(&self, category: Category) -> Result<LookupId>;

    async fn resolve_kind_id(&self, kind: ItemKind) -> Result<LookupId>;

    /// Inserts the entry row and returns the id assigned by the store.
    async fn insert_item(&self, record: &NewCatalogRecord) -> Result<String>;

    /// Applies only the provided fields and bumps the update timestamp.
    ///
    /// Returns `NotFound` when no entry with `id` is visible.
    async fn update_item(&self, id: &str, changes: &CatalogChanges) -> Result<()>;

    /// Bumps the update timestamp without touching any other column.
    ///
    /// Returns `NotFound` when no entry with `id` is visible.
    async fn touch_item(&self, id: &str) -> Result<()>;

    /// Deletes the entry row.
    async fn delete_item(&self, id: &str) -> Result<()>;

    /// Inserts image rows in list order.
    async fn insert_images(&self, id: &str, images: &[String]) -> Result<()>;

    /// Deletes every image row of the entry.
    async fn delete_images(&self, id: &str) -> Result<()>;

    /// Adds or removes the featured membership row.
    async fn set_featured(&self, id: &str, featured: bool) -> Result<()>;
}
