//! Selection repository trait.

use crate::catalog::CatalogItem;
use crate::error::Result;

/// Durable local storage for the selection.
///
/// Implementations own the on-disk format, including migration of older
/// formats and recovery from corrupt data. Calls are synchronous and local.
pub trait SelectionRepository: Send {
    /// Loads the stored items, or an empty list when nothing usable is stored.
    fn load(&self) -> Result<Vec<CatalogItem>>;

    /// Replaces the stored items.
    fn save(&self, items: &[CatalogItem]) -> Result<()>;
}
