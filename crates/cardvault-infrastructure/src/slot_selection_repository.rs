//! Slot-backed implementation of SelectionRepository.

use cardvault_core::catalog::CatalogItem;
use cardvault_core::error::{CardvaultError, Result};
use cardvault_core::selection::SelectionRepository;
use chrono::Utc;

use crate::dto::{self, Decoded};
use crate::storage::LocalSlot;

/// A selection repository storing the versioned envelope in one slot.
///
/// Reading migrates legacy data in place and discards corrupt data, so a
/// successful `load` leaves the slot either empty or in the current format.
#[derive(Debug, Clone)]
pub struct SlotSelectionRepository<S: LocalSlot> {
    slot: S,
}

impl<S: LocalSlot> SlotSelectionRepository<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }
}

impl<S: LocalSlot> SelectionRepository for SlotSelectionRepository<S> {
    fn load(&self) -> Result<Vec<CatalogItem>> {
        let now = Utc::now();
        let decoded = match self.slot.read() {
            Ok(raw) => dto::decode(raw.as_deref(), now),
            Err(e @ CardvaultError::Serialization { .. }) => Decoded::Corrupt {
                reason: e.to_string(),
            },
            Err(e) => return Err(e),
        };

        match decoded {
            Decoded::Current(items) => Ok(items),
            Decoded::Legacy(items) => {
                tracing::info!(count = items.len(), "Migrating legacy selection format");
                let migrated = dto::encode(&items, now).and_then(|raw| self.slot.write(&raw));
                if let Err(e) = migrated {
                    tracing::warn!(error = %e, "Failed to rewrite migrated selection");
                }
                Ok(items)
            }
            Decoded::Corrupt { reason } => {
                tracing::warn!(%reason, "Discarding unreadable stored selection");
                if let Err(e) = self.slot.clear() {
                    tracing::warn!(error = %e, "Failed to clear unreadable selection");
                }
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, items: &[CatalogItem]) -> Result<()> {
        let raw = dto::encode(items, Utc::now())?;
        self.slot.write(&raw)
    }
}
