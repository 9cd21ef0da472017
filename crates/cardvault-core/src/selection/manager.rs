//! In-memory selection state with write-through persistence.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::event::SelectionEvent;
use super::repository::SelectionRepository;
use crate::catalog::CatalogItem;

/// Callback invoked for every selection notification.
pub type SelectionObserver = Arc<dyn Fn(&SelectionEvent) + Send + Sync>;

/// The visitor's list of chosen catalog items.
///
/// Items are denormalized snapshots kept in insertion order with unique ids.
/// Mutations are written through the repository only after [`initialize`]
/// has run, so the first render cannot overwrite stored state with an empty
/// list.
///
/// All mutation goes through `&mut self`; the manager is meant to be owned by
/// a single UI event loop.
///
/// [`initialize`]: SelectionManager::initialize
pub struct SelectionManager {
    items: Vec<CatalogItem>,
    repository: Box<dyn SelectionRepository>,
    observers: Vec<SelectionObserver>,
    initialized: bool,
}

impl SelectionManager {
    /// Creates an empty, not yet hydrated manager.
    pub fn new(repository: Box<dyn SelectionRepository>) -> Self {
        Self {
            items: Vec::new(),
            repository,
            observers: Vec::new(),
            initialized: false,
        }
    }

    /// Registers a notification observer.
    pub fn subscribe(&mut self, observer: SelectionObserver) {
        self.observers.push(observer);
    }

    /// Hydrates the selection from storage. Runs once; later calls are no-ops.
    ///
    /// Stored items come first; anything added before hydration is appended
    /// unless already stored. Returns `true` when this call performed the
    /// hydration.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;

        let stored = match self.repository.load() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load stored selection, starting empty");
                Vec::new()
            }
        };
        let restored = stored.len();

        let pending = std::mem::replace(&mut self.items, stored);
        let mut merged_pending = false;
        for item in pending {
            if !self.contains(&item.id) {
                self.items.push(item);
                merged_pending = true;
            }
        }
        if merged_pending {
            self.persist();
        }

        tracing::debug!(restored, total = self.items.len(), "Selection initialized");
        if restored > 0 {
            self.notify(SelectionEvent::Restored { count: restored });
        }
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Appends an item unless one with the same id is already selected.
    ///
    /// Returns `true` when the item was added.
    pub fn add(&mut self, item: CatalogItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }

        let event = SelectionEvent::Added {
            item_id: item.id.clone(),
            name: item.name.clone(),
        };
        self.items.push(item);
        self.persist();
        self.notify(event);
        true
    }

    /// Removes the item with `id`, if present.
    ///
    /// A removal notification is emitted even when nothing was removed.
    /// Returns `true` when an item was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;

        if removed {
            self.persist();
        }
        self.notify(SelectionEvent::Removed {
            item_id: id.to_string(),
        });
        removed
    }

    /// Empties the selection.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
        self.notify(SelectionEvent::Cleared);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Sum of member prices, unrounded.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|item| item.price).sum()
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist(&self) {
        if !self.initialized {
            tracing::trace!("Selection not hydrated yet, skipping write");
            return;
        }
        if let Err(e) = self.repository.save(&self.items) {
            tracing::warn!(error = %e, count = self.items.len(), "Failed to persist selection");
        }
    }

    fn notify(&self, event: SelectionEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, Condition, ItemKind, ItemStatus, Language};
    use crate::error::{CardvaultError, Result};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    // Mock SelectionRepository recording every save
    #[derive(Clone, Default)]
    struct MockSelectionRepository {
        stored: Arc<Mutex<Vec<CatalogItem>>>,
        saves: Arc<Mutex<usize>>,
        fail_saves: bool,
    }

    impl SelectionRepository for MockSelectionRepository {
        fn load(&self) -> Result<Vec<CatalogItem>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        fn save(&self, items: &[CatalogItem]) -> Result<()> {
            if self.fail_saves {
                return Err(CardvaultError::io("quota exceeded"));
            }
            *self.saves.lock().unwrap() += 1;
            *self.stored.lock().unwrap() = items.to_vec();
            Ok(())
        }
    }

    fn item(id: &str, price: Decimal) -> CatalogItem {
        let now = Utc::now();
        CatalogItem {
            id: id.to_string(),
            name: format!("Card {id}"),
            category: Category::Pokemon,
            kind: ItemKind::Raw,
            set_name: "Base Set".to_string(),
            code: "4/102".to_string(),
            language: Language::En,
            condition: Condition::NearMint,
            price,
            images: Vec::new(),
            status: ItemStatus::Available,
            description: None,
            featured: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn recording_manager(
        repo: &MockSelectionRepository,
    ) -> (SelectionManager, Arc<Mutex<Vec<SelectionEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut manager = SelectionManager::new(Box::new(repo.clone()));
        let sink = events.clone();
        manager.subscribe(Arc::new(move |event: &SelectionEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        (manager, events)
    }

    #[test]
    fn test_initialize_restores_and_notifies_once() {
        let repo = MockSelectionRepository::default();
        *repo.stored.lock().unwrap() = vec![item("a", dec!(10)), item("b", dec!(5))];
        let (mut manager, events) = recording_manager(&repo);

        assert!(manager.initialize());
        assert!(!manager.initialize());

        assert_eq!(manager.len(), 2);
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[SelectionEvent::Restored { count: 2 }]
        );
        assert_eq!(*repo.saves.lock().unwrap(), 0);
    }

    #[test]
    fn test_mutations_before_initialize_do_not_write() {
        let repo = MockSelectionRepository::default();
        *repo.stored.lock().unwrap() = vec![item("stored", dec!(1))];
        let (mut manager, _) = recording_manager(&repo);

        manager.add(item("early", dec!(2)));
        manager.clear();
        assert_eq!(*repo.saves.lock().unwrap(), 0);
        assert_eq!(repo.stored.lock().unwrap().len(), 1);

        manager.initialize();
        manager.add(item("late", dec!(3)));
        assert_eq!(*repo.saves.lock().unwrap(), 1);
        assert_eq!(repo.stored.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_items_added_before_initialize_are_merged_after_stored() {
        let repo = MockSelectionRepository::default();
        *repo.stored.lock().unwrap() = vec![item("stored", dec!(1))];
        let (mut manager, _) = recording_manager(&repo);

        manager.add(item("early", dec!(2)));
        manager.add(item("stored", dec!(1)));
        manager.initialize();

        let ids: Vec<&str> = manager.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["stored", "early"]);
        assert_eq!(repo.stored.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_add_is_idempotent_and_preserves_order() {
        let repo = MockSelectionRepository::default();
        let (mut manager, events) = recording_manager(&repo);
        manager.initialize();

        assert!(manager.add(item("a", dec!(1))));
        assert!(manager.add(item("b", dec!(1))));
        assert!(!manager.add(item("a", dec!(99))));

        let ids: Vec<&str> = manager.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(manager.items()[0].price, dec!(1));
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_always_notifies() {
        let repo = MockSelectionRepository::default();
        let (mut manager, events) = recording_manager(&repo);
        manager.initialize();
        manager.add(item("a", dec!(1)));

        assert!(!manager.remove("missing"));
        assert!(manager.remove("a"));
        assert!(manager.is_empty());

        let removals = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, SelectionEvent::Removed { .. }))
            .count();
        assert_eq!(removals, 2);
    }

    #[test]
    fn test_total_is_unrounded_sum() {
        let repo = MockSelectionRepository::default();
        let (mut manager, _) = recording_manager(&repo);
        manager.initialize();
        manager.add(item("a", dec!(10.005)));
        manager.add(item("b", dec!(0.001)));

        assert_eq!(manager.total(), dec!(10.006));
        assert!(manager.contains("b"));
    }

    #[test]
    fn test_save_failure_keeps_state() {
        let repo = MockSelectionRepository {
            fail_saves: true,
            ..Default::default()
        };
        let (mut manager, _) = recording_manager(&repo);
        manager.initialize();

        assert!(manager.add(item("a", dec!(1))));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_clear_persists_empty_list() {
        let repo = MockSelectionRepository::default();
        let (mut manager, events) = recording_manager(&repo);
        manager.initialize();
        manager.add(item("a", dec!(1)));
        manager.clear();

        assert!(repo.stored.lock().unwrap().is_empty());
        assert_eq!(events.lock().unwrap().last(), Some(&SelectionEvent::Cleared));
    }
}
