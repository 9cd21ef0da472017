use serde::{Deserialize, Serialize};

/// Notifications emitted by the selection manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionEvent {
    /// Items were restored from local storage during initialization.
    Restored { count: usize },
    /// An item was appended.
    Added { item_id: String, name: String },
    /// A removal was requested, whether or not the item was present.
    Removed { item_id: String },
    /// The selection was emptied.
    Cleared,
}

impl SelectionEvent {
    /// Short user-facing text for a toast-style notification.
    pub fn message(&self) -> String {
        match self {
            SelectionEvent::Restored { count } if *count == 1 => {
                "1 item restored to your selection".to_string()
            }
            SelectionEvent::Restored { count } => {
                format!("{count} items restored to your selection")
            }
            SelectionEvent::Added { name, .. } => format!("{name} added to your selection"),
            SelectionEvent::Removed { .. } => "Item removed from your selection".to_string(),
            SelectionEvent::Cleared => "Selection cleared".to_string(),
        }
    }
}
