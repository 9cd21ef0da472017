//! Visitor selection: the cart-like list of chosen catalog items.

pub mod event;
pub mod manager;
pub mod repository;

pub use event::SelectionEvent;
pub use manager::{SelectionManager, SelectionObserver};
pub use repository::SelectionRepository;
