//! Local storage primitives.

pub mod atomic_file;
pub mod slot;

pub use atomic_file::{write_atomic, write_atomic_private};
pub use slot::{FileSlot, LocalSlot, MemorySlot};
