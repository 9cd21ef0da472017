//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs describe the on-disk shape of locally stored data and handle its
//! evolution over time. They are private to the infrastructure layer.
//!
//! ### Selection Version History
//! - **legacy**: Bare array of item snapshots
//! - **1**: Versioned envelope with `lastUpdated`

mod selection;

pub use selection::{
    Decoded, SELECTION_FORMAT_VERSION, SELECTION_STORAGE_KEY, SelectionEnvelope,
    SelectionEnvelopeV1, decode, encode,
};
