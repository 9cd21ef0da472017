//! Domain layer for Cardvault.
//!
//! Holds the catalog model, the selection manager, the error taxonomy, and the
//! traits implemented by the infrastructure crate.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod selection;

// Re-export common error type
pub use error::{CardvaultError, Result};
