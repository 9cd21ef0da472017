//! Application layer for Cardvault.
//!
//! Use cases here coordinate the catalog repository and the auth provider to
//! implement the admin workflows.

pub mod admin_catalog_usecase;
pub mod auth_retry;

pub use admin_catalog_usecase::AdminCatalogUseCase;
pub use auth_retry::AuthRetry;
