pub mod config;
pub mod dto;
pub mod gotrue_auth_provider;
pub mod http;
pub mod image_uploader;
pub mod paths;
pub mod postgrest;
pub mod slot_selection_repository;
pub mod storage;

pub use crate::config::StorefrontConfig;
pub use crate::gotrue_auth_provider::GoTrueAuthProvider;
pub use crate::http::ApiCredentials;
pub use crate::image_uploader::{ImageUploader, UploadedImage};
pub use crate::paths::CardvaultPaths;
pub use crate::postgrest::{HttpPostgrestTransport, PostgrestCatalogRepository};
pub use crate::slot_selection_repository::SlotSelectionRepository;
