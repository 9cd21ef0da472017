//! Unified path management for cardvault files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/cardvault/         # Config directory (platform default via `dirs`)
//! ├── config.toml              # Storefront configuration
//! ├── session.json             # Admin auth session
//! └── selection.json           # Visitor selection slot
//! ```

use std::path::{Path, PathBuf};

use cardvault_core::error::{CardvaultError, Result};

const APP_DIR: &str = "cardvault";

/// Resolves the files cardvault reads and writes.
///
/// `CardvaultPaths::from_base` pins every path under an explicit directory,
/// which tests and the `--config-dir` flag use instead of the platform default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardvaultPaths {
    config_dir: PathBuf,
}

impl CardvaultPaths {
    /// Uses the platform configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(CardvaultPaths)`: Rooted at e.g. `~/.config/cardvault/`
    /// - `Err(CardvaultError::Config)`: The home directory could not be determined
    pub fn new() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| CardvaultError::config("Cannot find configuration directory"))?;
        Ok(Self::from_base(base.join(APP_DIR)))
    }

    pub fn from_base(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Holds refresh tokens; written with owner-only permissions on Unix.
    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join("session.json")
    }

    pub fn selection_file(&self) -> PathBuf {
        self.config_dir.join("selection.json")
    }
}
