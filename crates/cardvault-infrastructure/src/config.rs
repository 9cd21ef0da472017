//! Storefront configuration loaded from `config.toml`.

use std::fs;
use std::path::Path;

use cardvault_core::auth::DEFAULT_REFRESH_GRACE_SECS;
use cardvault_core::catalog::DEFAULT_PAGE_SIZE;
use cardvault_core::error::{CardvaultError, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `api_url`.
pub const ENV_API_URL: &str = "CARDVAULT_API_URL";
/// Environment variable overriding `anon_key`.
pub const ENV_ANON_KEY: &str = "CARDVAULT_ANON_KEY";

/// Connection and behavior settings for the hosted backend.
///
/// Every key is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Base URL of the hosted project, e.g. `https://xyz.example.co`.
    pub api_url: String,
    /// Public anonymous key sent as `apikey` on every request.
    pub anon_key: String,
    pub page_size: usize,
    /// Seconds past expiry after which a session can no longer be refreshed.
    pub auth_grace_secs: i64,
    pub storage_bucket: String,
    pub max_upload_bytes: u64,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            anon_key: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            auth_grace_secs: DEFAULT_REFRESH_GRACE_SECS,
            storage_bucket: "product-images".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Loads the file at `path`, falling back to defaults when it does not exist,
    /// then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                CardvaultError::io(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(api_url) = value(ENV_API_URL) {
            self.api_url = api_url;
        }
        if let Some(anon_key) = value(ENV_ANON_KEY) {
            self.anon_key = anon_key;
        }
    }

    /// Checks the settings needed to reach the remote store.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(CardvaultError::config(format!(
                "api_url is not set (config file or {ENV_API_URL})"
            )));
        }
        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            return Err(CardvaultError::config(format!(
                "api_url must be an http(s) URL: '{}'",
                self.api_url
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(CardvaultError::config(format!(
                "anon_key is not set (config file or {ENV_ANON_KEY})"
            )));
        }
        if self.auth_grace_secs < 0 {
            return Err(CardvaultError::config("auth_grace_secs cannot be negative"));
        }
        Ok(())
    }

    /// `api_url` without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn auth_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.auth_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = StorefrontConfig::from_toml(
            r#"
            api_url = "https://shop.example.co/"
            page_size = 24
            "#,
        )
        .unwrap();

        assert_eq!(config.page_size, 24);
        assert_eq!(config.auth_grace_secs, 300);
        assert_eq!(config.base_url(), "https://shop.example.co");
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorefrontConfig::load(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = StorefrontConfig {
            anon_key: "from-file".to_string(),
            ..Default::default()
        };
        config.apply_overrides(|key| match key {
            ENV_API_URL => Some("https://env.example.co".to_string()),
            ENV_ANON_KEY => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.api_url, "https://env.example.co");
        assert_eq!(config.anon_key, "from-file");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_connection_settings() {
        assert!(StorefrontConfig::default().validate().is_err());
    }
}
