//! Command implementations and the shared wiring they use.

pub mod admin;
pub mod catalog;
pub mod selection;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cardvault_application::{AdminCatalogUseCase, AuthRetry};
use cardvault_core::auth::AuthProvider;
use cardvault_core::catalog::{CatalogItem, format_price};
use cardvault_core::selection::{SelectionEvent, SelectionManager, SelectionObserver};
use cardvault_infrastructure::storage::FileSlot;
use cardvault_infrastructure::{
    ApiCredentials, CardvaultPaths, GoTrueAuthProvider, HttpPostgrestTransport,
    PostgrestCatalogRepository, SlotSelectionRepository, StorefrontConfig,
};
use tracing_subscriber::{EnvFilter, fmt};

pub type HttpCatalogRepository = PostgrestCatalogRepository<HttpPostgrestTransport>;

/// Initializes the tracing subscriber; `RUST_LOG` wins over the config level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Paths and configuration shared by every command.
pub struct AppContext {
    pub paths: CardvaultPaths,
    pub config: StorefrontConfig,
}

impl AppContext {
    pub fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let paths = match config_dir {
            Some(dir) => CardvaultPaths::from_base(dir),
            None => CardvaultPaths::new()?,
        };
        let config = StorefrontConfig::load(&paths.config_file())
            .with_context(|| format!("Failed to load {}", paths.config_file().display()))?;
        Ok(Self { paths, config })
    }

    fn remote_config(&self) -> Result<&StorefrontConfig> {
        self.config.validate()?;
        Ok(&self.config)
    }

    pub fn auth_provider(&self) -> Result<Arc<GoTrueAuthProvider>> {
        let config = self.remote_config()?;
        Ok(Arc::new(GoTrueAuthProvider::new(
            config.base_url(),
            config.anon_key.clone(),
            Some(self.paths.session_file()),
        )))
    }

    /// Repository sending the anonymous key only.
    pub fn public_catalog(&self) -> Result<HttpCatalogRepository> {
        let config = self.remote_config()?;
        let credentials = ApiCredentials::anonymous(config.anon_key.clone());
        Ok(PostgrestCatalogRepository::new(HttpPostgrestTransport::new(
            config.base_url(),
            credentials,
        )))
    }

    /// Admin use case acting with the stored session.
    pub fn admin_usecase(&self) -> Result<AdminCatalogUseCase> {
        let config = self.remote_config()?;
        let auth: Arc<dyn AuthProvider> = self.auth_provider()?;
        let credentials = ApiCredentials::with_auth(config.anon_key.clone(), auth.clone());
        let repository =
            PostgrestCatalogRepository::new(HttpPostgrestTransport::new(config.base_url(), credentials));
        Ok(AdminCatalogUseCase::new(Arc::new(repository), self.auth_retry(auth)))
    }

    pub fn auth_retry(&self, auth: Arc<dyn AuthProvider>) -> AuthRetry {
        AuthRetry::new(auth).with_grace(self.config.auth_grace())
    }

    /// A hydrated selection manager printing every notification, restores included.
    pub fn selection_manager(&self) -> SelectionManager {
        self.selection_manager_with(Arc::new(|event: &SelectionEvent| {
            println!("{}", event.message());
        }))
    }

    fn selection_manager_with(&self, observer: SelectionObserver) -> SelectionManager {
        let slot = FileSlot::new(self.paths.selection_file());
        let mut manager = SelectionManager::new(Box::new(SlotSelectionRepository::new(slot)));
        manager.subscribe(observer);
        manager.initialize();
        manager
    }
}

/// One-line summary of an entry.
pub fn summary_line(item: &CatalogItem) -> String {
    let featured = if item.is_featured() { " *" } else { "" };
    format!(
        "{:<38} {:<32} {:<8} {:<7} {:<3} {:>10} {}{}",
        item.id,
        truncate(&item.name, 32),
        item.category,
        item.kind,
        item.condition,
        format_price(item.price),
        item.status,
        featured
    )
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
