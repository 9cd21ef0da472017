//! Admin catalog use case.
//!
//! Creates, updates, and deletes catalog entries together with their image
//! rows and featured membership. The remote store offers no multi-table
//! transaction, so each workflow is a best-effort sequence of steps with a
//! fixed policy for every dependent step that fails.

use std::sync::Arc;

use cardvault_core::catalog::{
    CatalogChanges, CatalogItem, CatalogRepository, CreateCatalogItemRequest, ItemStatus,
    NewCatalogRecord, Patch, UpdateCatalogItemRequest, generate_slug,
};
use cardvault_core::error::{CardvaultError, Result};
use chrono::Utc;

use crate::auth_retry::AuthRetry;

/// Use case for administering catalog entries.
///
/// Every remote call goes through [`AuthRetry`], and every workflow ends by
/// re-fetching the entry so the returned value reflects what the store holds.
///
/// # Failure policies
///
/// | Step | Policy |
/// |---|---|
/// | validation | fails before any remote call |
/// | category/kind lookup, row insert | fatal, nothing written |
/// | image insert on create | fatal, the new row is deleted again |
/// | featured insert on create | logged, the returned entry shows the actual state |
/// | featured toggle on update | fatal, images are left untouched |
/// | image replacement on update | fatal, images may be partially replaced |
/// | final re-fetch finds nothing | `NotFound` |
pub struct AdminCatalogUseCase {
    /// Repository for the remote catalog
    repository: Arc<dyn CatalogRepository>,
    /// Session check and single-retry policy for remote calls
    retry: AuthRetry,
}

impl AdminCatalogUseCase {
    pub fn new(repository: Arc<dyn CatalogRepository>, retry: AuthRetry) -> Self {
        Self { repository, retry }
    }

    /// Creates an entry with its images and featured membership.
    pub async fn create_item(&self, request: CreateCatalogItemRequest) -> Result<CatalogItem> {
        request.validate()?;
        let repo = &self.repository;

        let category_id = self
            .retry
            .run(|| repo.resolve_category_id(request.category))
            .await?;
        let kind_id = self.retry.run(|| repo.resolve_kind_id(request.kind)).await?;

        let slug = generate_slug(&request.name, &request.code, Utc::now());
        let record = NewCatalogRecord {
            name: request.name.trim().to_string(),
            slug,
            category_id,
            kind_id,
            set_name: request.set_name.trim().to_string(),
            code: request.code.trim().to_string(),
            language: request.language,
            condition: request.condition,
            price: request.price,
            status: request.status,
            description: normalize_description(request.description.clone()),
        };
        let id = self.retry.run(|| repo.insert_item(&record)).await?;

        if !request.images.is_empty() {
            let inserted = self
                .retry
                .run(|| repo.insert_images(&id, &request.images))
                .await;
            if let Err(e) = inserted {
                tracing::warn!(%id, error = %e, "Image insert failed, removing new entry");
                if let Err(cleanup) = self.retry.run(|| repo.delete_item(&id)).await {
                    tracing::error!(%id, error = %cleanup, "Failed to remove entry after image insert failure");
                }
                return Err(e);
            }
        }

        if request.featured {
            if let Err(e) = self.retry.run(|| repo.set_featured(&id, true)).await {
                tracing::warn!(%id, error = %e, "Failed to mark new entry as featured");
            }
        }

        let item = self.fetch(&id).await?;
        tracing::info!(%id, name = %item.name, "Created catalog entry");
        Ok(item)
    }

    /// Applies a sparse update and returns the stored entry.
    ///
    /// Only provided fields are written. When only images or featured
    /// membership change, the entry's update timestamp is still bumped.
    pub async fn update_item(
        &self,
        id: &str,
        request: UpdateCatalogItemRequest,
    ) -> Result<CatalogItem> {
        request.validate()?;
        if request.is_empty() {
            tracing::debug!(%id, "Empty update, returning stored entry");
            return self.fetch(id).await;
        }
        let repo = &self.repository;

        if request.has_core_changes() {
            let changes = self.resolve_changes(&request).await?;
            self.retry.run(|| repo.update_item(id, &changes)).await?;
        } else {
            self.retry.run(|| repo.touch_item(id)).await?;
        }

        if request.featured.is_provided() {
            let featured = matches!(request.featured, Patch::Set(true));
            self.retry.run(|| repo.set_featured(id, featured)).await?;
        }

        if request.images.is_provided() {
            let images = request.images.as_set().cloned().unwrap_or_default();
            self.replace_images(id, &images).await.map_err(|e| {
                tracing::warn!(%id, error = %e, "Image replacement failed");
                partially_replaced(e)
            })?;
        }

        let item = self.fetch(id).await?;
        tracing::info!(%id, "Updated catalog entry");
        Ok(item)
    }

    /// Marks an entry available or sold.
    pub async fn set_status(&self, id: &str, status: ItemStatus) -> Result<CatalogItem> {
        let request = UpdateCatalogItemRequest {
            status: Patch::Set(status),
            ..Default::default()
        };
        self.update_item(id, request).await
    }

    /// Deletes an entry with its images and featured membership.
    pub async fn delete_item(&self, id: &str) -> Result<()> {
        let repo = &self.repository;
        if self.retry.run(|| repo.find_by_id(id)).await?.is_none() {
            return Err(CardvaultError::not_found("catalog item", id));
        }

        self.retry.run(|| repo.delete_images(id)).await?;
        self.retry.run(|| repo.set_featured(id, false)).await?;
        self.retry.run(|| repo.delete_item(id)).await?;

        tracing::info!(%id, "Deleted catalog entry");
        Ok(())
    }

    /// Resolves lookups and maps the request onto row changes.
    async fn resolve_changes(&self, request: &UpdateCatalogItemRequest) -> Result<CatalogChanges> {
        let repo = &self.repository;
        let category_id = match request.category {
            Patch::Set(category) => {
                Patch::Set(self.retry.run(|| repo.resolve_category_id(category)).await?)
            }
            _ => Patch::Keep,
        };
        let kind_id = match request.kind {
            Patch::Set(kind) => Patch::Set(self.retry.run(|| repo.resolve_kind_id(kind)).await?),
            _ => Patch::Keep,
        };

        Ok(CatalogChanges {
            name: request.name.clone().map(|name| name.trim().to_string()),
            category_id,
            kind_id,
            set_name: request.set_name.clone().map(|s| s.trim().to_string()),
            code: request.code.clone().map(|c| c.trim().to_string()),
            language: request.language.clone(),
            condition: request.condition.clone(),
            price: request.price.clone(),
            status: request.status.clone(),
            description: match request.description.clone() {
                Patch::Set(text) => normalize_description(Some(text)).into(),
                other => other,
            },
        })
    }

    /// Deletes every image row, then inserts `images` in order.
    async fn replace_images(&self, id: &str, images: &[String]) -> Result<()> {
        let repo = &self.repository;
        self.retry.run(|| repo.delete_images(id)).await?;
        self.retry.run(|| repo.insert_images(id, images)).await
    }

    async fn fetch(&self, id: &str) -> Result<CatalogItem> {
        let repo = &self.repository;
        self.retry
            .run(|| repo.find_by_id(id))
            .await?
            .ok_or_else(|| CardvaultError::not_found("catalog item", id))
    }
}

/// Blank descriptions are stored as absent.
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn partially_replaced(err: CardvaultError) -> CardvaultError {
    match err {
        CardvaultError::Remote {
            status,
            code,
            message,
        } => CardvaultError::Remote {
            status,
            code,
            message: format!("Images may be partially replaced: {}", message),
        },
        other => other,
    }
}
