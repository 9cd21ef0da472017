//! Product image upload to object storage.

use std::time::Duration;

use cardvault_core::error::{CardvaultError, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::http::{ApiCredentials, check_response, request_error};

/// Folder inside the bucket holding product images.
pub const PRODUCT_IMAGE_FOLDER: &str = "products";

/// Upload timeout; larger than the default request timeout.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Object path inside the bucket, e.g. `products/<uuid>.webp`.
    pub path: String,
    /// Publicly readable URL of the object.
    pub public_url: String,
    pub content_type: String,
    pub size: usize,
}

/// Checked upload parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub content_type: String,
    pub extension: String,
}

/// Validates type and size before anything is sent.
pub fn plan_upload(file_name: &str, size: usize, max_bytes: u64) -> Result<UploadPlan> {
    if size == 0 {
        return Err(CardvaultError::validation(format!("'{}' is empty", file_name)));
    }
    if size as u64 > max_bytes {
        return Err(CardvaultError::validation(format!(
            "'{}' is {} bytes, the limit is {} bytes",
            file_name, size, max_bytes
        )));
    }

    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    let content_type = mime.essence_str().to_string();
    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(CardvaultError::validation(format!(
            "'{}' has unsupported type {}; allowed: jpeg, png, webp, gif",
            file_name, content_type
        )));
    }

    let extension = match content_type.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "gif",
    };
    Ok(UploadPlan {
        content_type,
        extension: extension.to_string(),
    })
}

/// Uploads images to `<api_url>/storage/v1/object/<bucket>`.
#[derive(Debug, Clone)]
pub struct ImageUploader {
    client: Client,
    storage_url: String,
    bucket: String,
    max_bytes: u64,
    credentials: ApiCredentials,
}

impl ImageUploader {
    pub fn new(
        api_url: &str,
        bucket: impl Into<String>,
        max_bytes: u64,
        credentials: ApiCredentials,
    ) -> Self {
        Self {
            client: Client::new(),
            storage_url: format!("{}/storage/v1", api_url.trim_end_matches('/')),
            bucket: bucket.into(),
            max_bytes,
            credentials,
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.storage_url, self.bucket, path)
    }

    /// Uploads `bytes` under a fresh object name.
    ///
    /// Returns `Cancelled` if `cancel` fires before the upload completes; the
    /// in-flight request is dropped.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage> {
        let plan = plan_upload(file_name, bytes.len(), self.max_bytes)?;
        if cancel.is_cancelled() {
            return Err(CardvaultError::Cancelled);
        }

        let path = format!("{}/{}.{}", PRODUCT_IMAGE_FOLDER, Uuid::new_v4(), plan.extension);
        let size = bytes.len();
        let request = self
            .client
            .post(format!("{}/object/{}/{}", self.storage_url, self.bucket, path))
            .header("Content-Type", &plan.content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .timeout(UPLOAD_TIMEOUT);
        let request = self.credentials.apply(request).await?;

        tracing::debug!(%path, size, content_type = %plan.content_type, "Uploading image");
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(%path, "Image upload cancelled");
                return Err(CardvaultError::Cancelled);
            }
            response = request.send() => response.map_err(|e| request_error("Upload failed", e))?,
        };
        check_response(response).await?;

        tracing::info!(%path, size, "Image uploaded");
        Ok(UploadedImage {
            public_url: self.public_url(&path),
            path,
            content_type: plan.content_type,
            size,
        })
    }
}
