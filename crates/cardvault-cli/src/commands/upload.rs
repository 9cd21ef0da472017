use std::path::Path;

use anyhow::{Context, Result, anyhow};
use cardvault_core::auth::AuthProvider;
use cardvault_infrastructure::{ApiCredentials, ImageUploader};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::AppContext;

/// Uploads one image; Ctrl-C cancels the transfer.
pub async fn upload(ctx: &AppContext, file: &Path) -> Result<()> {
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", file.display()))?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let auth: Arc<dyn AuthProvider> = ctx.auth_provider()?;
    let config = &ctx.config;
    let uploader = ImageUploader::new(
        config.base_url(),
        config.storage_bucket.clone(),
        config.max_upload_bytes,
        ApiCredentials::with_auth(config.anon_key.clone(), auth.clone()),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let uploaded = ctx
        .auth_retry(auth)
        .run(|| uploader.upload(bytes.clone(), file_name, &cancel))
        .await?;

    println!("{}", uploaded.public_url);
    println!("path: {} ({} bytes, {})", uploaded.path, uploaded.size, uploaded.content_type);
    Ok(())
}
