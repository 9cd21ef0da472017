use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cardvault_core::catalog::{CreateCatalogItemRequest, ItemStatus, UpdateCatalogItemRequest};
use serde::de::DeserializeOwned;

use super::{AppContext, summary_line};

pub async fn login(ctx: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    let session = ctx
        .auth_provider()?
        .sign_in_with_password(email, &password)
        .await?;
    println!(
        "Signed in as {} (session valid until {})",
        session.user_email.as_deref().unwrap_or(email),
        session.expires_at
    );
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    ctx.auth_provider()?.sign_out().await?;
    println!("Signed out");
    Ok(())
}

pub async fn create(ctx: &AppContext, file: &Path) -> Result<()> {
    let request: CreateCatalogItemRequest = read_json(file)?;
    let item = ctx.admin_usecase()?.create_item(request).await?;
    println!("Created {}", summary_line(&item));
    Ok(())
}

pub async fn update(ctx: &AppContext, id: &str, file: &Path) -> Result<()> {
    let request: UpdateCatalogItemRequest = read_json(file)?;
    let item = ctx.admin_usecase()?.update_item(id, request).await?;
    println!("Updated {}", summary_line(&item));
    Ok(())
}

pub async fn set_status(ctx: &AppContext, id: &str, status: ItemStatus) -> Result<()> {
    let item = ctx.admin_usecase()?.set_status(id, status).await?;
    println!("Updated {}", summary_line(&item));
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.admin_usecase()?.delete_item(id).await?;
    println!("Deleted {}", id);
    Ok(())
}

fn read_json<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid request in {}", file.display()))
}

fn read_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
