use anyhow::{Result, anyhow};
use cardvault_core::catalog::{CatalogRepository, format_price};

use super::{AppContext, summary_line};

pub fn list(ctx: &AppContext) -> Result<()> {
    let manager = ctx.selection_manager();
    if manager.is_empty() {
        println!("Your selection is empty");
        return Ok(());
    }
    for item in manager.items() {
        println!("{}", summary_line(item));
    }
    println!("{} item(s), total {}", manager.len(), format_price(manager.total()));
    Ok(())
}

/// Adds a snapshot of the catalog entry as currently published.
pub async fn add(ctx: &AppContext, id: &str) -> Result<()> {
    let mut manager = ctx.selection_manager();
    if manager.contains(id) {
        println!("Already in your selection");
        return Ok(());
    }
    let item = ctx
        .public_catalog()?
        .find_by_id(id)
        .await?
        .ok_or_else(|| anyhow!("No catalog entry with id '{}'", id))?;
    if !item.is_available() {
        println!("Note: '{}' is marked as sold", item.name);
    }
    manager.add(item);
    Ok(())
}

pub fn remove(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.selection_manager().remove(id);
    Ok(())
}

pub fn clear(ctx: &AppContext) -> Result<()> {
    ctx.selection_manager().clear();
    Ok(())
}
