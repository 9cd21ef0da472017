use anyhow::{Result, anyhow};
use cardvault_core::catalog::{
    CatalogFilter, CatalogRepository, Category, ItemKind, ItemStatus, PageRequest,
};

use super::{AppContext, summary_line};

pub async fn list(
    ctx: &AppContext,
    page: usize,
    category: Option<Category>,
    kind: Option<ItemKind>,
    status: Option<ItemStatus>,
    search: Option<String>,
) -> Result<()> {
    let repository = ctx.public_catalog()?;
    let filter = CatalogFilter {
        category,
        kind,
        status,
        search,
    };
    let result = repository
        .list(PageRequest::new(page, ctx.config.page_size), &filter)
        .await?;

    for item in &result.items {
        println!("{}", summary_line(item));
    }
    println!(
        "Page {}/{} ({} entries)",
        result.page,
        result.total_pages.max(1),
        result.total_count
    );
    Ok(())
}

pub async fn show(ctx: &AppContext, id: &str) -> Result<()> {
    let item = ctx
        .public_catalog()?
        .find_by_id(id)
        .await?
        .ok_or_else(|| anyhow!("No catalog entry with id '{}'", id))?;
    println!("{}", serde_json::to_string_pretty(&item)?);
    Ok(())
}

pub async fn featured(ctx: &AppContext, limit: usize) -> Result<()> {
    let items = ctx.public_catalog()?.list_featured(limit).await?;
    if items.is_empty() {
        println!("No featured entries");
    }
    for item in &items {
        println!("{}", summary_line(item));
    }
    Ok(())
}
