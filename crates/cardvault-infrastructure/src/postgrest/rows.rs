//! Wire rows of the remote catalog schema and their mapping to the domain.

use std::str::FromStr;

use cardvault_core::catalog::{
    CatalogChanges, CatalogItem, Category, Condition, ItemKind, ItemStatus, Language,
    NewCatalogRecord, Patch, cents_to_price, price_to_cents,
};
use cardvault_core::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const PRODUCTS: &str = "products";
pub const CATEGORIES: &str = "categories";
pub const PRODUCT_TYPES: &str = "product_types";
pub const PRODUCT_IMAGES: &str = "product_images";
pub const FEATURED_PRODUCTS: &str = "featured_products";

/// Product columns with the category and kind slugs embedded.
pub const PRODUCT_COLUMNS: &str = "id,name,slug,category_id,type_id,set_name,code,language,condition,price_cents,status,description,created_at,updated_at";

/// Lookup slug of a category.
pub fn category_slug(category: Category) -> &'static str {
    match category {
        Category::Pokemon => "pokemon",
        Category::Magic => "magic-the-gathering",
        Category::YuGiOh => "yu-gi-oh",
        Category::Other => "other",
    }
}

/// Category for a lookup slug. Unknown or missing slugs map to `Other`.
pub fn category_from_slug(slug: Option<&str>) -> Category {
    match slug {
        Some("pokemon") => Category::Pokemon,
        Some("magic-the-gathering") => Category::Magic,
        Some("yu-gi-oh") => Category::YuGiOh,
        _ => Category::Other,
    }
}

pub fn kind_slug(kind: ItemKind) -> String {
    kind.to_string()
}

/// Kind for a lookup slug. Unknown or missing slugs map to `Raw`.
pub fn kind_from_slug(slug: Option<&str>) -> ItemKind {
    match slug.map(ItemKind::from_str) {
        Some(Ok(kind)) => kind,
        _ => {
            tracing::warn!(slug = ?slug, "Unknown product type slug, treating as raw");
            ItemKind::Raw
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlugRef {
    pub slug: String,
}

/// A `products` row as read, with embedded lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    pub language: Language,
    pub condition: Condition,
    pub price_cents: i64,
    pub status: ItemStatus,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Option<SlugRef>,
    #[serde(default)]
    pub product_types: Option<SlugRef>,
}

impl ProductRow {
    pub fn into_item(self, images: Vec<String>, featured: bool) -> CatalogItem {
        CatalogItem {
            id: self.id,
            name: self.name,
            category: category_from_slug(self.categories.as_ref().map(|c| c.slug.as_str())),
            kind: kind_from_slug(self.product_types.as_ref().map(|t| t.slug.as_str())),
            set_name: self.set_name.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
            language: self.language,
            condition: self.condition,
            price: cents_to_price(self.price_cents),
            images,
            status: self.status,
            description: self.description,
            featured: Some(featured),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A `product_images` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRow {
    #[serde(deserialize_with = "id_as_string")]
    pub product_id: String,
    pub url: String,
    pub position: i32,
}

/// A `featured_products` row.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturedRow {
    #[serde(deserialize_with = "id_as_string")]
    pub product_id: String,
}

/// A row with only its id selected.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// A lookup table row.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRow {
    pub id: i64,
}

/// Insert body for `products`.
#[derive(Debug, Clone, Serialize)]
pub struct NewProductRow {
    pub name: String,
    pub slug: String,
    pub category_id: i64,
    pub type_id: i64,
    pub set_name: String,
    pub code: String,
    pub language: Language,
    pub condition: Condition,
    pub price_cents: i64,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewProductRow {
    pub fn from_record(record: &NewCatalogRecord) -> Result<Self> {
        Ok(Self {
            name: record.name.trim().to_string(),
            slug: record.slug.clone(),
            category_id: record.category_id,
            type_id: record.kind_id,
            set_name: record.set_name.clone(),
            code: record.code.clone(),
            language: record.language,
            condition: record.condition,
            price_cents: price_to_cents(record.price)?,
            status: record.status,
            description: record.description.clone(),
        })
    }
}

/// Builds the sparse `products` update body. `updated_at` is always present.
pub fn update_body(changes: &CatalogChanges, now: DateTime<Utc>) -> Result<Value> {
    let mut body = Map::new();
    put(&mut body, "name", &changes.name, |v| json!(v.trim()));
    put(&mut body, "category_id", &changes.category_id, |v| json!(v));
    put(&mut body, "type_id", &changes.kind_id, |v| json!(v));
    put(&mut body, "set_name", &changes.set_name, |v| json!(v));
    put(&mut body, "code", &changes.code, |v| json!(v));
    put(&mut body, "language", &changes.language, |v| json!(v));
    put(&mut body, "condition", &changes.condition, |v| json!(v));
    put(&mut body, "status", &changes.status, |v| json!(v));
    put(&mut body, "description", &changes.description, |v| json!(v));
    match &changes.price {
        Patch::Keep => {}
        Patch::Clear => {
            body.insert("price_cents".to_string(), Value::Null);
        }
        Patch::Set(price) => {
            body.insert("price_cents".to_string(), json!(price_to_cents(*price)?));
        }
    }
    body.insert("updated_at".to_string(), json!(now.to_rfc3339()));
    Ok(Value::Object(body))
}

fn put<T>(body: &mut Map<String, Value>, column: &str, patch: &Patch<T>, to_value: impl Fn(&T) -> Value) {
    match patch {
        Patch::Keep => {}
        Patch::Clear => {
            body.insert(column.to_string(), Value::Null);
        }
        Patch::Set(value) => {
            body.insert(column.to_string(), to_value(value));
        }
    }
}

/// Accepts ids sent as JSON strings or numbers.
fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, found {}",
            other
        ))),
    }
}
