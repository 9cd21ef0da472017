//! Catalog create and update request models.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::model::{Category, Condition, ItemKind, ItemStatus, Language};
use crate::error::{CardvaultError, Result};

/// Maximum number of images attached to one entry.
pub const MAX_IMAGES: usize = 10;

/// A field of a sparse update.
///
/// `Keep` is an absent field and leaves the stored value untouched. `Clear` is an
/// explicit null. With `#[serde(default)]` on the field, a missing key
/// deserializes to `Keep` and `null` deserializes to `Clear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Returns `true` for `Set` and `Clear`.
    pub fn is_provided(&self) -> bool {
        !self.is_keep()
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Maps the contained value, keeping the Keep/Clear distinction.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

/// Request to create a new catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogItemRequest {
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(rename = "set", default)]
    pub set_name: String,
    #[serde(default)]
    pub code: String,
    pub language: Language,
    pub condition: Condition,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl CreateCatalogItemRequest {
    /// Validate the request and return errors if any.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_image_refs(&self.images)
    }
}

/// Sparse update of a catalog entry.
///
/// Only fields that are not `Keep` reach the remote store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCatalogItemRequest {
    pub name: Patch<String>,
    pub category: Patch<Category>,
    #[serde(rename = "type")]
    pub kind: Patch<ItemKind>,
    #[serde(rename = "set")]
    pub set_name: Patch<String>,
    pub code: Patch<String>,
    pub language: Patch<Language>,
    pub condition: Patch<Condition>,
    pub price: Patch<Decimal>,
    pub status: Patch<ItemStatus>,
    pub description: Patch<String>,
    pub images: Patch<Vec<String>>,
    pub featured: Patch<bool>,
}

impl UpdateCatalogItemRequest {
    /// Whether any field stored on the entry row itself is provided.
    pub fn has_core_changes(&self) -> bool {
        self.name.is_provided()
            || self.category.is_provided()
            || self.kind.is_provided()
            || self.set_name.is_provided()
            || self.code.is_provided()
            || self.language.is_provided()
            || self.condition.is_provided()
            || self.price.is_provided()
            || self.status.is_provided()
            || self.description.is_provided()
    }

    /// Whether images or featured membership are provided.
    pub fn has_dependent_changes(&self) -> bool {
        self.images.is_provided() || self.featured.is_provided()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_core_changes() && !self.has_dependent_changes()
    }

    /// Validate provided fields. Required columns cannot be cleared.
    pub fn validate(&self) -> Result<()> {
        let required_cleared = [
            ("name", matches!(self.name, Patch::Clear)),
            ("category", matches!(self.category, Patch::Clear)),
            ("type", matches!(self.kind, Patch::Clear)),
            ("language", matches!(self.language, Patch::Clear)),
            ("condition", matches!(self.condition, Patch::Clear)),
            ("price", matches!(self.price, Patch::Clear)),
            ("status", matches!(self.status, Patch::Clear)),
        ];
        if let Some((field, _)) = required_cleared.iter().find(|(_, cleared)| *cleared) {
            return Err(CardvaultError::validation(format!(
                "{field} is required and cannot be cleared"
            )));
        }

        if let Patch::Set(name) = &self.name {
            validate_name(name)?;
        }
        if let Patch::Set(price) = &self.price {
            validate_price(*price)?;
        }
        if let Patch::Set(images) = &self.images {
            validate_image_refs(images)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CardvaultError::validation(
            "Name is required and cannot be empty",
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(CardvaultError::validation("Price must be greater than zero"));
    }
    Ok(())
}

/// Checks an ordered image list: absolute http(s) URLs or storage paths.
pub fn validate_image_refs(images: &[String]) -> Result<()> {
    if images.len() > MAX_IMAGES {
        return Err(CardvaultError::validation(format!(
            "At most {MAX_IMAGES} images are allowed, got {}",
            images.len()
        )));
    }

    for (index, image) in images.iter().enumerate() {
        let image = image.trim();
        if image.is_empty() {
            return Err(CardvaultError::validation(format!(
                "Image {index} is empty"
            )));
        }
        if image.chars().any(char::is_whitespace) {
            return Err(CardvaultError::validation(format!(
                "Image {index} contains whitespace: '{image}'"
            )));
        }
        let is_url = image.starts_with("https://") || image.starts_with("http://");
        if !is_url && image.contains("://") {
            return Err(CardvaultError::validation(format!(
                "Image {index} uses an unsupported scheme: '{image}'"
            )));
        }
    }
    Ok(())
}
