//! Catalog domain model.
//!
//! A `CatalogItem` is one listed card or sealed product. Prices are decimals in
//! the domain and integer minor units on the wire.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::{CardvaultError, Result};

/// Game franchise a catalog entry belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Pokemon,
    Magic,
    YuGiOh,
    /// Catch-all for anything outside the listed franchises.
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

/// Product kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    /// Ungraded single card.
    Raw,
    /// Card encapsulated by a grading company.
    Graded,
    /// Booster boxes, packs, decks.
    Sealed,
}

/// Printed language of the card.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    En,
    Pt,
    Jp,
    Es,
    Fr,
    De,
    It,
    Kr,
    Cn,
}

/// Physical condition, best first.
///
/// Variant order is the grading order: a greater value is a worse condition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Condition {
    #[serde(rename = "M")]
    #[strum(serialize = "M")]
    Mint,
    #[serde(rename = "NM")]
    #[strum(serialize = "NM")]
    NearMint,
    #[serde(rename = "EX")]
    #[strum(serialize = "EX")]
    Excellent,
    #[serde(rename = "GD")]
    #[strum(serialize = "GD")]
    Good,
    #[serde(rename = "LP")]
    #[strum(serialize = "LP")]
    LightlyPlayed,
    #[serde(rename = "P")]
    #[strum(serialize = "P")]
    Played,
}

/// Sale status. There are no intermediate states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Sold,
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Available
    }
}

/// A catalog entry as the rest of the application sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Assigned by the remote store, never changed afterwards.
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(rename = "set")]
    pub set_name: String,
    pub code: String,
    pub language: Language,
    pub condition: Condition,
    pub price: Decimal,
    /// Ordered; the first entry is the primary image.
    #[serde(default)]
    pub images: Vec<String>,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns the primary image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }

    pub fn is_featured(&self) -> bool {
        self.featured.unwrap_or(false)
    }
}

/// Converts integer minor units (cents) into a decimal price.
pub fn cents_to_price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Converts a decimal price into integer minor units, rounding half away from zero.
pub fn price_to_cents(price: Decimal) -> Result<i64> {
    if price.is_sign_negative() {
        return Err(CardvaultError::validation("price cannot be negative"));
    }
    (price * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| CardvaultError::validation(format!("price {price} is out of range")))
}

/// Formats an amount for display, rounding to currency precision.
pub fn format_price(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}
