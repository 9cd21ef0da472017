//! Selection envelope codec.
//!
//! ## Format History
//! - **legacy**: bare JSON array of item snapshots, no version marker.
//!   Timestamps may be RFC 3339 text, other date text, or epoch milliseconds.
//! - **1**: `{ "version": 1, "lastUpdated": <RFC 3339>, "items": [...] }` with
//!   RFC 3339 timestamps on every item.
//!
//! Decoding never fails: unusable input is reported as [`Decoded::Corrupt`] so
//! the caller can discard it.

use cardvault_core::catalog::CatalogItem;
use cardvault_core::error::{CardvaultError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope version written by this build.
pub const SELECTION_FORMAT_VERSION: u32 = 1;

/// Storage key of the selection slot.
pub const SELECTION_STORAGE_KEY: &str = "cardvault.selection";

const TIMESTAMP_FIELDS: [(&str, &str); 2] =
    [("createdAt", "created_at"), ("updatedAt", "updated_at")];

/// Selection envelope, format version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEnvelopeV1 {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub items: Vec<CatalogItem>,
}

/// Type alias for the latest envelope version.
pub type SelectionEnvelope = SelectionEnvelopeV1;

/// Result of reading a stored selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Current format, or nothing stored.
    Current(Vec<CatalogItem>),
    /// Older format; the caller must re-encode and overwrite the slot.
    Legacy(Vec<CatalogItem>),
    /// Unusable data; the caller must clear the slot.
    Corrupt { reason: String },
}

impl Decoded {
    pub fn needs_migration(&self) -> bool {
        matches!(self, Decoded::Legacy(_))
    }

    /// Returns the decoded items, empty for corrupt input.
    pub fn into_items(self) -> Vec<CatalogItem> {
        match self {
            Decoded::Current(items) | Decoded::Legacy(items) => items,
            Decoded::Corrupt { .. } => Vec::new(),
        }
    }
}

/// Decodes the raw slot value. `None` is an empty selection.
pub fn decode(raw: Option<&str>, now: DateTime<Utc>) -> Decoded {
    let Some(raw) = raw else {
        return Decoded::Current(Vec::new());
    };

    match decode_value(raw, now) {
        Ok(decoded) => decoded,
        Err(e) => Decoded::Corrupt {
            reason: e.to_string(),
        },
    }
}

/// Encodes items as the current envelope, whatever shape was read.
pub fn encode(items: &[CatalogItem], now: DateTime<Utc>) -> Result<String> {
    let envelope = SelectionEnvelope {
        version: SELECTION_FORMAT_VERSION,
        last_updated: now,
        items: items.to_vec(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

fn decode_value(raw: &str, now: DateTime<Utc>) -> Result<Decoded> {
    let value: Value = serde_json::from_str(raw)?;

    match value {
        Value::Array(items) => Ok(Decoded::Legacy(coerce_legacy_items(items, now)?)),
        Value::Object(mut envelope) => {
            let version = envelope.get("version").and_then(Value::as_u64);
            let Some(Value::Array(items)) = envelope.remove("items") else {
                return Err(corrupt("envelope has no items list"));
            };

            if version == Some(u64::from(SELECTION_FORMAT_VERSION)) {
                let items = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<std::result::Result<Vec<CatalogItem>, _>>()?;
                Ok(Decoded::Current(items))
            } else {
                Ok(Decoded::Legacy(coerce_legacy_items(items, now)?))
            }
        }
        other => Err(corrupt(format!(
            "expected an array or an envelope, found {}",
            json_type(&other)
        ))),
    }
}

fn coerce_legacy_items(items: Vec<Value>, now: DateTime<Utc>) -> Result<Vec<CatalogItem>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(fields) => {
                let fields = coerce_timestamps(fields, now)?;
                Ok(serde_json::from_value(Value::Object(fields))?)
            }
            other => Err(corrupt(format!(
                "legacy item must be an object, found {}",
                json_type(&other)
            ))),
        })
        .collect()
}

/// Rewrites timestamp fields as RFC 3339 text under their camelCase keys.
fn coerce_timestamps(mut fields: Map<String, Value>, now: DateTime<Utc>) -> Result<Map<String, Value>> {
    for (key, legacy_key) in TIMESTAMP_FIELDS {
        let raw = match fields.remove(key) {
            Some(value) => {
                fields.remove(legacy_key);
                value
            }
            None => fields.remove(legacy_key).unwrap_or(Value::Null),
        };
        let timestamp = coerce_timestamp(&raw, now)
            .ok_or_else(|| corrupt(format!("unreadable timestamp in {key}: {raw}")))?;
        fields.insert(key.to_string(), Value::String(timestamp.to_rfc3339()));
    }
    Ok(fields)
}

fn coerce_timestamp(value: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match value {
        Value::Null => Some(now),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64))
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::String(text) => parse_timestamp_text(text),
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn corrupt(message: impl Into<String>) -> CardvaultError {
    CardvaultError::Serialization {
        format: "selection".to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardvault_core::catalog::{Condition, ItemStatus};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn legacy_item(id: &str) -> Value {
        json!({
            "id": id,
            "name": "Pikachu",
            "category": "pokemon",
            "type": "raw",
            "set": "Base Set",
            "code": "58/102",
            "language": "en",
            "condition": "NM",
            "price": 12.5,
            "images": ["https://cdn.example.com/pikachu.webp"],
            "status": "available",
            "createdAt": "2023-11-02T08:30:00.000Z",
            "updatedAt": 1_700_000_000_000_i64
        })
    }

    #[test]
    fn test_missing_value_is_empty_current() {
        assert_eq!(decode(None, now()), Decoded::Current(Vec::new()));
    }

    #[test]
    fn test_encode_then_decode_current_envelope() {
        let Decoded::Legacy(items) = decode(Some(&json!([legacy_item("a")]).to_string()), now())
        else {
            panic!("expected legacy");
        };

        let encoded = encode(&items, now()).unwrap();
        let raw: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(raw["version"], json!(1));
        assert_eq!(raw["lastUpdated"], json!("2024-06-01T10:00:00Z"));
        assert!(raw["items"][0]["createdAt"].is_string());

        assert_eq!(decode(Some(&encoded), now()), Decoded::Current(items));
    }

    #[test]
    fn test_legacy_array_is_coerced_and_flagged() {
        let raw = json!([legacy_item("a"), legacy_item("b")]).to_string();
        let decoded = decode(Some(&raw), now());

        assert!(decoded.needs_migration());
        let items = decoded.into_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price, dec!(12.5));
        assert_eq!(items[0].condition, Condition::NearMint);
        assert_eq!(items[0].status, ItemStatus::Available);
        assert_eq!(
            items[0].updated_at,
            Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
        );
    }

    #[test]
    fn test_legacy_tolerates_snake_case_and_missing_timestamps() {
        let mut item = legacy_item("a");
        let fields = item.as_object_mut().unwrap();
        fields.remove("createdAt");
        fields.remove("updatedAt");
        fields.insert("created_at".to_string(), json!("2023-01-05 14:00:00"));

        let items = decode(Some(&json!([item]).to_string()), now()).into_items();
        assert_eq!(
            items[0].created_at,
            Utc.with_ymd_and_hms(2023, 1, 5, 14, 0, 0).unwrap()
        );
        assert_eq!(items[0].updated_at, now());
    }

    #[test]
    fn test_other_version_envelope_is_treated_as_legacy() {
        let raw = json!({ "version": 0, "items": [legacy_item("a")] }).to_string();
        let decoded = decode(Some(&raw), now());
        assert!(decoded.needs_migration());
        assert_eq!(decoded.into_items().len(), 1);
    }

    #[test]
    fn test_corrupt_inputs() {
        for raw in [
            "{not json",
            "",
            "42",
            r#"{ "version": 1 }"#,
            r#"[1, 2]"#,
            r#"[{ "id": "a" }]"#,
        ] {
            assert!(
                matches!(decode(Some(raw), now()), Decoded::Corrupt { .. }),
                "expected corrupt for {raw:?}"
            );
        }
    }
}
