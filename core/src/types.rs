//! Domain records and write inputs for the inventory tables.
//!
//! # Design
//! Read models (`InventoryRecord`, `ActionLogRecord`) are parsed from raw row
//! substrings produced by `json::split_top_level_objects`, applying the
//! column-alias and default rules here so the client operations stay thin.
//! Write inputs (`NewItem`, `ItemPatch`, `Registration`) are plain structs;
//! the client serializes them per fallback shape, so they carry no serde
//! attributes of their own.

use crate::error::ApiError;
use crate::json;

/// Category assigned when no category column is present under any alias.
pub const DEFAULT_CATEGORY: &str = "Other";

/// One inventory row as the caller sees it, aliases already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub item_name: String,
    /// From `category`, then `item_category`, then [`DEFAULT_CATEGORY`].
    pub category: String,
    /// From `quantity`; a 0 there triggers a second look at the legacy `qty`
    /// column, so a true zero stored under `qty`-era rows is indistinguishable
    /// from "column absent". Kept for compatibility with existing deployments.
    pub quantity: i64,
    pub price: f64,
    /// From `date_added`, falling back to the row's `created_at`.
    pub date_added: String,
    /// From `date_updated`, falling back to the row's `updated_at`.
    pub date_updated: String,
}

impl InventoryRecord {
    /// Parse one raw row object.
    ///
    /// `item_name` is the only mandatory column; a row without it is
    /// malformed regardless of which schema revision produced it.
    fn from_row(row: &str) -> Result<Self, ApiError> {
        let Some(item_name) = json::extract_string(row, "item_name") else {
            return Err(ApiError::Parse(format!("malformed inventory row: {row}")));
        };

        let category = json::extract_string(row, "category")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| json::extract_string(row, "item_category").filter(|v| !v.trim().is_empty()))
            .unwrap_or(DEFAULT_CATEGORY);

        let mut quantity = json::extract_int(row, "quantity");
        if quantity == 0 {
            quantity = json::extract_int(row, "qty");
        }

        let date_added = json::extract_string(row, "date_added")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| json::extract_string(row, "created_at"))
            .unwrap_or_default();
        let date_updated = json::extract_string(row, "date_updated")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| json::extract_string(row, "updated_at"))
            .unwrap_or_default();

        Ok(Self {
            item_name: item_name.to_string(),
            category: category.to_string(),
            quantity,
            price: json::extract_double(row, "price"),
            date_added: date_added.to_string(),
            date_updated: date_updated.to_string(),
        })
    }

    /// Parse a response body holding an array of inventory rows.
    pub fn parse_rows(body: &str) -> Result<Vec<Self>, ApiError> {
        json::split_top_level_objects(body)
            .into_iter()
            .map(Self::from_row)
            .collect()
    }
}

/// One action-log row; every field tolerates absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLogRecord {
    pub action_type: String,
    pub details: String,
    pub created_at: String,
}

impl ActionLogRecord {
    /// Parse a response body holding an array of action-log rows.
    pub fn parse_rows(body: &str) -> Vec<Self> {
        json::split_top_level_objects(body)
            .into_iter()
            .map(|row| Self {
                action_type: json::extract_string(row, "action_type").unwrap_or_default().to_string(),
                details: json::extract_string(row, "details").unwrap_or_default().to_string(),
                created_at: json::extract_string(row, "created_at").unwrap_or_default().to_string(),
            })
            .collect()
    }
}

/// Input for an inventory insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub price: f64,
    pub date_added: String,
    pub date_updated: String,
}

/// Input for an inventory update; `item_name` may differ from the name the
/// row is looked up by (rename-in-place).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPatch {
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub price: f64,
    pub date_updated: String,
}

/// Registration form data; passed once into sign-up + profile upsert and not
/// persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub name: String,
    pub age: u32,
    pub address: String,
    pub email: String,
    pub phone: String,
}

impl Registration {
    /// All fields are required and age must be positive.
    pub fn validate(&self) -> Result<(), ApiError> {
        let text_fields = [
            &self.username,
            &self.password,
            &self.name,
            &self.address,
            &self.email,
            &self.phone,
        ];
        if text_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ApiError::Validation(
                "all registration fields are required".to_string(),
            ));
        }
        if self.age == 0 {
            return Err(ApiError::Validation("age must be positive".to_string()));
        }
        Ok(())
    }
}
