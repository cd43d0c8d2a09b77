//! Catalog models
//!
//! Companies, branches and items are owned by the external data store. The
//! pricing engine only reads them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Company from companies
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Branch from branches
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Branch {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Sellable item, classified by line and group
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub id: i64,
    pub line_id: i64,
    pub group_id: i64,
    pub sku: String,
    pub name: String,
    /// Last known purchase cost. Acts as the price floor.
    #[serde(with = "rust_decimal::serde::str")]
    pub last_cost: Decimal,
}

impl Item {
    /// Build an item without touching the database
    pub fn new(id: i64, line_id: i64, group_id: i64, sku: &str, last_cost: Decimal) -> Self {
        Self {
            id,
            line_id,
            group_id,
            sku: sku.to_string(),
            name: sku.to_string(),
            last_cost,
        }
    }
}
