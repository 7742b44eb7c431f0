//! Catalog data models.

use serde::{Deserialize, Serialize};

use crate::{CaseId, ItemId};

/// A purchasable case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub name: String,
    /// Price in cents
    pub price: i64,
}

/// An item that can drop from a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseItem {
    pub id: ItemId,
    pub case_id: CaseId,
    pub name: String,
    pub rarity: String,
    /// Unnormalized weight; only the ratio to the case total matters.
    pub drop_chance: f64,
}
