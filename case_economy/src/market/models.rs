//! Marketplace data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CodeId, ListingId, UserId,
    errors::{EconomyError, EconomyResult},
};

/// Listing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    Open,
    Sold,
    Cancelled,
}

impl ListingState {
    /// Close an open listing; any other state means the listing is gone.
    pub fn close(self, listing_id: ListingId, to: ListingState) -> EconomyResult<ListingState> {
        match (self, to) {
            (ListingState::Open, ListingState::Sold | ListingState::Cancelled) => Ok(to),
            _ => Err(EconomyError::NotAvailable(listing_id)),
        }
    }
}

impl std::fmt::Display for ListingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingState::Open => write!(f, "open"),
            ListingState::Sold => write!(f, "sold"),
            ListingState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ListingState {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ListingState::Open),
            "sold" => Ok(ListingState::Sold),
            "cancelled" => Ok(ListingState::Cancelled),
            other => Err(EconomyError::Database(sqlx::Error::Decode(
                format!("unknown listing state '{other}'").into(),
            ))),
        }
    }
}

/// An offer to sell a code at a fixed price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub code_id: CodeId,
    /// Asking price in cents
    pub asking_price: i64,
    pub state: ListingState,
    pub buyer_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Open listing as shown on the market board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingView {
    pub listing_id: ListingId,
    pub code_id: CodeId,
    pub item_name: String,
    pub seller_id: UserId,
    pub seller_name: String,
    pub asking_price: i64,
    pub created_at: DateTime<Utc>,
}
