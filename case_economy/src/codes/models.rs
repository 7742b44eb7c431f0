//! Redeemable code data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CaseId, CodeId, ItemId, UserId,
    errors::{EconomyError, EconomyResult},
};

/// Code lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeState {
    Active,
    Consumed,
}

impl CodeState {
    /// Move to `Consumed`. A code is consumed at most once.
    pub fn consume(self, code_id: CodeId) -> EconomyResult<CodeState> {
        match self {
            CodeState::Active => Ok(CodeState::Consumed),
            CodeState::Consumed => Err(EconomyError::AlreadyConsumed(code_id)),
        }
    }

    /// Whether the owner may still change.
    pub fn is_transferable(self) -> bool {
        self == CodeState::Active
    }
}

impl std::fmt::Display for CodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeState::Active => write!(f, "active"),
            CodeState::Consumed => write!(f, "consumed"),
        }
    }
}

impl std::str::FromStr for CodeState {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CodeState::Active),
            "consumed" => Ok(CodeState::Consumed),
            other => Err(EconomyError::Database(sqlx::Error::Decode(
                format!("unknown code state '{other}'").into(),
            ))),
        }
    }
}

/// A code representing ownership of a won item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemableCode {
    pub id: CodeId,
    pub owner_user_id: UserId,
    pub case_id: CaseId,
    pub item_id: ItemId,
    /// Item name at the time the case was opened
    pub item_name: String,
    pub code: String,
    pub state: CodeState,
    pub created_at: DateTime<Utc>,
}

/// A user's code joined with the case it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeView {
    #[serde(flatten)]
    pub code: RedeemableCode,
    pub case_name: String,
    pub case_price: i64,
    /// `None` when the item is no longer in the catalog
    pub rarity: Option<String>,
    /// House buy-back amount while the code is active. Stores leave it unset.
    pub redeem_value: Option<i64>,
}

/// Insert payload for a freshly minted code
#[derive(Debug, Clone)]
pub struct NewCode {
    pub owner_user_id: UserId,
    pub case_id: CaseId,
    pub item_id: ItemId,
    pub item_name: String,
    pub code: String,
}
