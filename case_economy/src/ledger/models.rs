//! Account data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Account model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub display_name: String,
    /// Balance in cents, never negative
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}
