use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a user's purchase log. Stored as a JSON array inside the
/// `recent_purchases` column of the user's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEntry {
    pub at: DateTime<Utc>,
    pub product: String,
}

/// A store customer. The whole row is rewritten after every mutation; there
/// are no partial updates.
#[derive(Debug, Clone, Default)]
pub struct UserAccount {
    pub user_id: i64,
    pub balance: i64,
    pub charged: i64,
    pub purchased: i64,
    pub recent_purchases: Vec<PurchaseEntry>,
}

impl UserAccount {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}
