use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use codemart_db::models::UserAccount;

/// A catalog entry. Price, code inventory and source file path live in one
/// struct so rename and delete move them together.
#[derive(Debug, Clone, Default)]
pub struct Product {
    pub price: i64,
    /// Single-use codes, consumed front-to-back.
    pub codes: VecDeque<String>,
    /// Where the inventory was loaded from; required as the confirmation
    /// token when the admin clears the inventory.
    pub file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GiftCode {
    pub amount: i64,
    pub remaining: u32,
    pub total: u32,
}

#[derive(Debug, Clone)]
pub struct ChargeEvent {
    pub at: DateTime<Utc>,
    pub user_id: i64,
    pub amount: i64,
}

/// All process-lifetime state. Every read-modify-write sequence holds the
/// write guard of the surrounding `RwLock` across validate and mutate, so
/// concurrent purchases or redemptions cannot interleave.
#[derive(Debug, Default)]
pub struct Registry {
    pub products: BTreeMap<String, Product>,
    pub accounts: HashMap<i64, UserAccount>,
    pub banned: HashSet<i64>,
    /// Everyone who ever issued /start; broadcast and raffle population.
    pub registered: BTreeSet<i64>,
    pub display_names: HashMap<i64, String>,
    pub gift_codes: HashMap<String, GiftCode>,
    pub gift_usage: HashMap<i64, u32>,
    pub last_gift_code: HashMap<i64, String>,
    pub charge_history: Vec<ChargeEvent>,
    pub bot_active: bool,
}

pub type SharedRegistry = Arc<RwLock<Registry>>;

impl Registry {
    pub fn new() -> Self {
        Self {
            bot_active: true,
            ..Default::default()
        }
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// The account for `user_id`, created on first touch.
    pub fn account_mut(&mut self, user_id: i64) -> &mut UserAccount {
        self.accounts
            .entry(user_id)
            .or_insert_with(|| UserAccount::new(user_id))
    }

    pub fn balance_of(&self, user_id: i64) -> i64 {
        self.accounts.get(&user_id).map_or(0, |a| a.balance)
    }

    /// Snapshot for the `users.txt` rewrite: `(id, display name, balance)`.
    pub fn roster_snapshot(&self) -> Vec<(i64, String, i64)> {
        self.registered
            .iter()
            .map(|&id| {
                let name = self
                    .display_names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                (id, name, self.balance_of(id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_mut_creates_on_first_touch() {
        let mut reg = Registry::new();
        assert!(reg.accounts.is_empty());
        reg.account_mut(9).balance = 100;
        assert_eq!(reg.balance_of(9), 100);
        assert_eq!(reg.balance_of(10), 0);
    }

    #[test]
    fn roster_snapshot_covers_every_registered_user() {
        let mut reg = Registry::new();
        reg.registered.insert(1);
        reg.registered.insert(2);
        reg.display_names.insert(1, "@alice".into());
        reg.account_mut(1).balance = 50;

        let snapshot = reg.roster_snapshot();
        assert_eq!(
            snapshot,
            vec![(1, "@alice".into(), 50), (2, "unknown".into(), 0)]
        );
    }
}
