use std::collections::VecDeque;

use anyhow::Result;
use chrono::Utc;
use tokio::fs;
use tracing::info;

use codemart_db::models::PurchaseEntry;
use codemart_db::repositories::UserRepository;

use crate::registry::{Product, SharedRegistry};
use crate::services::roster_service::RosterService;

#[derive(Debug, PartialEq)]
pub enum PurchaseOutcome {
    Delivered {
        code: String,
        /// True when this purchase took the last code, so the admin should
        /// be told to restock.
        inventory_empty: bool,
    },
    NoCodes,
    InsufficientBalance,
}

#[derive(Debug, PartialEq)]
pub enum ClearOutcome {
    Cleared,
    PathMismatch,
    UnknownProduct,
}

/// Catalog maintenance and the purchase path.
#[derive(Clone)]
pub struct StoreService {
    registry: SharedRegistry,
    users: UserRepository,
    roster: RosterService,
}

impl StoreService {
    pub fn new(registry: SharedRegistry, users: UserRepository, roster: RosterService) -> Self {
        Self {
            registry,
            users,
            roster,
        }
    }

    /// Buys one code of `product` for `user_id`. Validation and mutation
    /// happen under one write guard; persistence runs afterwards from the
    /// snapshot taken inside.
    pub async fn purchase(&self, user_id: i64, product: &str) -> Result<PurchaseOutcome> {
        let (code, inventory_empty, snapshot) = {
            let mut reg = self.registry.write().await;
            let price = match reg.products.get(product) {
                Some(p) if !p.codes.is_empty() => p.price,
                _ => return Ok(PurchaseOutcome::NoCodes),
            };
            if reg.balance_of(user_id) < price {
                return Ok(PurchaseOutcome::InsufficientBalance);
            }

            let Some(entry) = reg.products.get_mut(product) else {
                return Ok(PurchaseOutcome::NoCodes);
            };
            let Some(code) = entry.codes.pop_front() else {
                return Ok(PurchaseOutcome::NoCodes);
            };
            let inventory_empty = entry.codes.is_empty();

            let account = reg.account_mut(user_id);
            account.balance -= price;
            account.purchased += 1;
            account.recent_purchases.push(PurchaseEntry {
                at: Utc::now(),
                product: product.to_string(),
            });
            (code, inventory_empty, account.clone())
        };

        self.users.upsert(&snapshot).await?;
        self.roster.rewrite_users_file().await?;
        info!("User {} bought a code of '{}'", user_id, product);
        Ok(PurchaseOutcome::Delivered {
            code,
            inventory_empty,
        })
    }

    pub async fn product_names(&self) -> Vec<String> {
        self.registry.read().await.products.keys().cloned().collect()
    }

    pub async fn price_of(&self, product: &str) -> Option<i64> {
        self.registry.read().await.products.get(product).map(|p| p.price)
    }

    pub async fn add_product(&self, name: &str, price: i64) {
        let mut reg = self.registry.write().await;
        reg.products.insert(
            name.to_string(),
            Product {
                price,
                codes: VecDeque::new(),
                file_path: None,
            },
        );
    }

    pub async fn remove_product(&self, name: &str) -> bool {
        self.registry.write().await.products.remove(name).is_some()
    }

    /// Moves the whole entry (price, codes, file path) under the new name.
    pub async fn rename_product(&self, original: &str, new_name: &str) -> bool {
        let mut reg = self.registry.write().await;
        match reg.products.remove(original) {
            Some(entry) => {
                reg.products.insert(new_name.to_string(), entry);
                true
            }
            None => false,
        }
    }

    pub async fn set_price(&self, name: &str, price: i64) -> bool {
        let mut reg = self.registry.write().await;
        match reg.products.get_mut(name) {
            Some(p) => {
                p.price = price;
                true
            }
            None => false,
        }
    }

    /// Registers `path` as the code source for `product` and loads its
    /// non-empty lines as inventory. A missing file leaves the inventory
    /// empty but still records the path.
    pub async fn load_codes(&self, product: &str, path: &str) -> Result<usize> {
        let codes: VecDeque<String> = match fs::read_to_string(path).await {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                info!("Code file {} not readable: {}", path, e);
                VecDeque::new()
            }
        };
        let count = codes.len();

        let mut reg = self.registry.write().await;
        let entry = reg.products.entry(product.to_string()).or_default();
        entry.file_path = Some(path.to_string());
        entry.codes = codes;
        info!("Loaded {} codes for '{}' from {}", count, product, path);
        Ok(count)
    }

    pub async fn stored_path(&self, product: &str) -> Option<String> {
        self.registry
            .read()
            .await
            .products
            .get(product)
            .and_then(|p| p.file_path.clone())
    }

    /// Clears the inventory of `product`, but only when the admin re-typed
    /// the exact stored file path.
    pub async fn clear_codes(&self, product: &str, confirm_path: &str) -> ClearOutcome {
        let mut reg = self.registry.write().await;
        let entry = match reg.products.get_mut(product) {
            Some(p) => p,
            None => return ClearOutcome::UnknownProduct,
        };
        if entry.file_path.as_deref() != Some(confirm_path) {
            return ClearOutcome::PathMismatch;
        }
        entry.codes.clear();
        entry.file_path = None;
        ClearOutcome::Cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::path::PathBuf;

    async fn service() -> StoreService {
        let registry = Registry::new().shared();
        let pool = codemart_db::connect("sqlite::memory:").await.unwrap();
        let users = UserRepository::new(pool);
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let roster = RosterService::new(
            registry.clone(),
            dir.join(format!("codemart-store-users-{}.txt", pid)),
            dir.join(format!("codemart-store-registered-{}.txt", pid)),
            dir.join(format!("codemart-store-phones-{}.txt", pid)),
        );
        StoreService::new(registry, users, roster)
    }

    async fn seed(svc: &StoreService, name: &str, price: i64, codes: &[&str], balance: i64) {
        let mut reg = svc.registry.write().await;
        reg.products.insert(
            name.to_string(),
            Product {
                price,
                codes: codes.iter().map(|c| c.to_string()).collect(),
                file_path: Some(PathBuf::from("/tmp/codes.txt").display().to_string()),
            },
        );
        reg.account_mut(1).balance = balance;
    }

    #[tokio::test]
    async fn n_purchases_exhaust_the_inventory_and_the_next_fails_clean() {
        let svc = service().await;
        seed(&svc, "snapp", 100, &["A", "B"], 1000).await;

        let first = svc.purchase(1, "snapp").await.unwrap();
        assert_eq!(
            first,
            PurchaseOutcome::Delivered {
                code: "A".into(),
                inventory_empty: false
            }
        );
        let second = svc.purchase(1, "snapp").await.unwrap();
        assert_eq!(
            second,
            PurchaseOutcome::Delivered {
                code: "B".into(),
                inventory_empty: true
            }
        );

        let balance_before = svc.registry.read().await.balance_of(1);
        assert_eq!(svc.purchase(1, "snapp").await.unwrap(), PurchaseOutcome::NoCodes);
        assert_eq!(svc.registry.read().await.balance_of(1), balance_before);
    }

    #[tokio::test]
    async fn insufficient_balance_does_not_mutate() {
        let svc = service().await;
        seed(&svc, "snapp", 500, &["A"], 100).await;

        assert_eq!(
            svc.purchase(1, "snapp").await.unwrap(),
            PurchaseOutcome::InsufficientBalance
        );
        let reg = svc.registry.read().await;
        assert_eq!(reg.balance_of(1), 100);
        assert_eq!(reg.products["snapp"].codes.len(), 1);
        assert_eq!(reg.accounts[&1].purchased, 0);
    }

    #[tokio::test]
    async fn purchase_debits_logs_and_persists() {
        let svc = service().await;
        seed(&svc, "snapp", 300, &["X"], 1000).await;

        svc.purchase(1, "snapp").await.unwrap();
        let reg = svc.registry.read().await;
        assert_eq!(reg.balance_of(1), 700);
        assert_eq!(reg.accounts[&1].purchased, 1);
        assert_eq!(reg.accounts[&1].recent_purchases[0].product, "snapp");
        drop(reg);

        let rows = svc.users.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].balance, 700);
    }

    #[tokio::test]
    async fn rename_moves_price_codes_and_path_together() {
        let svc = service().await;
        seed(&svc, "A", 250, &["c1", "c2", "c3"], 0).await;

        assert!(svc.rename_product("A", "B").await);
        let reg = svc.registry.read().await;
        assert!(!reg.products.contains_key("A"));
        let moved = &reg.products["B"];
        assert_eq!(moved.price, 250);
        assert_eq!(moved.codes, VecDeque::from(vec![
            "c1".to_string(),
            "c2".to_string(),
            "c3".to_string()
        ]));
        assert!(moved.file_path.is_some());
    }

    #[tokio::test]
    async fn clear_codes_requires_the_exact_stored_path() {
        let svc = service().await;
        seed(&svc, "A", 250, &["c1"], 0).await;
        let stored = svc.stored_path("A").await.unwrap();

        assert_eq!(svc.clear_codes("A", "/wrong").await, ClearOutcome::PathMismatch);
        assert_eq!(svc.registry.read().await.products["A"].codes.len(), 1);

        assert_eq!(svc.clear_codes("A", &stored).await, ClearOutcome::Cleared);
        let reg = svc.registry.read().await;
        assert!(reg.products["A"].codes.is_empty());
        assert!(reg.products["A"].file_path.is_none());
    }
}
