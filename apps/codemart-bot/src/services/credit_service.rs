use anyhow::Result;
use chrono::{Duration, Utc};

use codemart_db::repositories::UserRepository;

use crate::registry::{ChargeEvent, SharedRegistry};
use crate::services::roster_service::RosterService;

/// Read-only view of one account for profile and admin-lookup replies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountView {
    pub user_id: i64,
    pub balance: i64,
    pub charged: i64,
    pub purchased: i64,
}

/// Balance mutations driven by the admin, plus account lookups.
#[derive(Clone)]
pub struct CreditService {
    registry: SharedRegistry,
    users: UserRepository,
    roster: RosterService,
}

impl CreditService {
    pub fn new(registry: SharedRegistry, users: UserRepository, roster: RosterService) -> Self {
        Self {
            registry,
            users,
            roster,
        }
    }

    /// Credits `amount`, bumps the lifetime `charged` counter and appends a
    /// charge event. Returns the new balance.
    pub async fn add_credit(&self, target: i64, amount: i64) -> Result<i64> {
        let snapshot = {
            let mut reg = self.registry.write().await;
            let account = reg.account_mut(target);
            account.balance += amount;
            account.charged += amount;
            let snapshot = account.clone();
            reg.charge_history.push(ChargeEvent {
                at: Utc::now(),
                user_id: target,
                amount,
            });
            snapshot
        };
        self.users.upsert(&snapshot).await?;
        self.roster.rewrite_users_file().await?;
        Ok(snapshot.balance)
    }

    /// Debits `amount`, floored at zero. No `charged` bump and no charge
    /// event. Returns the new balance.
    pub async fn subtract_credit(&self, target: i64, amount: i64) -> Result<i64> {
        let snapshot = {
            let mut reg = self.registry.write().await;
            let account = reg.account_mut(target);
            account.balance = account.balance.saturating_sub(amount).max(0);
            account.clone()
        };
        self.users.upsert(&snapshot).await?;
        self.roster.rewrite_users_file().await?;
        Ok(snapshot.balance)
    }

    pub async fn account_view(&self, user_id: i64) -> AccountView {
        let reg = self.registry.read().await;
        match reg.accounts.get(&user_id) {
            Some(a) => AccountView {
                user_id,
                balance: a.balance,
                charged: a.charged,
                purchased: a.purchased,
            },
            None => AccountView {
                user_id,
                ..Default::default()
            },
        }
    }

    /// Products the user bought within the trailing week, newest last.
    pub async fn purchases_last_week(&self, user_id: i64) -> Vec<String> {
        let cutoff = Utc::now() - Duration::days(7);
        let reg = self.registry.read().await;
        reg.accounts
            .get(&user_id)
            .map(|a| {
                a.recent_purchases
                    .iter()
                    .filter(|p| p.at >= cutoff)
                    .map(|p| p.product.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    async fn service() -> CreditService {
        let registry = Registry::new().shared();
        let pool = codemart_db::connect("sqlite::memory:").await.unwrap();
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let roster = RosterService::new(
            registry.clone(),
            dir.join(format!("codemart-credit-users-{}.txt", pid)),
            dir.join(format!("codemart-credit-registered-{}.txt", pid)),
            dir.join(format!("codemart-credit-phones-{}.txt", pid)),
        );
        CreditService::new(registry, UserRepository::new(pool), roster)
    }

    #[tokio::test]
    async fn add_credit_updates_balance_charged_and_history() {
        let svc = service().await;
        let new_balance = svc.add_credit(77, 10000).await.unwrap();
        assert_eq!(new_balance, 10000);

        let reg = svc.registry.read().await;
        let account = &reg.accounts[&77];
        assert_eq!(account.balance, 10000);
        assert_eq!(account.charged, 10000);
        assert_eq!(reg.charge_history.len(), 1);
        assert_eq!(reg.charge_history[0].user_id, 77);
        assert_eq!(reg.charge_history[0].amount, 10000);
        drop(reg);

        let rows = svc.users.load_all().await.unwrap();
        assert_eq!(rows[0].balance, 10000);
        assert_eq!(rows[0].charged, 10000);
    }

    #[tokio::test]
    async fn subtract_credit_floors_at_zero_and_logs_nothing() {
        let svc = service().await;
        svc.add_credit(5, 300).await.unwrap();

        let balance = svc.subtract_credit(5, 1000).await.unwrap();
        assert_eq!(balance, 0);

        let reg = svc.registry.read().await;
        assert_eq!(reg.accounts[&5].charged, 300);
        assert_eq!(reg.charge_history.len(), 1); // only the add event
    }
}
