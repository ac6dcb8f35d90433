use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::models::{PurchaseEntry, UserAccount};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_account(row: &SqliteRow) -> UserAccount {
        let user_id = row.try_get::<i64, _>("user_id").unwrap_or_default();
        let log_json = row
            .try_get::<String, _>("recent_purchases")
            .unwrap_or_default();
        let recent_purchases: Vec<PurchaseEntry> = if log_json.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&log_json).unwrap_or_else(|e| {
                warn!("Unreadable purchase log for user {}: {}", user_id, e);
                Vec::new()
            })
        };
        UserAccount {
            user_id,
            balance: row.try_get::<i64, _>("balance").unwrap_or_default(),
            charged: row.try_get::<i64, _>("charged").unwrap_or_default(),
            purchased: row.try_get::<i64, _>("purchased").unwrap_or_default(),
            recent_purchases,
        }
    }

    /// Reads every user row. The bot loads the full table into memory at
    /// startup and works off that copy.
    pub async fn load_all(&self) -> Result<Vec<UserAccount>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch all users")?;
        Ok(rows.iter().map(Self::row_to_account).collect())
    }

    /// Rewrites the user's full row (insert-or-replace, no partial updates).
    pub async fn upsert(&self, account: &UserAccount) -> Result<()> {
        let log_json = serde_json::to_string(&account.recent_purchases)
            .context("Failed to serialize purchase log")?;
        sqlx::query(
            "INSERT OR REPLACE INTO users (user_id, balance, charged, purchased, recent_purchases) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(account.user_id)
        .bind(account.balance)
        .bind(account.charged)
        .bind(account.purchased)
        .bind(&log_json)
        .execute(&self.pool)
        .await
        .context("Failed to upsert user row")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn repo() -> UserRepository {
        let pool = crate::connect("sqlite::memory:").await.unwrap();
        UserRepository::new(pool)
    }

    #[tokio::test]
    async fn upsert_then_load_round_trips_the_full_row() {
        let repo = repo().await;
        let account = UserAccount {
            user_id: 42,
            balance: 15000,
            charged: 30000,
            purchased: 2,
            recent_purchases: vec![PurchaseEntry {
                at: Utc::now(),
                product: "snapp 170/300".into(),
            }],
        };
        repo.upsert(&account).await.unwrap();

        let all = repo.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].balance, 15000);
        assert_eq!(all[0].charged, 30000);
        assert_eq!(all[0].purchased, 2);
        assert_eq!(all[0].recent_purchases, account.recent_purchases);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let repo = repo().await;
        let mut account = UserAccount::new(7);
        repo.upsert(&account).await.unwrap();

        account.balance = 500;
        repo.upsert(&account).await.unwrap();

        let all = repo.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].balance, 500);
    }
}
