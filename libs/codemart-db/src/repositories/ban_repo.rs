use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone)]
pub struct BanRepository {
    pool: SqlitePool,
}

impl BanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT user_id FROM banned_users")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch banned users")?;
        Ok(rows
            .iter()
            .map(|r| r.try_get::<i64, _>("user_id").unwrap_or_default())
            .collect())
    }

    pub async fn add(&self, user_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO banned_users (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to insert banned user")?;
        Ok(())
    }

    pub async fn remove(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM banned_users WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete banned user")?;
        Ok(())
    }

    pub async fn page(&self, offset: i64, limit: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT user_id FROM banned_users ORDER BY user_id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to page banned users")?;
        Ok(rows
            .iter()
            .map(|r| r.try_get::<i64, _>("user_id").unwrap_or_default())
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM banned_users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count banned users")?;
        Ok(row.try_get::<i64, _>("n").unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> BanRepository {
        let pool = crate::connect("sqlite::memory:").await.unwrap();
        BanRepository::new(pool)
    }

    #[tokio::test]
    async fn add_is_idempotent_and_remove_reverses_it() {
        let repo = repo().await;
        repo.add(5).await.unwrap();
        repo.add(5).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.remove(5).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_are_ordered_and_bounded() {
        let repo = repo().await;
        for id in 1..=13 {
            repo.add(id).await.unwrap();
        }
        let first = repo.page(0, 10).await.unwrap();
        assert_eq!(first, (1..=10).collect::<Vec<i64>>());
        let second = repo.page(10, 10).await.unwrap();
        assert_eq!(second, vec![11, 12, 13]);
    }
}
