use anyhow::Result;

use codemart_db::repositories::BanRepository;

use crate::registry::SharedRegistry;

/// Bans, the bot on/off switch and broadcast targeting.
#[derive(Clone)]
pub struct AdminService {
    registry: SharedRegistry,
    bans: BanRepository,
}

impl AdminService {
    pub fn new(registry: SharedRegistry, bans: BanRepository) -> Self {
        Self { registry, bans }
    }

    pub async fn is_banned(&self, user_id: i64) -> bool {
        self.registry.read().await.banned.contains(&user_id)
    }

    pub async fn ban(&self, user_id: i64) -> Result<()> {
        self.registry.write().await.banned.insert(user_id);
        self.bans.add(user_id).await
    }

    /// Lifts a ban; returns false when the user was not banned, in which
    /// case nothing is touched.
    pub async fn unban(&self, user_id: i64) -> Result<bool> {
        let was_banned = self.registry.write().await.banned.remove(&user_id);
        if was_banned {
            self.bans.remove(user_id).await?;
        }
        Ok(was_banned)
    }

    /// One page of banned ids straight from the table, plus the total.
    pub async fn banned_page(&self, page: i64, per_page: i64) -> Result<(Vec<i64>, i64)> {
        let ids = self.bans.page(page * per_page, per_page).await?;
        let total = self.bans.count().await?;
        Ok((ids, total))
    }

    pub async fn is_active(&self) -> bool {
        self.registry.read().await.bot_active
    }

    pub async fn set_active(&self, active: bool) {
        self.registry.write().await.bot_active = active;
    }

    pub async fn registered_ids(&self) -> Vec<i64> {
        self.registry.read().await.registered.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    async fn service() -> AdminService {
        let pool = codemart_db::connect("sqlite::memory:").await.unwrap();
        AdminService::new(Registry::new().shared(), BanRepository::new(pool))
    }

    #[tokio::test]
    async fn ban_persists_both_sides_and_unban_reverses() {
        let svc = service().await;
        svc.ban(9).await.unwrap();
        assert!(svc.is_banned(9).await);
        let (ids, total) = svc.banned_page(0, 10).await.unwrap();
        assert_eq!((ids, total), (vec![9], 1));

        assert!(svc.unban(9).await.unwrap());
        assert!(!svc.is_banned(9).await);
        assert_eq!(svc.banned_page(0, 10).await.unwrap().1, 0);

        // Unbanning a non-banned user is a no-op.
        assert!(!svc.unban(9).await.unwrap());
    }

    #[tokio::test]
    async fn bot_toggle_round_trips() {
        let svc = service().await;
        assert!(svc.is_active().await);
        svc.set_active(false).await;
        assert!(!svc.is_active().await);
        svc.set_active(true).await;
        assert!(svc.is_active().await);
    }
}
