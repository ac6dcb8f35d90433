use anyhow::Result;
use rand::seq::IteratorRandom;
use rand::Rng;
use tracing::info;

use codemart_db::repositories::UserRepository;

use crate::registry::{GiftCode, SharedRegistry};
use crate::services::roster_service::RosterService;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 8;

/// Receipt of a successful redemption, used for the admin notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemReceipt {
    pub amount: i64,
    pub used: u32,
    pub total: u32,
    pub new_balance: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub user_id: i64,
    pub display_name: String,
}

/// Gift codes: manual creation, redemption and the random-winner raffle.
#[derive(Clone)]
pub struct PromoService {
    registry: SharedRegistry,
    users: UserRepository,
    roster: RosterService,
}

impl PromoService {
    pub fn new(registry: SharedRegistry, users: UserRepository, roster: RosterService) -> Self {
        Self {
            registry,
            users,
            roster,
        }
    }

    fn random_code() -> String {
        let mut rng = rand::rng();
        (0..CODE_LEN)
            .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
            .collect()
    }

    /// Stores a fresh random code worth `amount`, redeemable `uses` times.
    pub async fn create_code(&self, amount: i64, uses: u32) -> String {
        let code = Self::random_code();
        let mut reg = self.registry.write().await;
        reg.gift_codes.insert(
            code.clone(),
            GiftCode {
                amount,
                remaining: uses,
                total: uses,
            },
        );
        info!("Gift code created ({} uses, amount {})", uses, amount);
        code
    }

    /// Redeems `code` for `user_id`. `Ok(None)` covers both unknown and
    /// exhausted codes; callers must not distinguish them to the user.
    pub async fn redeem(&self, user_id: i64, code: &str) -> Result<Option<RedeemReceipt>> {
        let (receipt, snapshot) = {
            let mut reg = self.registry.write().await;
            let (amount, used, total) = match reg.gift_codes.get_mut(code) {
                Some(gift) if gift.remaining > 0 => {
                    gift.remaining -= 1;
                    (gift.amount, gift.total - gift.remaining, gift.total)
                }
                _ => return Ok(None),
            };

            let account = reg.account_mut(user_id);
            account.balance += amount;
            let snapshot = account.clone();
            let new_balance = snapshot.balance;

            *reg.gift_usage.entry(user_id).or_insert(0) += 1;
            reg.last_gift_code.insert(user_id, code.to_string());

            (
                RedeemReceipt {
                    amount,
                    used,
                    total,
                    new_balance,
                },
                snapshot,
            )
        };

        self.users.upsert(&snapshot).await?;
        self.roster.rewrite_users_file().await?;
        info!("Gift code redeemed by user {}", user_id);
        Ok(Some(receipt))
    }

    /// Draws up to `count` distinct registered users and credits each with
    /// `amount`. Persistence happens per winner; notification is left to the
    /// caller.
    pub async fn draw_winners(&self, count: usize, amount: i64) -> Result<Vec<Winner>> {
        let winners: Vec<Winner> = {
            let mut reg = self.registry.write().await;
            let picked: Vec<i64> = {
                let mut rng = rand::rng();
                reg.registered
                    .iter()
                    .copied()
                    .choose_multiple(&mut rng, count.min(reg.registered.len()))
            };
            picked
                .into_iter()
                .map(|user_id| {
                    reg.account_mut(user_id).balance += amount;
                    Winner {
                        user_id,
                        display_name: reg
                            .display_names
                            .get(&user_id)
                            .cloned()
                            .unwrap_or_else(|| "unknown".to_string()),
                    }
                })
                .collect()
        };

        for winner in &winners {
            let snapshot = {
                let reg = self.registry.read().await;
                reg.accounts.get(&winner.user_id).cloned()
            };
            if let Some(snapshot) = snapshot {
                self.users.upsert(&snapshot).await?;
            }
        }
        self.roster.rewrite_users_file().await?;
        Ok(winners)
    }
}

/// Masks a numeric id for the public winner announcement: ids longer than
/// three digits keep everything but the last three, short ids keep all
/// their digits; both get a `***` suffix.
pub fn mask_id(id: i64) -> String {
    let digits = id.to_string();
    if digits.len() > 3 {
        format!("{}***", &digits[..digits.len() - 3])
    } else {
        format!("{}***", digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    async fn service() -> PromoService {
        let registry = Registry::new().shared();
        let pool = codemart_db::connect("sqlite::memory:").await.unwrap();
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let roster = RosterService::new(
            registry.clone(),
            dir.join(format!("codemart-promo-users-{}.txt", pid)),
            dir.join(format!("codemart-promo-registered-{}.txt", pid)),
            dir.join(format!("codemart-promo-phones-{}.txt", pid)),
        );
        PromoService::new(registry, UserRepository::new(pool), roster)
    }

    #[test]
    fn mask_id_keeps_short_ids_and_trims_long_ones() {
        assert_eq!(mask_id(42), "42***");
        assert_eq!(mask_id(123), "123***");
        assert_eq!(mask_id(123456), "123***");
        assert_eq!(mask_id(8109736174), "8109736***");
    }

    #[test]
    fn random_codes_have_the_expected_shape() {
        for _ in 0..50 {
            let code = PromoService::random_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn redeem_credits_and_counts_down_until_exhausted() {
        let svc = service().await;
        let code = svc.create_code(500, 2).await;

        let first = svc.redeem(10, &code).await.unwrap().unwrap();
        assert_eq!(first.amount, 500);
        assert_eq!((first.used, first.total), (1, 2));
        assert_eq!(first.new_balance, 500);

        let second = svc.redeem(11, &code).await.unwrap().unwrap();
        assert_eq!((second.used, second.total), (2, 2));

        // Exhausted: same rejection as a code that never existed.
        assert_eq!(svc.redeem(12, &code).await.unwrap(), None);
        assert_eq!(svc.redeem(12, "NOPE1234").await.unwrap(), None);
        assert_eq!(svc.registry.read().await.balance_of(12), 0);
    }

    #[tokio::test]
    async fn redeem_tracks_per_user_usage() {
        let svc = service().await;
        let code = svc.create_code(100, 5).await;
        svc.redeem(3, &code).await.unwrap();
        svc.redeem(3, &code).await.unwrap();

        let reg = svc.registry.read().await;
        assert_eq!(reg.gift_usage[&3], 2);
        assert_eq!(reg.last_gift_code[&3], code);
    }

    #[tokio::test]
    async fn draw_is_capped_at_population_and_credits_each_winner_once() {
        let svc = service().await;
        {
            let mut reg = svc.registry.write().await;
            for id in [1, 2, 3] {
                reg.registered.insert(id);
            }
        }

        let winners = svc.draw_winners(10, 250).await.unwrap();
        assert_eq!(winners.len(), 3);
        let mut ids: Vec<i64> = winners.iter().map(|w| w.user_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);

        let reg = svc.registry.read().await;
        for id in [1, 2, 3] {
            assert_eq!(reg.balance_of(id), 250);
        }
    }
}
