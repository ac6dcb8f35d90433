use chrono::{DateTime, Duration, Utc};
use tokio::fs;

use crate::registry::SharedRegistry;

const NUMBER_EMOJIS: [&str; 10] = [
    "1⃣", "2⃣", "3⃣", "4⃣", "5⃣", "6⃣", "7⃣", "8⃣", "9⃣", "🔟",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ProductStats {
    pub price: i64,
    pub total_codes: usize,
    pub sold: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesStats {
    pub revenue: i64,
    /// `(user_id, display name, amount paid)` per buyer.
    pub buyers: Vec<(i64, String, i64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyOverview {
    pub charged_total: i64,
    pub charged_max: i64,
    pub codes_sold: usize,
    pub gift_codes_created: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSearchView {
    pub user_id: i64,
    pub balance: i64,
    pub purchased: i64,
    pub gift_usage: u32,
    pub last_purchase: Option<String>,
    pub last_gift_code: Option<String>,
}

/// Read-only aggregation over the registries.
#[derive(Clone)]
pub struct StatsService {
    registry: SharedRegistry,
}

impl StatsService {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Sold count scans every user's purchase log; total counts the lines of
    /// the stored source file (0 when missing).
    pub async fn product_stats(&self, product: &str) -> Option<ProductStats> {
        let (price, file_path, sold) = {
            let reg = self.registry.read().await;
            let entry = reg.products.get(product)?;
            let sold = reg
                .accounts
                .values()
                .flat_map(|a| &a.recent_purchases)
                .filter(|p| p.product == product)
                .count();
            (entry.price, entry.file_path.clone(), sold)
        };

        let total_codes = match file_path {
            Some(path) => match fs::read_to_string(&path).await {
                Ok(text) => text.lines().count(),
                Err(_) => 0,
            },
            None => 0,
        };

        Some(ProductStats {
            price,
            total_codes,
            sold,
            available: total_codes.saturating_sub(sold),
        })
    }

    pub async fn sales_stats(&self, product: &str) -> SalesStats {
        let reg = self.registry.read().await;
        let price = reg.products.get(product).map_or(0, |p| p.price);
        let mut buyers = Vec::new();
        let mut sold = 0usize;
        for (user_id, account) in &reg.accounts {
            let count = account
                .recent_purchases
                .iter()
                .filter(|p| p.product == product)
                .count();
            if count > 0 {
                sold += count;
                let name = reg
                    .display_names
                    .get(user_id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                buyers.push((*user_id, name, count as i64 * price));
            }
        }
        buyers.sort_by_key(|(id, _, _)| *id);
        SalesStats {
            revenue: sold as i64 * price,
            buyers,
        }
    }

    /// The numbered top-users board: balance desc, purchase count desc,
    /// id asc; capped at ten rows, anything below is silently omitted.
    pub async fn user_report(&self) -> String {
        let reg = self.registry.read().await;
        let total_users = reg.registered.len();
        let total_balance: i64 = reg.registered.iter().map(|&id| reg.balance_of(id)).sum();

        let mut users: Vec<(i64, i64, i64)> = reg
            .registered
            .iter()
            .map(|&id| {
                let account = reg.accounts.get(&id);
                (
                    id,
                    account.map_or(0, |a| a.balance),
                    account.map_or(0, |a| a.purchased),
                )
            })
            .collect();
        users.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut lines = vec![
            format!("👤 Total users: *{}*", total_users),
            format!("💳 Combined balance: *{}*", total_balance),
            "➖➖➖➖➖➖➖➖➖➖".to_string(),
            "🔸 Top 10 users (balance first, then purchases):".to_string(),
        ];
        for (slot, (id, balance, purchased)) in users.iter().take(10).enumerate() {
            lines.push(format!(
                "{} {} - *{}* - {}",
                NUMBER_EMOJIS[slot], id, balance, purchased
            ));
        }
        lines.join("\n")
    }

    /// Trailing-window aggregates; `now` is injected so the boundary is
    /// testable. The lower bound is `now - 7 days`, inclusive.
    pub async fn weekly_overview(&self, now: DateTime<Utc>) -> WeeklyOverview {
        let cutoff = now - Duration::days(7);
        let reg = self.registry.read().await;

        let charged_total = reg
            .charge_history
            .iter()
            .filter(|e| e.at >= cutoff)
            .map(|e| e.amount)
            .sum();
        let charged_max = reg
            .charge_history
            .iter()
            .filter(|e| e.at >= cutoff)
            .map(|e| e.amount)
            .max()
            .unwrap_or(0);
        let codes_sold = reg
            .accounts
            .values()
            .flat_map(|a| &a.recent_purchases)
            .filter(|p| p.at >= cutoff)
            .count();

        WeeklyOverview {
            charged_total,
            charged_max,
            codes_sold,
            gift_codes_created: reg.gift_codes.len(),
        }
    }

    /// `(registered users, combined balance)`, for file-send captions.
    pub async fn totals(&self) -> (usize, i64) {
        let reg = self.registry.read().await;
        let balance = reg.registered.iter().map(|&id| reg.balance_of(id)).sum();
        (reg.registered.len(), balance)
    }

    pub async fn search_user(&self, user_id: i64) -> UserSearchView {
        let reg = self.registry.read().await;
        let account = reg.accounts.get(&user_id);
        UserSearchView {
            user_id,
            balance: account.map_or(0, |a| a.balance),
            purchased: account.map_or(0, |a| a.purchased),
            gift_usage: reg.gift_usage.get(&user_id).copied().unwrap_or(0),
            last_purchase: account
                .and_then(|a| a.recent_purchases.last())
                .map(|p| p.product.clone()),
            last_gift_code: reg.last_gift_code.get(&user_id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ChargeEvent, Product, Registry};
    use codemart_db::models::PurchaseEntry;

    async fn service() -> StatsService {
        StatsService::new(Registry::new().shared())
    }

    async fn seed_purchase(svc: &StatsService, user: i64, product: &str, at: DateTime<Utc>) {
        let mut reg = svc.registry.write().await;
        reg.account_mut(user).recent_purchases.push(PurchaseEntry {
            at,
            product: product.to_string(),
        });
    }

    #[tokio::test]
    async fn weekly_window_excludes_eight_days_and_includes_one_hour() {
        let svc = service().await;
        let now = Utc::now();
        {
            let mut reg = svc.registry.write().await;
            reg.charge_history.push(ChargeEvent {
                at: now - Duration::days(8),
                user_id: 1,
                amount: 9999,
            });
            reg.charge_history.push(ChargeEvent {
                at: now - Duration::hours(1),
                user_id: 1,
                amount: 700,
            });
        }
        seed_purchase(&svc, 1, "snapp", now - Duration::days(8)).await;
        seed_purchase(&svc, 1, "snapp", now - Duration::hours(1)).await;

        let overview = svc.weekly_overview(now).await;
        assert_eq!(overview.charged_total, 700);
        assert_eq!(overview.charged_max, 700);
        assert_eq!(overview.codes_sold, 1);
    }

    #[tokio::test]
    async fn top_users_break_balance_ties_on_purchase_count_then_id() {
        let svc = service().await;
        {
            let mut reg = svc.registry.write().await;
            for (id, balance, purchased) in [(1, 50, 2), (2, 50, 1), (3, 30, 5)] {
                reg.registered.insert(id);
                let account = reg.account_mut(id);
                account.balance = balance;
                account.purchased = purchased;
            }
        }
        let report = svc.user_report().await;
        let order: Vec<&str> = report.lines().filter(|l| l.contains(" - *")).collect();
        assert!(order[0].contains("1⃣ 1 - "));
        assert!(order[1].contains("2⃣ 2 - "));
        assert!(order[2].contains("3⃣ 3 - "));
    }

    #[tokio::test]
    async fn top_users_board_caps_at_ten_rows() {
        let svc = service().await;
        {
            let mut reg = svc.registry.write().await;
            for id in 1..=12 {
                reg.registered.insert(id);
                reg.account_mut(id).balance = 100 - id;
            }
        }
        let report = svc.user_report().await;
        let ranked_rows = report.lines().filter(|l| l.contains(" - *")).count();
        assert_eq!(ranked_rows, 10);
    }

    #[tokio::test]
    async fn sold_count_scans_every_purchase_log() {
        let svc = service().await;
        {
            let mut reg = svc.registry.write().await;
            reg.products.insert(
                "snapp".into(),
                Product {
                    price: 200,
                    ..Default::default()
                },
            );
            reg.display_names.insert(1, "@a".into());
        }
        let now = Utc::now();
        seed_purchase(&svc, 1, "snapp", now).await;
        seed_purchase(&svc, 1, "snapp", now).await;
        seed_purchase(&svc, 2, "snapp", now).await;
        seed_purchase(&svc, 2, "other", now).await;

        let sales = svc.sales_stats("snapp").await;
        assert_eq!(sales.revenue, 600);
        assert_eq!(
            sales.buyers,
            vec![(1, "@a".into(), 400), (2, "unknown".into(), 200)]
        );
    }
}
