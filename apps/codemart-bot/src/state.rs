use std::sync::Arc;

use crate::config::Config;
use crate::dialogue::DialogueStore;
use crate::services::admin_service::AdminService;
use crate::services::credit_service::CreditService;
use crate::services::pay_service::PayService;
use crate::services::promo_service::PromoService;
use crate::services::roster_service::RosterService;
use crate::services::stats_service::StatsService;
use crate::services::store_service::StoreService;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub dialogues: DialogueStore,
    pub store: StoreService,
    pub credit: CreditService,
    pub promo: PromoService,
    pub stats: StatsService,
    pub pay: PayService,
    pub admin: AdminService,
    pub roster: RosterService,
}

impl AppState {
    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.cfg.admin_id
    }
}
