pub mod admin_service;
pub mod credit_service;
pub mod pay_service;
pub mod promo_service;
pub mod roster_service;
pub mod stats_service;
pub mod store_service;
