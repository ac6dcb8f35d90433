pub mod ban_repo;
pub mod user_repo;

pub use ban_repo::BanRepository;
pub use user_repo::UserRepository;
