pub mod account;

pub use account::{PurchaseEntry, UserAccount};
