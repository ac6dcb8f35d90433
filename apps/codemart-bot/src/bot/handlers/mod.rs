pub mod callback;
pub mod flows;
pub mod message;
