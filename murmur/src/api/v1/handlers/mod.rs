pub mod activities;
pub mod admin;
pub mod bots;
pub(crate) mod health;

pub use health::health_check;
