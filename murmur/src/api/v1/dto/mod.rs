//! v1 API Data Transfer Objects.
//!
//! Wire types for the v1 REST API, kept apart from the domain models in
//! `src/models/`. Field names are camelCase on the wire.

pub mod activities;
pub mod admin;
pub mod bots;

pub use activities::*;
pub use admin::*;
pub use bots::*;

/// Clamp a requested page size into `1..=100`, defaulting to 20.
pub fn page_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(20).clamp(1, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_limit_defaults_and_clamps() {
        assert_eq!(page_limit(None), 20);
        assert_eq!(page_limit(Some(0)), 1);
        assert_eq!(page_limit(Some(500)), 100);
        assert_eq!(page_limit(Some(42)), 42);
    }
}
