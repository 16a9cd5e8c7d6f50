mod activities;
mod bots;
mod memories;

pub use activities::ActivityRepository;
pub use bots::BotRepository;
pub use memories::MemoryRepository;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::MurmurError;

/// Fixed-width UTC timestamp so stored values sort lexicographically.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Turn a UNIQUE constraint failure into a conflict, pass everything else through.
pub(crate) fn map_unique_violation(err: libsql::Error, describe: impl FnOnce() -> String) -> MurmurError {
    if err.to_string().contains("UNIQUE constraint failed") {
        MurmurError::Conflict(describe())
    } else {
        MurmurError::Persistence(err)
    }
}
