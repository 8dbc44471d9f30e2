//! A thin, explicit `Timestamp` alias so wire code never has to spell out `chrono`'s type.

use chrono::{DateTime, Utc};

pub type Timestamp = DateTime<Utc>;

pub trait TimestampExt: Sized {
    fn now() -> Self;

    /// `0` decodes to `None`; any other value decodes to `Some`. Used by the counter store,
    /// which has no `NULL` column for "no deadline" in its wire representation.
    fn from_unix_secs(secs: u64) -> Option<Self>;

    fn to_unix_secs(&self) -> u64;
}

impl TimestampExt for Timestamp {
    fn now() -> Self {
        Utc::now()
    }

    fn from_unix_secs(secs: u64) -> Option<Self> {
        let secs: i64 = secs.try_into().ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    fn to_unix_secs(&self) -> u64 {
        self.timestamp().try_into().unwrap_or(0)
    }
}
