//! Wire and storage types.

use time::OffsetDateTime;

use crate::dto::rankings::Timestamp;

pub mod admin;
pub mod document;
pub mod envelope;
pub mod health;
pub mod rankings;
pub mod validation;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    Timestamp::try_from(nanos).unwrap_or(0)
}
