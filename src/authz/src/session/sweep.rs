//! Expiry selection for the session sweep
//!
//! Pure functions over a snapshot and an instant; the store applies the
//! result.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether a verification is old enough to drop
///
/// `retention` is at least the longest TTL any check may use, so an entry
/// selected here is stale for every check.
pub fn is_expired(verified_at: DateTime<Utc>, now: DateTime<Utc>, retention: Duration) -> bool {
    let retention = chrono::Duration::milliseconds(retention.as_millis().min(i64::MAX as u128) as i64);
    now.signed_duration_since(verified_at) >= retention
}

/// Subjects whose verification has expired at `now`
pub fn expired_subjects<'a, I>(entries: I, now: DateTime<Utc>, retention: Duration) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, DateTime<Utc>)>,
{
    entries
        .into_iter()
        .filter(|(_, verified_at)| is_expired(*verified_at, now, retention))
        .map(|(subject, _)| subject.to_string())
        .collect()
}
