use jiff::Timestamp;

use crate::clock::seconds_between;
use crate::error::Result;
use crate::schedule::{Entry, Schedule, entry_window};

/// The entry on air at `now`, if any.
///
/// Entries are scanned in order and the first whose `[start, end)` window
/// contains `now` wins. Gaps before, between, or after entries yield `None`.
/// A malformed entry encountered before the match is an error.
pub fn resolve_live(schedule: &Schedule, now: Timestamp) -> Result<Option<&Entry>> {
    for entry in &schedule.entries {
        if entry_window(entry)?.contains(now) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Seconds from the entry's start to `now`. Negative before the start and
/// unbounded past the end.
pub fn elapsed_seconds(entry: &Entry, now: Timestamp) -> Result<f64> {
    Ok(seconds_between(entry.start()?, now))
}
