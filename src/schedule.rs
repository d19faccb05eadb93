use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub duration: String,
}

impl Video {
    pub fn duration_seconds(&self) -> Result<u64> {
        parse_duration(&self.duration)
    }
}

/// One scheduled airing of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub video: Video,
    pub start: String,
}

impl Entry {
    pub fn new(video: Video, start: Timestamp) -> Self {
        Self {
            id: None,
            video,
            start: start.to_string(),
        }
    }

    /// Identity of the airing: the entry id when present, otherwise the video id.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.video.id)
    }

    pub fn start(&self) -> Result<Timestamp> {
        self.start
            .parse::<Timestamp>()
            .map_err(|err| Error::malformed_timestamp(&self.start, err))
    }

    pub fn window(&self) -> Result<Window> {
        entry_window(self)
    }
}

/// Half-open airing window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }
}

pub fn entry_window(entry: &Entry) -> Result<Window> {
    let start = entry.start()?;
    let seconds = entry.video.duration_seconds()?;
    let end = i64::try_from(seconds)
        .ok()
        .and_then(|secs| start.checked_add(SignedDuration::from_secs(secs)).ok())
        .ok_or_else(|| Error::MalformedDuration(entry.video.duration.clone()))?;
    Ok(Window { start, end })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub entries: Vec<Entry>,
}

impl Schedule {
    pub fn start(&self) -> Result<Timestamp> {
        self.entries.first().ok_or(Error::EmptySchedule)?.start()
    }

    pub fn end(&self) -> Result<Timestamp> {
        schedule_end(self)
    }

    /// Checks that the schedule is non-empty, ordered by start, and free of
    /// overlaps. Back-to-back entries (end == next start) are allowed.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::EmptySchedule);
        }
        let windows = self
            .entries
            .iter()
            .map(entry_window)
            .collect::<Result<Vec<_>>>()?;
        for (i, pair) in windows.windows(2).enumerate() {
            if pair[0].end > pair[1].start {
                return Err(Error::OverlappingEntries {
                    first: self.entries[i].key().to_string(),
                    second: self.entries[i + 1].key().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// End of the last entry; the cached copy is stale from this instant on.
pub fn schedule_end(schedule: &Schedule) -> Result<Timestamp> {
    let last = schedule.entries.last().ok_or(Error::EmptySchedule)?;
    Ok(entry_window(last)?.end)
}
