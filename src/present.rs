use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde::Serialize;

use crate::error::Result;
use crate::live::resolve_live;
use crate::schedule::{Entry, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thumbnail {
    MaxRes,
    High,
    Standard,
    Medium,
    Default,
}

impl Thumbnail {
    fn name(self) -> &'static str {
        match self {
            Thumbnail::MaxRes => "maxresdefault",
            Thumbnail::High => "hqdefault",
            Thumbnail::Standard => "sddefault",
            Thumbnail::Medium => "mqdefault",
            Thumbnail::Default => "default",
        }
    }
}

pub fn video_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

pub fn thumbnail_url(id: &str, size: Thumbnail) -> String {
    format!("https://i.ytimg.com/vi/{id}/{}.jpg", size.name())
}

/// `M/D  HH:MM` in the given zone.
pub fn format_start(ts: Timestamp, tz: &TimeZone) -> String {
    let dt = ts.to_zoned(tz.clone()).datetime();
    format!(
        "{}/{}  {:02}:{:02}",
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Row<'a> {
    pub entry: &'a Entry,
    pub start: String,
    pub live: bool,
}

/// One row per entry, the on-air one flagged.
pub fn listing<'a>(schedule: &'a Schedule, now: Timestamp, tz: &TimeZone) -> Result<Vec<Row<'a>>> {
    let live = resolve_live(schedule, now)?;
    schedule
        .entries
        .iter()
        .map(|entry| -> Result<Row<'a>> {
            Ok(Row {
                entry,
                start: format_start(entry.start()?, tz),
                live: live.is_some_and(|live| std::ptr::eq(live, entry)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::tests::{at, entry, t0, two_entry_schedule};

    #[test]
    fn test_urls() {
        assert_eq!(video_url("abc"), "https://www.youtube.com/watch?v=abc");
        assert_eq!(
            thumbnail_url("abc", Thumbnail::Default),
            "https://i.ytimg.com/vi/abc/default.jpg"
        );
    }

    #[test]
    fn test_format_start() {
        assert_eq!(format_start(t0(), &TimeZone::UTC), "5/1  12:00");
        let tokyo = TimeZone::fixed(jiff::tz::offset(9));
        assert_eq!(format_start(at(-3 * 3600 - 60), &tokyo), "5/1  17:59");
    }

    #[test]
    fn test_listing_marks_live_entry() {
        let schedule = two_entry_schedule();
        let rows = listing(&schedule, at(700), &TimeZone::UTC).unwrap();
        let flags: Vec<_> = rows.iter().map(|r| (r.entry.key(), r.live)).collect();
        assert_eq!(flags, [("A", false), ("B", true)]);
        assert_eq!(rows[1].start, "5/1  12:10");
    }

    #[test]
    fn test_listing_flags_only_the_airing_on_air() {
        let schedule = Schedule {
            entries: vec![entry("A", 0, 600), entry("A", 600, 600)],
        };
        let rows = listing(&schedule, at(700), &TimeZone::UTC).unwrap();
        let flags: Vec<_> = rows.iter().map(|r| r.live).collect();
        assert_eq!(flags, [false, true]);
    }
}
