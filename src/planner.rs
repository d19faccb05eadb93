use jiff::{SignedDuration, Timestamp};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schedule::{Entry, Schedule, Video, entry_window};

#[derive(Debug, Clone, Copy)]
pub struct PlanSettings {
    /// A previous schedule reaching further than `now + margin` is kept as is.
    pub margin: SignedDuration,
    /// How far past the previous end new entries are laid out.
    pub max_span: SignedDuration,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            margin: SignedDuration::from_hours(24),
            max_span: SignedDuration::from_hours(48),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Unchanged,
    Extended(Schedule),
}

/// Extends `previous` with back-to-back airings of `videos`.
///
/// The video list is reshuffled at the start of every pass through it.
/// Entries of `previous` that have not finished by `now` are carried over.
pub fn plan<R: Rng + ?Sized>(
    previous: Option<&Schedule>,
    videos: &[Video],
    now: Timestamp,
    settings: &PlanSettings,
    rng: &mut R,
) -> Result<Plan> {
    let previous = previous.filter(|s| !s.entries.is_empty());
    let previous_end = previous.map(Schedule::end).transpose()?;

    if let Some(end) = previous_end {
        if end.duration_since(now) > settings.margin {
            info!(%end, "previous schedule is still valid");
            return Ok(Plan::Unchanged);
        }
    }

    if videos.is_empty() {
        return Err(Error::NoVideos);
    }
    let mut pool = Vec::with_capacity(videos.len());
    for video in videos {
        let seconds = video.duration_seconds()?;
        if seconds == 0 {
            return Err(Error::ZeroLengthVideo(video.id.clone()));
        }
        pool.push((video.clone(), SignedDuration::from_secs(seconds as i64)));
    }

    let mut entries = Vec::new();
    if let Some(previous) = previous {
        for entry in &previous.entries {
            if entry_window(entry)?.end >= now {
                entries.push(entry.clone());
            }
        }
    }
    let carried = entries.len();

    let first_start = previous_end.unwrap_or(now);
    let mut last_end = first_start;
    let mut i = 0;
    while last_end.duration_since(first_start) < settings.max_span {
        if i % pool.len() == 0 {
            pool.shuffle(rng);
        }
        let (video, duration) = &pool[i % pool.len()];
        let mut entry = Entry::new(video.clone(), last_end);
        entry.id = Some(Uuid::new_v4().simple().to_string());
        entries.push(entry);
        last_end = last_end
            .checked_add(*duration)
            .map_err(|_| Error::MalformedDuration(video.duration.clone()))?;
        i += 1;
    }

    info!(carried, added = i, end = %last_end, "schedule extended");
    let schedule = Schedule { entries };
    schedule.validate()?;
    Ok(Plan::Extended(schedule))
}
