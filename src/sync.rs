use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::ScheduleCache;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::live::{elapsed_seconds, resolve_live};
use crate::player::{Player, PlayerEvent};
use crate::schedule::{Entry, Schedule};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    /// Correction applied right after the player becomes ready or resumes.
    pub seek_threshold_secs: f64,
    /// Looser correction applied from the periodic tick.
    pub drift_threshold_secs: f64,
    pub tick_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            seek_threshold_secs: 1.0,
            drift_threshold_secs: 60.0,
            tick_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Idle,
    Loaded(Tracked),
}

/// The entry currently loaded into the player.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub entry: Entry,
    pub duration_secs: f64,
}

impl Tracked {
    fn is_same_airing(&self, entry: &Entry) -> bool {
        self.entry.key() == entry.key() && self.entry.start == entry.start
    }
}

/// What the presentation layer needs to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub live: Option<Entry>,
    pub position: f64,
    pub last_error: Option<Error>,
}

/// Keeps an external player aligned with the entry the schedule says is on air.
///
/// All handlers take `&mut self`, so sync decisions are serialized by
/// construction. Fetch failures never escape a handler: they are logged,
/// recorded in [`Status::last_error`], and the loaded entry is left as is.
pub struct Synchronizer<P> {
    player: P,
    cache: Arc<ScheduleCache>,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    state: SyncState,
    position: f64,
    last_error: Option<Error>,
}

impl<P: Player> Synchronizer<P> {
    pub fn new(
        player: P,
        cache: Arc<ScheduleCache>,
        clock: Arc<dyn Clock>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            player,
            cache,
            clock,
            settings,
            state: SyncState::Idle,
            position: 0.0,
            last_error: None,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn status(&self) -> Status {
        Status {
            live: self.tracked().map(|t| t.entry.clone()),
            position: self.position,
            last_error: self.last_error.clone(),
        }
    }

    /// Reads the schedule through the cache and loads whatever is on air.
    pub async fn start(&mut self) {
        match self.cache.get().await {
            Ok(schedule) => self.schedule_updated(&schedule),
            Err(err) => self.fetch_failed(err),
        }
    }

    /// Re-resolves the live entry against a new or refreshed schedule.
    pub fn schedule_updated(&mut self, schedule: &Schedule) {
        if let Err(err) = self.try_schedule_updated(schedule) {
            warn!(error = %err, "schedule is malformed, nothing on air");
            self.state = SyncState::Idle;
            self.last_error = Some(err);
        }
    }

    fn try_schedule_updated(&mut self, schedule: &Schedule) -> Result<()> {
        let now = self.clock.now();
        let Some(entry) = resolve_live(schedule, now)? else {
            if self.state != SyncState::Idle {
                info!("no live entry, going idle");
            }
            self.state = SyncState::Idle;
            self.last_error = None;
            return Ok(());
        };

        if self.tracked().is_some_and(|t| t.is_same_airing(entry)) {
            debug!(key = entry.key(), "live entry unchanged");
            self.last_error = None;
            return Ok(());
        }

        let duration = entry.video.duration_seconds()?;
        let elapsed = elapsed_seconds(entry, now)?;
        let start = elapsed.floor().clamp(0.0, duration.saturating_sub(1) as f64);

        info!(
            key = entry.key(),
            video = %entry.video.id,
            title = %entry.video.title,
            start,
            "loading live entry"
        );
        self.player.load_video(&entry.video.id, start);
        self.position = start;
        self.state = SyncState::Loaded(Tracked {
            entry: entry.clone(),
            duration_secs: duration as f64,
        });
        self.last_error = None;
        Ok(())
    }

    pub async fn handle(&mut self, event: PlayerEvent) {
        debug!(?event, "player event");
        match event {
            PlayerEvent::Ready | PlayerEvent::Play => {
                self.resync(self.settings.seek_threshold_secs).await;
            }
            PlayerEvent::Pause => {
                self.position = self.player.current_position();
            }
            PlayerEvent::End => self.roll_over().await,
        }
    }

    /// Periodic position sample. Corrects only drift beyond the loose threshold.
    ///
    /// While idle, re-resolves against the cached schedule so the next entry
    /// is picked up as soon as it starts airing.
    pub async fn tick(&mut self) -> Status {
        if self.state == SyncState::Idle {
            match self.cache.get().await {
                Ok(schedule) => self.schedule_updated(&schedule),
                Err(err) => self.fetch_failed(err),
            }
        }
        self.position = self.player.current_position();
        if let Some(expected) = self.expected_position() {
            let drift = (self.position - expected).abs();
            if drift > self.settings.drift_threshold_secs {
                warn!(drift, expected, position = self.position, "player drifted");
                self.resync(self.settings.seek_threshold_secs).await;
            }
        }
        self.status()
    }

    async fn resync(&mut self, threshold: f64) {
        let Some(duration) = self.tracked().map(|t| t.duration_secs) else {
            return;
        };
        let Some(expected) = self.expected_position() else {
            return;
        };

        if expected > duration {
            info!(expected, duration, "entry finished off air, refreshing");
            self.roll_over().await;
            return;
        }

        self.position = self.player.current_position();
        if (self.position - expected).abs() > threshold {
            info!(from = self.position, to = expected, "seeking to live position");
            self.player.seek_to(expected);
            self.position = expected;
        }
    }

    async fn roll_over(&mut self) {
        match self.cache.refresh().await {
            Ok(schedule) => self.schedule_updated(&schedule),
            Err(err) => self.fetch_failed(err),
        }
    }

    fn fetch_failed(&mut self, err: Error) {
        warn!(error = %err, "keeping current entry until the schedule can be fetched");
        self.last_error = Some(err);
    }

    fn expected_position(&self) -> Option<f64> {
        let tracked = self.tracked()?;
        match elapsed_seconds(&tracked.entry, self.clock.now()) {
            Ok(expected) => Some(expected),
            Err(err) => {
                warn!(error = %err, "tracked entry has no usable start");
                None
            }
        }
    }

    fn tracked(&self) -> Option<&Tracked> {
        match &self.state {
            SyncState::Loaded(tracked) => Some(tracked),
            SyncState::Idle => None,
        }
    }
}
