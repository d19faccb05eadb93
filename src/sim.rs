//! A headless player that plays nothing but keeps time like a real one.

use std::collections::HashMap;
use std::sync::Arc;

use jiff::Timestamp;
use tracing::{info, warn};

use crate::clock::{Clock, seconds_between};
use crate::player::{Player, PlayerEvent, Volume};
use crate::schedule::Schedule;

pub struct SimulatedPlayer {
    clock: Arc<dyn Clock>,
    durations: HashMap<String, f64>,
    loaded: Option<String>,
    /// Position at `since`.
    offset: f64,
    /// Set while playing.
    since: Option<Timestamp>,
    volume: Volume,
    muted: bool,
    pending: Option<PlayerEvent>,
    ended: bool,
}

impl SimulatedPlayer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            durations: HashMap::new(),
            loaded: None,
            offset: 0.0,
            since: None,
            volume: Volume::default(),
            muted: false,
            pending: None,
            ended: false,
        }
    }

    /// Records video lengths so loaded videos know when they end.
    pub fn learn(&mut self, schedule: &Schedule) {
        for entry in &schedule.entries {
            match entry.video.duration_seconds() {
                Ok(seconds) => {
                    self.durations.insert(entry.video.id.clone(), seconds as f64);
                }
                Err(err) => warn!(video = %entry.video.id, error = %err, "unknown length"),
            }
        }
    }

    pub fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.since.is_some()
    }

    pub fn pause(&mut self) -> Option<PlayerEvent> {
        if !self.is_playing() {
            return None;
        }
        self.offset = self.current_position();
        self.since = None;
        Some(PlayerEvent::Pause)
    }

    pub fn play(&mut self) -> Option<PlayerEvent> {
        if self.is_playing() || self.loaded.is_none() {
            return None;
        }
        self.since = Some(self.clock.now());
        Some(PlayerEvent::Play)
    }

    /// Next lifecycle notification, if one is due.
    pub fn poll_event(&mut self) -> Option<PlayerEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        let duration = self.known_duration()?;
        if !self.ended && self.current_position() >= duration {
            self.ended = true;
            self.offset = duration;
            self.since = None;
            return Some(PlayerEvent::End);
        }
        None
    }

    /// Length of the loaded video, `None` until it has been learned.
    fn known_duration(&self) -> Option<f64> {
        self.loaded
            .as_ref()
            .and_then(|id| self.durations.get(id))
            .copied()
    }
}

impl Player for SimulatedPlayer {
    fn load_video(&mut self, id: &str, start_secs: f64) {
        info!(video = id, start = start_secs, "player: load");
        self.loaded = Some(id.to_string());
        self.offset = start_secs;
        self.since = Some(self.clock.now());
        self.ended = false;
        self.pending = Some(PlayerEvent::Ready);
    }

    fn current_position(&self) -> f64 {
        let position = match self.since {
            Some(since) => self.offset + seconds_between(since, self.clock.now()),
            None => self.offset,
        };
        match self.known_duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn total_duration(&self) -> f64 {
        self.known_duration().unwrap_or(0.0)
    }

    fn seek_to(&mut self, secs: f64) {
        info!(to = secs, "player: seek");
        self.offset = match self.known_duration() {
            Some(duration) => secs.clamp(0.0, duration),
            None => secs.max(0.0),
        };
        if self.since.is_some() {
            self.since = Some(self.clock.now());
        }
        self.ended = false;
    }

    fn volume(&self) -> Volume {
        self.volume
    }

    fn set_volume(&mut self, volume: Volume) {
        info!(volume = volume.get(), "player: volume");
        self.volume = volume;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn mute(&mut self) {
        self.muted = true;
    }

    fn unmute(&mut self) {
        self.muted = false;
    }
}
