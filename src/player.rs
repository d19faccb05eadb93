use serde::{Deserialize, Serialize};

/// Control surface of an embedded media player.
///
/// Positions and offsets are in seconds from the start of the loaded video.
pub trait Player {
    fn load_video(&mut self, id: &str, start_secs: f64);
    fn current_position(&self) -> f64;
    fn total_duration(&self) -> f64;
    fn seek_to(&mut self, secs: f64);

    fn volume(&self) -> Volume;
    fn set_volume(&mut self, volume: Volume);
    fn is_muted(&self) -> bool;
    fn mute(&mut self);
    fn unmute(&mut self);

    fn level(&self) -> VolumeLevel {
        VolumeLevel::of(self.volume(), self.is_muted())
    }
}

/// Lifecycle notifications reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    Play,
    Pause,
    End,
}

/// Player volume, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8")]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Volume = Volume(100);

    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::MAX
    }
}

impl From<u8> for Volume {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    Muted,
    Low,
    Medium,
    High,
}

impl VolumeLevel {
    pub fn of(volume: Volume, muted: bool) -> Self {
        match volume.get() {
            _ if muted => VolumeLevel::Muted,
            67.. => VolumeLevel::High,
            34.. => VolumeLevel::Medium,
            1.. => VolumeLevel::Low,
            0 => VolumeLevel::Muted,
        }
    }
}
