use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the broadcast engine.
///
/// `Clone` so a single failed fetch can be handed to every caller awaiting it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid duration format: {0}")]
    MalformedDuration(String),

    #[error("invalid start time format: {value} ({reason})")]
    MalformedTimestamp { value: String, reason: String },

    #[error("schedule is empty")]
    EmptySchedule,

    #[error("failed to fetch schedule: {0}")]
    ScheduleFetch(String),

    #[error("schedule entries overlap: {first} ends after {second} starts")]
    OverlappingEntries { first: String, second: String },

    #[error("no videos to schedule")]
    NoVideos,

    #[error("video {0} has zero duration")]
    ZeroLengthVideo(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn malformed_timestamp(value: &str, reason: impl ToString) -> Self {
        Error::MalformedTimestamp {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(reason: impl ToString) -> Self {
        Error::ScheduleFetch(reason.to_string())
    }
}
