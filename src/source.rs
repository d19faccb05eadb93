use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schedule::Schedule;

/// Somewhere a whole schedule document can be retrieved from.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch(&self) -> Result<Schedule>;
}

/// Fetches the schedule JSON over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::fetch)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ScheduleSource for HttpSource {
    async fn fetch(&self) -> Result<Schedule> {
        debug!(url = %self.url, "fetching schedule");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(Error::fetch)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(format!("{} returned {status}", self.url)));
        }
        response.json::<Schedule>().await.map_err(Error::fetch)
    }
}

/// Reads the schedule JSON from a local file on every fetch.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScheduleSource for FileSource {
    async fn fetch(&self) -> Result<Schedule> {
        debug!(path = %self.path.display(), "reading schedule");
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| Error::fetch(format!("{}: {err}", self.path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|err| Error::fetch(format!("{}: {err}", self.path.display())))
    }
}
