use std::sync::LazyLock;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::SyncSettings;

static CONFIG: LazyLock<Config> = LazyLock::new(|| match Config::load() {
    Ok(config) => config,
    Err(err) => {
        panic!("CONFIG ERROR: {err}");
    }
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub schedule_url: String,
    pub bind_address: String,
    pub tick_interval_ms: u64,
    pub seek_threshold_secs: f64,
    pub drift_threshold_secs: f64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let sync = SyncSettings::default();
        Self {
            schedule_url: "http://127.0.0.1:8000/schedule.json".to_string(),
            bind_address: "127.0.0.1:8080".to_string(),
            tick_interval_ms: sync.tick_interval.as_millis() as u64,
            seek_threshold_secs: sync.seek_threshold_secs,
            drift_threshold_secs: sync.drift_threshold_secs,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Defaults, then `airtime.toml`, then `AIRTIME_*` variables.
    pub fn load() -> Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("airtime.toml"))
            .merge(Env::prefixed("AIRTIME_"))
            .extract::<Config>()
            .map_err(|err| Error::Config(err.to_string()))
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            seek_threshold_secs: self.seek_threshold_secs,
            drift_threshold_secs: self.drift_threshold_secs,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn get_config() -> &'static Config {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_sync_settings() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load().unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.sync_settings(), SyncSettings::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "airtime.toml",
                r#"
                schedule_url = "https://example.com/schedule.json"
                drift_threshold_secs = 30.0
                "#,
            )?;
            jail.set_env("AIRTIME_TICK_INTERVAL_MS", "250");

            let config = Config::load().unwrap();
            assert_eq!(config.schedule_url, "https://example.com/schedule.json");
            assert_eq!(config.tick_interval_ms, 250);
            let settings = config.sync_settings();
            assert_eq!(settings.drift_threshold_secs, 30.0);
            assert_eq!(settings.seek_threshold_secs, 1.0);
            assert_eq!(settings.tick_interval, Duration::from_millis(250));
            Ok(())
        });
    }
}
