//! Configuration for the stress agent.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CSV file the recorder appends biometric rows to
    pub source_path: PathBuf,

    /// Trained model artifact
    pub model_path: PathBuf,

    /// Feature scaler artifact for the model
    pub scaler_path: PathBuf,

    /// Interval between polls of the source (milliseconds in the file)
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Multiplier applied to the poll interval after a failed tick
    pub error_backoff_factor: u32,

    /// Address the HTTP server binds to
    pub host: IpAddr,

    /// Port the HTTP server binds to (0 for random)
    pub port: u16,

    /// Path for storing service statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stress-agent");

        Self {
            source_path: PathBuf::from("emotibit_live.csv"),
            model_path: PathBuf::from("stress_model.json"),
            scaler_path: PathBuf::from("scaler.json"),
            poll_interval: Duration::from_secs(1),
            error_backoff_factor: 5,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stress-agent")
            .join("config.json")
    }

    /// Reject values the poller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.error_backoff_factor == 0 {
            return Err(ConfigError::Invalid {
                field: "error_backoff_factor",
                reason: "must be at least 1".to_string(),
            });
        }
        if self
            .poll_interval
            .checked_mul(self.error_backoff_factor)
            .is_none()
        {
            return Err(ConfigError::Invalid {
                field: "error_backoff_factor",
                reason: "backoff delay overflows with this poll interval".to_string(),
            });
        }
        Ok(())
    }

    /// Delay before the next tick after a failed one.
    ///
    /// Saturates for configurations `validate` would reject.
    pub fn error_backoff(&self) -> Duration {
        self.poll_interval
            .checked_mul(self.error_backoff_factor)
            .unwrap_or(Duration::MAX)
    }

    /// Where service statistics are persisted.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }
}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
