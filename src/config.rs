use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};
use thiserror::Error;

use crate::InternalResult;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Deepest allowed nesting of user function calls.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// How long shutdown waits for running tasks.
    #[serde(default = "default_shutdown_timeout", with = "duration_ms")]
    pub shutdown_timeout: Duration,

    #[serde(default)]
    pub timers: TimerConfig,

    #[serde(default)]
    pub backtick: BacktickConfig,

    #[serde(default)]
    pub frames: FrameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_min_interval", with = "duration_ms")]
    pub min_interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            min_interval: default_min_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktickConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Shell invoked as `<shell> -c <command>`.
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for BacktickConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            shell: default_shell(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Clear finished call frames that only their own closures keep alive.
    #[serde(default = "default_true")]
    pub reclaim: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            reclaim: default_true(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: default_max_call_depth(),
            shutdown_timeout: default_shutdown_timeout(),
            timers: TimerConfig::default(),
            backtick: BacktickConfig::default(),
            frames: FrameConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path.as_ref()).map_err(|source| ConfigError::Open {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader).map_err(ConfigError::Parse)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s).map_err(ConfigError::Parse)?;
    Ok(config)
}

fn default_max_call_depth() -> usize {
    128
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_millis(1000)
}

fn default_min_interval() -> Duration {
    Duration::from_millis(1)
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_true() -> bool {
    true
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: RuntimeConfig = from_str("{}").unwrap();
        assert_eq!(config.max_call_depth, 128);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(1000));
        assert_eq!(config.timers.min_interval, Duration::from_millis(1));
        assert!(config.backtick.enabled);
        assert_eq!(config.backtick.shell, "sh");
        assert!(config.frames.reclaim);
    }

    #[test]
    fn test_partial_override() {
        let config: RuntimeConfig = from_str(
            r#"{
                "max_call_depth": 16,
                "shutdown_timeout": 250,
                "timers": { "min_interval": 10 },
                "backtick": { "enabled": false }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_call_depth, 16);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(250));
        assert_eq!(config.timers.min_interval, Duration::from_millis(10));
        assert!(!config.backtick.enabled);
        assert_eq!(config.backtick.shell, "sh");
    }

    #[test]
    fn test_round_trip_keeps_milliseconds() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["shutdown_timeout"], 1000);
        assert_eq!(json["timers"]["min_interval"], 1);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "cozy-runtime-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "max_call_depth": 3 }"#).unwrap();
        let config = RuntimeConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.max_call_depth, 3);

        let missing = RuntimeConfig::from_file("/nonexistent/cozy.json");
        assert!(matches!(missing, Err(Error::Config(ConfigError::Open { .. }))));
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let result: InternalResult<RuntimeConfig> = from_str("{ not json");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
