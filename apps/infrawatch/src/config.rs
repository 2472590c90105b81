//! # Application Configuration
//!
//! Optional toml configuration for the server and the scheduled
//! evaluation job. Every field has a default, so a missing file or a
//! partial file both work; threshold overrides are forwarded to the
//! core constructors at startup and never change afterwards.
//!
//! ```toml
//! # infrawatch.toml
//! database = "infrawatch.db"
//! evaluation_interval_secs = 3600
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [stage_thresholds]
//! m01_critical = 0.30
//! m01_healthy = 0.70
//! ```

use infrawatch_core::{InfrawatchError, SignalThresholds, StageThresholds};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Maximum accepted config file size. Anything larger is a mistake.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// CONFIG STRUCTURES
// =============================================================================

/// HTTP server binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Store path; the CLI's global `--database` flag wins when given.
    pub database: Option<PathBuf>,
    /// Seconds between scheduled stage evaluations; 0 disables the job.
    pub evaluation_interval_secs: u64,
    /// Classifier threshold overrides.
    pub stage_thresholds: Option<StageThresholds>,
    /// Detector threshold overrides.
    pub signal_thresholds: Option<SignalThresholds>,
}

impl AppConfig {
    /// Load configuration from a toml file.
    pub fn load(path: &Path) -> Result<Self, InfrawatchError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| InfrawatchError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(InfrawatchError::IoError(format!(
                "Config file size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| InfrawatchError::IoError(format!("Cannot read config: {}", e)))?;
        toml::from_str(&raw)
            .map_err(|e| InfrawatchError::DeserializationError(format!("Invalid config: {}", e)))
    }

    /// Load from a path when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, InfrawatchError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Classifier thresholds with any overrides applied.
    #[must_use]
    pub fn stage_thresholds(&self) -> StageThresholds {
        self.stage_thresholds.unwrap_or_default()
    }

    /// Detector thresholds with any overrides applied.
    #[must_use]
    pub fn signal_thresholds(&self) -> SignalThresholds {
        self.signal_thresholds.unwrap_or_default()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_a_file() {
        let config = AppConfig::load_or_default(None).expect("defaults");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.evaluation_interval_secs, 0);
        assert!(config.database.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "evaluation_interval_secs = 900\n\n[server]\nport = 9090\n"
        )
        .expect("write");

        let config = AppConfig::load(file.path()).expect("load");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.evaluation_interval_secs, 900);
    }

    #[test]
    fn threshold_overrides_reach_the_tables() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "[stage_thresholds]\nm01_critical = 0.35\nadoption_min_streak = 3\n"
        )
        .expect("write");

        let config = AppConfig::load(file.path()).expect("load");
        let thresholds = config.stage_thresholds();
        assert_eq!(thresholds.m01_critical, 0.35);
        assert_eq!(thresholds.adoption_min_streak, 3);
        // Fields the override does not name keep their defaults.
        assert_eq!(thresholds.m01_healthy, 0.70);
        // Unset table falls back to defaults wholesale.
        assert_eq!(config.signal_thresholds().price_move_high, 0.10);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "server = \"not a table\"").expect("write");
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load(Path::new("/nonexistent/infrawatch.toml")).is_err());
    }
}
