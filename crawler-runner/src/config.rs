//! Crawler configuration
//!
//! Defines all configurable parameters for the crawler: which project to
//! watch, where to store logs, and how often to poll.

use std::path::PathBuf;
use std::time::Duration;

use crawler_client::DEFAULT_ENDPOINT;

/// Default store root, relative to the working directory
pub const DEFAULT_STORE_PATH: &str = "wandb_logs";

/// Default number of seconds to wait between cycles
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default number of most recent lines requested per job
pub const DEFAULT_MAX_LINES: u32 = 10_000;

/// File name of the crawler's own log inside the store root
const PROCESS_LOG_FILE: &str = "crawler.log";

/// Crawler configuration
///
/// Built once at startup and handed to the poller; nothing is read from
/// the environment after that.
#[derive(Debug, Clone)]
pub struct Config {
    /// Account (entity) owning the project
    pub entity: String,

    /// Project whose running jobs are crawled
    pub project: String,

    /// Root directory of the log store
    pub store_path: PathBuf,

    /// How long to wait after a cycle before starting the next one
    pub poll_interval: Duration,

    /// GraphQL endpoint of the tracking service
    pub api_url: String,

    /// Optional API key for private projects
    pub api_key: Option<String>,

    /// Maximum number of recent lines fetched per job and cycle
    pub max_lines: u32,

    /// Where the crawler writes its own log; defaults to the store root
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(entity: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            project: project.into(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            poll_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            api_url: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            max_lines: DEFAULT_MAX_LINES,
            log_file: None,
        }
    }

    /// Path of the crawler's own log file
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.store_path.join(PROCESS_LOG_FILE))
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.entity.trim().is_empty() {
            anyhow::bail!("entity cannot be empty");
        }

        if self.project.trim().is_empty() {
            anyhow::bail!("project cannot be empty");
        }

        if self.store_path.as_os_str().is_empty() {
            anyhow::bail!("store_path cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_lines == 0 {
            anyhow::bail!("max_lines must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new("team", "project");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_lines, 10_000);
        assert_eq!(config.api_url, "https://api.wandb.ai/graphql");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("team", "project");

        config.entity = " ".to_string();
        assert!(config.validate().is_err());
        config.entity = "team".to_string();

        config.api_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.api_url = "http://localhost:8080/graphql".to_string();
        assert!(config.validate().is_ok());

        config.poll_interval = Duration::from_millis(500);
        assert!(config.validate().is_err());
        config.poll_interval = Duration::from_secs(1);

        config.max_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_file_defaults_to_store_root() {
        let mut config = Config::new("team", "project");
        config.store_path = PathBuf::from("/var/lib/crawler");
        assert_eq!(
            config.log_file_path(),
            PathBuf::from("/var/lib/crawler/crawler.log")
        );

        config.log_file = Some(PathBuf::from("/tmp/other.log"));
        assert_eq!(config.log_file_path(), PathBuf::from("/tmp/other.log"));
    }
}
