//! Configuration file support.
//!
//! Loads settings from `~/.config/dxcluster-client/config.toml` on
//! Linux (or platform-appropriate location on other OSes).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{CLUSTER_HOST, CLUSTER_PORT, ConnectConfig, FEED_HOST, FEED_PORT, MonitorConfig};
use crate::dialect::ClusterDialect;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Callsign to use for feed login.
    pub callsign: String,

    /// Submission node hostname.
    pub host: String,

    /// Submission node port.
    pub port: u16,

    /// Feed node hostname for monitoring.
    pub feed_host: String,

    /// Feed node port.
    pub feed_port: u16,

    /// Per-attempt connection timeout in seconds.
    pub connect_timeout: u64,

    /// Total connection attempts before giving up.
    pub connect_attempts: u32,

    /// Per-wait response timeout in seconds.
    pub wait_timeout: u64,

    /// Feed read inactivity timeout in seconds.
    pub read_timeout: u64,

    /// Whether to automatically reconnect the feed on disconnect.
    pub reconnect: bool,

    /// Delay between feed reconnection attempts in seconds.
    pub reconnect_delay: u64,

    /// Print statistics every N seconds.
    pub stats_interval: u64,

    /// Enable Prometheus metrics HTTP endpoint.
    pub metrics_enabled: bool,

    /// Port for Prometheus metrics HTTP endpoint.
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            callsign: "N0CALL".to_string(),
            host: CLUSTER_HOST.to_string(),
            port: CLUSTER_PORT,
            feed_host: FEED_HOST.to_string(),
            feed_port: FEED_PORT,
            connect_timeout: 3,
            connect_attempts: 5,
            wait_timeout: 10,
            read_timeout: 120,
            reconnect: true,
            reconnect_delay: 5,
            stats_interval: 30,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Invalid TOML in config file: {}", path.display()))
            }
            _ => Ok(Config::default()),
        }
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dxcluster-client/config.toml"))
    }

    /// Validate all configuration settings.
    pub fn validate(&self) -> Result<()> {
        if self.callsign.trim().is_empty() {
            anyhow::bail!("callsign must not be empty");
        }
        if self.connect_attempts == 0 {
            anyhow::bail!("connect_attempts must be at least 1");
        }
        if self.connect_timeout == 0 || self.wait_timeout == 0 {
            anyhow::bail!("timeouts must be at least 1 second");
        }
        Ok(())
    }

    /// Connection settings for the submission node.
    pub fn connect_config(&self) -> ConnectConfig {
        ConnectConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            attempts: self.connect_attempts,
        }
    }

    /// Monitoring settings for the feed node.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            host: self.feed_host.clone(),
            port: self.feed_port,
            callsign: self.callsign.clone(),
            read_timeout: Duration::from_secs(self.read_timeout),
            auto_reconnect: self.reconnect,
            reconnect_delay: Duration::from_secs(self.reconnect_delay),
            ..Default::default()
        }
    }

    /// The node dialect with this config's wait timeout applied.
    pub fn dialect(&self) -> ClusterDialect {
        ClusterDialect::default().with_wait_timeout(Duration::from_secs(self.wait_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.callsign, "N0CALL");
        assert_eq!(config.host, CLUSTER_HOST);
        assert_eq!(config.port, CLUSTER_PORT);
        assert_eq!(config.feed_host, FEED_HOST);
        assert_eq!(config.connect_attempts, 5);
        assert!(config.reconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            callsign = "4X5BR-1"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.callsign, "4X5BR-1");
        // Other fields should use defaults
        assert_eq!(config.host, CLUSTER_HOST);
        assert_eq!(config.wait_timeout, 10);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            callsign = "4X5BR-1"
            host = "custom.node.net"
            port = 7301
            feed_host = "feed.node.net"
            feed_port = 7302
            connect_timeout = 5
            connect_attempts = 3
            wait_timeout = 8
            read_timeout = 180
            reconnect = false
            reconnect_delay = 10
            stats_interval = 60
            metrics_enabled = true
            metrics_port = 9091
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.callsign, "4X5BR-1");
        assert_eq!(config.host, "custom.node.net");
        assert_eq!(config.port, 7301);
        assert_eq!(config.feed_host, "feed.node.net");
        assert_eq!(config.feed_port, 7302);
        assert_eq!(config.connect_timeout, 5);
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.wait_timeout, 8);
        assert_eq!(config.read_timeout, 180);
        assert!(!config.reconnect);
        assert!(config.metrics_enabled);
        assert_eq!(config.metrics_port, 9091);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config {
            callsign: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.callsign = "4X5BR-1".to_string();
        config.connect_attempts = 0;
        assert!(config.validate().is_err());

        config.connect_attempts = 5;
        config.wait_timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_configs() {
        let config = Config::default();

        let connect = config.connect_config();
        assert_eq!(connect.host, CLUSTER_HOST);
        assert_eq!(connect.connect_timeout, Duration::from_secs(3));
        assert_eq!(connect.attempts, 5);

        let monitor = config.monitor_config();
        assert_eq!(monitor.host, FEED_HOST);
        assert_eq!(monitor.callsign, "N0CALL");
        assert!(monitor.auto_reconnect);

        let dialect = config.dialect();
        assert_eq!(dialect.wait_timeout, Duration::from_secs(10));
    }
}
