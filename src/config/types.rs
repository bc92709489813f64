//! Agent configuration structs and defaults.

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::ilo::{ConnectionDescriptor, IloError, RedfishConnector, DEFAULT_PORT};
use crate::metrics::{DEFAULT_DEVICE_NAME, DEFAULT_MIN_REFRESH_INTERVAL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent: AgentSettings,
    pub ilo: IloSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Prefix of every metric label
    #[serde(default = "default_device_name")]
    pub name: String,
    /// Seconds between two polls of the metric views
    #[serde(default = "default_scan_interval")]
    pub scan_interval: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where to write the readings as JSON after every poll (optional)
    #[serde(default)]
    pub snapshot_file: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct IloSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Seconds between two connection attempts
    #[serde(default = "default_min_refresh_interval")]
    pub min_refresh_interval: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: f64,
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

pub fn default_device_name() -> String { DEFAULT_DEVICE_NAME.to_string() }
pub fn default_scan_interval() -> f64 { 30.0 }
pub fn default_log_level() -> String { "INFO".to_string() }
pub fn default_port() -> u16 { DEFAULT_PORT }
pub fn default_min_refresh_interval() -> f64 { DEFAULT_MIN_REFRESH_INTERVAL.as_secs_f64() }
pub fn default_request_timeout() -> f64 { 20.0 }
pub fn default_accept_invalid_certs() -> bool { true }

/// Seconds from the config file to a Duration, falling back on garbage.
fn seconds(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(fallback))
}

impl AgentSettings {
    pub fn scan_interval(&self) -> Duration {
        seconds(self.scan_interval, default_scan_interval())
    }
}

impl IloSettings {
    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::new(&self.host, self.port, &self.username, &self.password)
    }

    pub fn min_refresh_interval(&self) -> Duration {
        // zero is a legal choice here: no throttling at all
        Duration::try_from_secs_f64(self.min_refresh_interval).unwrap_or(DEFAULT_MIN_REFRESH_INTERVAL)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout, default_request_timeout())
    }

    pub fn build_connector(&self) -> Result<RedfishConnector, IloError> {
        RedfishConnector::builder()
            .timeout(self.request_timeout())
            .accept_invalid_certs(self.accept_invalid_certs)
            .build()
    }
}

impl fmt::Debug for IloSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IloSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl AgentConfig {
    /// Copy safe to print: password masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.ilo.password.is_empty() {
            copy.ilo.password = "********".to_string();
        }
        copy
    }

    /// Enough to attempt a connection.
    pub fn validate(&self) -> Result<()> {
        if self.ilo.host.trim().is_empty() {
            return Err(anyhow!("iLO host is not configured"));
        }
        if self.ilo.username.is_empty() {
            return Err(anyhow!("iLO username is not configured"));
        }
        if self.ilo.port == 0 {
            return Err(anyhow!("iLO port must be between 1 and 65535"));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent: AgentSettings {
                name: default_device_name(),
                scan_interval: default_scan_interval(),
                log_level: default_log_level(),
                snapshot_file: None,
            },
            ilo: IloSettings {
                host: String::new(),
                port: default_port(),
                username: String::new(),
                password: String::new(),
                min_refresh_interval: default_min_refresh_interval(),
                request_timeout: default_request_timeout(),
                accept_invalid_certs: default_accept_invalid_certs(),
            },
        }
    }
}
