//! iLO client seam: Connector/Session traits, connection descriptor, Redfish implementation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub mod accessors;
pub mod error;
pub mod redfish;

pub use error::IloError;
pub use redfish::{RedfishConnector, RedfishSession};

/// Default HTTPS port of the iLO web/Redfish interface
pub const DEFAULT_PORT: u16 = 443;

/// Where and how to reach one iLO.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectionDescriptor {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Establishes sessions with an iLO.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new session. Fails with LoginFailed, Communication or Protocol
    /// for the usual remote problems.
    async fn connect(&self, target: &ConnectionDescriptor) -> Result<Arc<dyn Session>, IloError>;
}

/// One established session. Accessors are addressed by name
/// (`get_host_power_status`, `get_fan_speeds`, ...) and take no arguments.
#[async_trait]
pub trait Session: Send + Sync {
    async fn invoke(&self, accessor: &str) -> Result<Value, IloError>;
}
