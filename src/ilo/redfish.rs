//! iLO client over the Redfish REST API (iLO 4 2.30+, iLO 5, iLO 6).
//! Every request carries HTTP basic auth, so a session is just the HTTP
//! client plus the resource paths discovered at connect time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, trace};

use crate::ilo::accessors::{self, *};
use crate::ilo::{ConnectionDescriptor, Connector, IloError, Session};

pub const REDFISH_ENDPOINT: &str = "/redfish/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug)]
pub struct RedfishConnectorBuilder {
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl RedfishConnectorBuilder {
    /// Overwrites the timeout applied to every request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// iLOs ship with self-signed certificates, so these are accepted unless
    /// the operator has installed a proper one.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> Result<RedfishConnector, IloError> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .timeout(self.timeout)
            .build()
            .map_err(|e| IloError::ClientSetup(e.into()))?;
        Ok(RedfishConnector { http_client })
    }
}

#[derive(Debug, Clone)]
pub struct RedfishConnector {
    http_client: reqwest::Client,
}

impl RedfishConnector {
    pub fn builder() -> RedfishConnectorBuilder {
        RedfishConnectorBuilder {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
        }
    }
}

#[async_trait]
impl Connector for RedfishConnector {
    async fn connect(&self, target: &ConnectionDescriptor) -> Result<Arc<dyn Session>, IloError> {
        let client = RedfishHttpClient {
            http_client: self.http_client.clone(),
            target: target.clone(),
        };
        let session = RedfishSession::discover(Arc::new(client)).await?;
        debug!(
            "Connected to iLO {}: system={} manager={} chassis={}",
            target, session.system, session.manager, session.chassis
        );
        Ok(Arc::new(session))
    }
}

/// Read side of the Redfish API the session works against.
#[async_trait]
trait ResourceReader: Send + Sync {
    /// Full URL of `api`, used in error messages.
    fn url(&self, api: &str) -> String;

    async fn get(&self, api: &str) -> Result<Value, IloError>;
}

/// `api` is either an absolute `@odata.id` path or relative to the service root.
fn resource_path(api: &str) -> String {
    if api.starts_with('/') {
        api.to_string()
    } else {
        format!("{}/{}", REDFISH_ENDPOINT, api)
    }
}

/// The first `Members[].@odata.id` of a collection.
fn first_member(collection: &Value, url: &str) -> Result<String, IloError> {
    collection
        .pointer("/Members/0/@odata.id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| IloError::protocol(url, "collection has no members"))
}

async fn resolve_first_member(reader: &dyn ResourceReader, collection: &str) -> Result<String, IloError> {
    let body = reader.get(collection).await?;
    first_member(&body, &reader.url(collection))
}

/// HTTP plumbing for one iLO endpoint.
struct RedfishHttpClient {
    http_client: reqwest::Client,
    target: ConnectionDescriptor,
}

#[async_trait]
impl ResourceReader for RedfishHttpClient {
    fn url(&self, api: &str) -> String {
        format!("https://{}:{}{}", self.target.host, self.target.port, resource_path(api))
    }

    async fn get(&self, api: &str) -> Result<Value, IloError> {
        let url = self.url(api);
        trace!("TX GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .basic_auth(&self.target.username, Some(&self.target.password))
            .send()
            .await
            .map_err(|e| IloError::communication(&url, e))?;

        let status = response.status();
        // read the body even on errors, iLO puts extended messages in it
        let body = response
            .text()
            .await
            .map_err(|e| IloError::communication(&url, e))?;
        trace!("RX {} {}", status, body);

        check_status(&url, status, &body)?;
        serde_json::from_str(&body)
            .map_err(|e| IloError::protocol(&url, format!("invalid JSON body: {}", e)))
    }
}

/// Map an HTTP status to the iLO error taxonomy.
fn check_status(url: &str, status: StatusCode, body: &str) -> Result<(), IloError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(IloError::LoginFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/@Message.ExtendedInfo/0/MessageId")
                    .or_else(|| v.pointer("/error/message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        let message = match detail {
            Some(detail) => format!("HTTP {} ({})", status, detail),
            None => format!("HTTP {}", status),
        };
        return Err(IloError::protocol(url, message));
    }
    Ok(())
}

pub struct RedfishSession {
    reader: Arc<dyn ResourceReader>,
    system: String,
    manager: String,
    chassis: String,
}

impl RedfishSession {
    /// Resolve the system, manager and chassis this session reads from.
    async fn discover(reader: Arc<dyn ResourceReader>) -> Result<Self, IloError> {
        let system = resolve_first_member(reader.as_ref(), "Systems").await?;
        let manager = resolve_first_member(reader.as_ref(), "Managers").await?;
        let chassis = resolve_first_member(reader.as_ref(), "Chassis").await?;
        Ok(Self {
            reader,
            system,
            manager,
            chassis,
        })
    }

    async fn manager_nic(&self) -> Result<(String, Value), IloError> {
        let nics = self.sub_resource(&self.manager, "EthernetInterfaces");
        let nic = resolve_first_member(self.reader.as_ref(), &nics).await?;
        let body = self.reader.get(&nic).await?;
        Ok((self.reader.url(&nic), body))
    }

    fn sub_resource(&self, base: &str, name: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

#[async_trait]
impl Session for RedfishSession {
    async fn invoke(&self, accessor: &str) -> Result<Value, IloError> {
        debug!("Invoking iLO accessor {}", accessor);
        let reader = self.reader.as_ref();
        let system_url = reader.url(&self.system);

        match accessor {
            GET_SERVER_NAME => accessors::server_name(&reader.get(&self.system).await?, &system_url),
            GET_ASSET_TAG => accessors::asset_tag(&reader.get(&self.system).await?, &system_url),
            GET_HOST_POWER_STATUS => {
                accessors::host_power_status(&reader.get(&self.system).await?, &system_url)
            }
            GET_UID_STATUS => accessors::uid_status(&reader.get(&self.system).await?, &system_url),
            GET_HOST_DATA => Ok(accessors::host_data(&reader.get(&self.system).await?)),
            GET_POWER_READINGS => {
                let power = self.sub_resource(&self.chassis, "Power");
                accessors::power_readings(&reader.get(&power).await?, &reader.url(&power))
            }
            GET_FAN_SPEEDS => {
                let thermal = self.sub_resource(&self.chassis, "Thermal");
                Ok(accessors::fan_speeds(&reader.get(&thermal).await?))
            }
            GET_TEMPERATURES => {
                let thermal = self.sub_resource(&self.chassis, "Thermal");
                Ok(accessors::temperatures(&reader.get(&thermal).await?))
            }
            GET_EMBEDDED_HEALTH => {
                let system = reader.get(&self.system).await?;
                let thermal = self.sub_resource(&self.chassis, "Thermal");
                let thermal = reader.get(&thermal).await?;
                Ok(accessors::embedded_health(&system, &thermal))
            }
            GET_FW_VERSION => accessors::fw_version(&reader.get(&self.manager).await?, &reader.url(&self.manager)),
            GET_SERVER_FQDN => {
                let (url, nic) = self.manager_nic().await?;
                accessors::server_fqdn(&nic, &url)
            }
            GET_NETWORK_SETTINGS => {
                let (_, nic) = self.manager_nic().await?;
                Ok(accessors::network_settings(&nic))
            }
            other => Err(IloError::UnknownAccessor(other.to_string())),
        }
    }
}
