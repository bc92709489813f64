//! Static registry of the metrics published for every iLO.

use serde::Serialize;

use crate::ilo::accessors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricEntry {
    pub metric_id: &'static str,
    pub display_label: &'static str,
    /// Name of the session accessor producing the value
    pub accessor: &'static str,
}

const fn entry(metric_id: &'static str, display_label: &'static str, accessor: &'static str) -> MetricEntry {
    MetricEntry {
        metric_id,
        display_label,
        accessor,
    }
}

/// Display order is slice order.
pub static METRIC_REGISTRY: &[MetricEntry] = &[
    entry("server_name", "Server Name", GET_SERVER_NAME),
    entry("server_fqdn", "Server FQDN", GET_SERVER_FQDN),
    entry("server_host_data", "Server Host Data", GET_HOST_DATA),
    entry("server_power_status", "Server Power State", GET_HOST_POWER_STATUS),
    entry("server_power_readings", "Server Power Readings", GET_POWER_READINGS),
    entry("server_asset_tag", "Server Asset Tag", GET_ASSET_TAG),
    entry("server_uid_status", "Server UID Light", GET_UID_STATUS),
    entry("server_health", "Server Health", GET_EMBEDDED_HEALTH),
    entry("server_fan_speed", "Server Fan Speed", GET_FAN_SPEEDS),
    entry("server_temperature", "Server Temperature", GET_TEMPERATURES),
    entry("server_fw_version", "iLO Firmware Version", GET_FW_VERSION),
    entry("network_settings", "Network Settings", GET_NETWORK_SETTINGS),
];

pub fn lookup(metric_id: &str) -> Option<&'static MetricEntry> {
    METRIC_REGISTRY.iter().find(|e| e.metric_id == metric_id)
}
