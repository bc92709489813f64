//! Redfish resource extraction for the named iLO accessors.
//! Each function takes the raw JSON of a Redfish resource and returns the
//! value the accessor publishes, shaped like the classic iLO RIBCL replies.

use serde_json::{json, Map, Value};

use crate::ilo::IloError;

pub const GET_SERVER_NAME: &str = "get_server_name";
pub const GET_SERVER_FQDN: &str = "get_server_fqdn";
pub const GET_HOST_DATA: &str = "get_host_data";
pub const GET_HOST_POWER_STATUS: &str = "get_host_power_status";
pub const GET_POWER_READINGS: &str = "get_power_readings";
pub const GET_ASSET_TAG: &str = "get_asset_tag";
pub const GET_UID_STATUS: &str = "get_uid_status";
pub const GET_EMBEDDED_HEALTH: &str = "get_embedded_health";
pub const GET_FAN_SPEEDS: &str = "get_fan_speeds";
pub const GET_TEMPERATURES: &str = "get_temperatures";
pub const GET_FW_VERSION: &str = "get_fw_version";
pub const GET_NETWORK_SETTINGS: &str = "get_network_settings";

fn field<'a>(resource: &'a Value, pointer: &str) -> Option<&'a Value> {
    resource.pointer(pointer).filter(|v| !v.is_null())
}

fn optional(resource: &Value, pointer: &str) -> Value {
    field(resource, pointer).cloned().unwrap_or(Value::Null)
}

fn required(resource: &Value, pointer: &str, url: &str) -> Result<Value, IloError> {
    field(resource, pointer)
        .cloned()
        .ok_or_else(|| IloError::protocol(url, format!("missing key {}", pointer)))
}

fn required_str<'a>(resource: &'a Value, pointer: &str, url: &str) -> Result<&'a str, IloError> {
    field(resource, pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| IloError::protocol(url, format!("key {} should be a string", pointer)))
}

/// Entries whose sensor is not populated (empty fan bay, missing DIMM probe).
fn is_absent(item: &Value) -> bool {
    field(item, "/Status/State").and_then(Value::as_str) == Some("Absent")
}

/// iLO 4 names fans `FanName`, later firmware uses `Name`.
fn item_name(item: &Value, index: usize) -> String {
    field(item, "/Name")
        .or_else(|| field(item, "/FanName"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Sensor {}", index + 1))
}

fn health_rank(health: &str) -> u8 {
    match health {
        "OK" => 0,
        "Warning" => 1,
        _ => 2,
    }
}

/// Worst `Status.Health` among present items, or null if nothing reports health.
fn health_rollup(items: &[Value]) -> Value {
    items
        .iter()
        .filter(|item| !is_absent(item))
        .filter_map(|item| field(item, "/Status/Health").and_then(Value::as_str))
        .max_by_key(|health| health_rank(health))
        .map(|health| Value::String(health.to_string()))
        .unwrap_or(Value::Null)
}

fn array<'a>(resource: &'a Value, key: &str) -> &'a [Value] {
    resource
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn server_name(system: &Value, url: &str) -> Result<Value, IloError> {
    required(system, "/HostName", url)
}

pub fn asset_tag(system: &Value, url: &str) -> Result<Value, IloError> {
    required(system, "/AssetTag", url)
}

pub fn host_power_status(system: &Value, url: &str) -> Result<Value, IloError> {
    let state = required_str(system, "/PowerState", url)?;
    let status = match state {
        "On" => "ON".to_string(),
        "Off" => "OFF".to_string(),
        other => other.to_uppercase(),
    };
    Ok(Value::String(status))
}

pub fn uid_status(system: &Value, url: &str) -> Result<Value, IloError> {
    let led = required_str(system, "/IndicatorLED", url)?;
    let status = match led {
        "Lit" => "ON".to_string(),
        "Blinking" => "BLINKING".to_string(),
        "Off" => "OFF".to_string(),
        other => other.to_uppercase(),
    };
    Ok(Value::String(status))
}

pub fn host_data(system: &Value) -> Value {
    json!({
        "manufacturer": optional(system, "/Manufacturer"),
        "model": optional(system, "/Model"),
        "serial_number": optional(system, "/SerialNumber"),
        "sku": optional(system, "/SKU"),
        "bios_version": optional(system, "/BiosVersion"),
    })
}

pub fn power_readings(power: &Value, url: &str) -> Result<Value, IloError> {
    let control = required(power, "/PowerControl/0", url)?;
    Ok(json!({
        "present_power_reading": optional(&control, "/PowerConsumedWatts"),
        "average_power_reading": optional(&control, "/PowerMetrics/AverageConsumedWatts"),
        "maximum_power_reading": optional(&control, "/PowerMetrics/MaxConsumedWatts"),
        "minimum_power_reading": optional(&control, "/PowerMetrics/MinConsumedWatts"),
    }))
}

pub fn fan_speeds(thermal: &Value) -> Value {
    let mut fans = Map::new();
    for (index, fan) in array(thermal, "Fans").iter().enumerate() {
        if is_absent(fan) {
            continue;
        }
        // iLO 4 reports CurrentReading/Units instead of Reading/ReadingUnits
        let reading = field(fan, "/Reading")
            .or_else(|| field(fan, "/CurrentReading"))
            .cloned()
            .unwrap_or(Value::Null);
        let units = field(fan, "/ReadingUnits")
            .or_else(|| field(fan, "/Units"))
            .cloned()
            .unwrap_or(Value::Null);
        fans.insert(
            item_name(fan, index),
            json!({
                "reading": reading,
                "units": units,
                "health": optional(fan, "/Status/Health"),
            }),
        );
    }
    Value::Object(fans)
}

pub fn temperatures(thermal: &Value) -> Value {
    let mut sensors = Map::new();
    for (index, sensor) in array(thermal, "Temperatures").iter().enumerate() {
        if is_absent(sensor) {
            continue;
        }
        sensors.insert(
            item_name(sensor, index),
            json!({
                "reading_celsius": optional(sensor, "/ReadingCelsius"),
                "upper_critical": optional(sensor, "/UpperThresholdCritical"),
                "health": optional(sensor, "/Status/Health"),
            }),
        );
    }
    Value::Object(sensors)
}

pub fn embedded_health(system: &Value, thermal: &Value) -> Value {
    json!({
        "system": field(system, "/Status/HealthRollup")
            .or_else(|| field(system, "/Status/Health"))
            .cloned()
            .unwrap_or(Value::Null),
        "processors": field(system, "/ProcessorSummary/Status/HealthRollup")
            .or_else(|| field(system, "/ProcessorSummary/Status/Health"))
            .cloned()
            .unwrap_or(Value::Null),
        "memory": field(system, "/MemorySummary/Status/HealthRollup")
            .or_else(|| field(system, "/MemorySummary/Status/Health"))
            .cloned()
            .unwrap_or(Value::Null),
        "fans": health_rollup(array(thermal, "Fans")),
        "temperature": health_rollup(array(thermal, "Temperatures")),
    })
}

pub fn fw_version(manager: &Value, url: &str) -> Result<Value, IloError> {
    Ok(json!({
        "firmware_version": required(manager, "/FirmwareVersion", url)?,
        "model": optional(manager, "/Model"),
    }))
}

pub fn server_fqdn(nic: &Value, url: &str) -> Result<Value, IloError> {
    required(nic, "/FQDN", url)
}

pub fn network_settings(nic: &Value) -> Value {
    let dhcp_enabled = field(nic, "/IPv4Addresses/0/AddressOrigin")
        .and_then(Value::as_str)
        .map(|origin| origin == "DHCP")
        .map(Value::Bool)
        .unwrap_or(Value::Null);
    json!({
        "hostname": optional(nic, "/HostName"),
        "fqdn": optional(nic, "/FQDN"),
        "mac_address": optional(nic, "/MACAddress"),
        "ipv4_address": optional(nic, "/IPv4Addresses/0/Address"),
        "subnet_mask": optional(nic, "/IPv4Addresses/0/SubnetMask"),
        "gateway": optional(nic, "/IPv4Addresses/0/Gateway"),
        "dhcp_enabled": dhcp_enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://ilo.test/redfish/v1/Systems/1/";

    fn system() -> Value {
        json!({
            "HostName": "dl380-01",
            "AssetTag": "RACK7-U12",
            "PowerState": "On",
            "IndicatorLED": "Off",
            "Manufacturer": "HPE",
            "Model": "ProLiant DL380 Gen10",
            "SerialNumber": "CZ2D1X0ABC",
            "SKU": "868703-B21",
            "BiosVersion": "U30 v2.72",
            "Status": { "Health": "OK", "HealthRollup": "Warning", "State": "Enabled" },
            "ProcessorSummary": { "Count": 2, "Status": { "HealthRollup": "OK" } },
            "MemorySummary": { "Status": { "HealthRollup": "OK" } }
        })
    }

    fn thermal() -> Value {
        json!({
            "Fans": [
                { "Name": "Fan 1", "Reading": 29, "ReadingUnits": "Percent",
                  "Status": { "Health": "OK", "State": "Enabled" } },
                { "Name": "Fan 2", "Reading": 31, "ReadingUnits": "Percent",
                  "Status": { "Health": "Warning", "State": "Enabled" } },
                { "Name": "Fan 3", "Status": { "State": "Absent" } }
            ],
            "Temperatures": [
                { "Name": "01-Inlet Ambient", "ReadingCelsius": 21, "UpperThresholdCritical": 42,
                  "Status": { "Health": "OK", "State": "Enabled" } },
                { "Name": "02-CPU 1", "ReadingCelsius": 40, "UpperThresholdCritical": 70,
                  "Status": { "Health": "OK", "State": "Enabled" } }
            ]
        })
    }

    #[test]
    fn test_power_status_is_upper_cased() {
        assert_eq!(host_power_status(&system(), URL).unwrap(), json!("ON"));
        let off = json!({ "PowerState": "Off" });
        assert_eq!(host_power_status(&off, URL).unwrap(), json!("OFF"));
        let transitioning = json!({ "PowerState": "PoweringOn" });
        assert_eq!(host_power_status(&transitioning, URL).unwrap(), json!("POWERINGON"));
    }

    #[test]
    fn test_missing_power_state_is_protocol_error() {
        let err = host_power_status(&json!({}), URL).unwrap_err();
        assert!(matches!(err, IloError::Protocol { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_uid_status_mapping() {
        assert_eq!(uid_status(&system(), URL).unwrap(), json!("OFF"));
        assert_eq!(uid_status(&json!({ "IndicatorLED": "Lit" }), URL).unwrap(), json!("ON"));
        assert_eq!(
            uid_status(&json!({ "IndicatorLED": "Blinking" }), URL).unwrap(),
            json!("BLINKING")
        );
    }

    #[test]
    fn test_fan_speeds_skip_absent_fans() {
        let fans = fan_speeds(&thermal());
        let fans = fans.as_object().unwrap();
        assert_eq!(fans.len(), 2);
        assert_eq!(fans["Fan 1"]["reading"], json!(29));
        assert_eq!(fans["Fan 1"]["units"], json!("Percent"));
        assert_eq!(fans["Fan 2"]["health"], json!("Warning"));
        assert!(!fans.contains_key("Fan 3"));
    }

    #[test]
    fn test_fan_speeds_ilo4_field_names() {
        let ilo4 = json!({
            "Fans": [ { "FanName": "Fan 1", "CurrentReading": 17, "Units": "Percent",
                        "Status": { "Health": "OK" } } ]
        });
        let fans = fan_speeds(&ilo4);
        assert_eq!(fans["Fan 1"]["reading"], json!(17));
        assert_eq!(fans["Fan 1"]["units"], json!("Percent"));
    }

    #[test]
    fn test_temperatures_keep_sensor_order() {
        let temps = temperatures(&thermal());
        let names: Vec<_> = temps.as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["01-Inlet Ambient", "02-CPU 1"]);
        assert_eq!(temps["02-CPU 1"]["reading_celsius"], json!(40));
        assert_eq!(temps["02-CPU 1"]["upper_critical"], json!(70));
    }

    #[test]
    fn test_embedded_health_reports_worst_fan() {
        let health = embedded_health(&system(), &thermal());
        assert_eq!(health["system"], json!("Warning"));
        assert_eq!(health["processors"], json!("OK"));
        assert_eq!(health["fans"], json!("Warning"));
        assert_eq!(health["temperature"], json!("OK"));
    }

    #[test]
    fn test_embedded_health_without_thermal_data() {
        let health = embedded_health(&json!({ "Status": { "Health": "OK" } }), &json!({}));
        assert_eq!(health["system"], json!("OK"));
        assert_eq!(health["fans"], Value::Null);
    }

    #[test]
    fn test_power_readings() {
        let power = json!({
            "PowerControl": [ {
                "PowerConsumedWatts": 182,
                "PowerMetrics": { "AverageConsumedWatts": 175, "MaxConsumedWatts": 240, "MinConsumedWatts": 160 }
            } ]
        });
        let readings = power_readings(&power, URL).unwrap();
        assert_eq!(readings["present_power_reading"], json!(182));
        assert_eq!(readings["maximum_power_reading"], json!(240));

        assert!(power_readings(&json!({ "PowerControl": [] }), URL).is_err());
    }

    #[test]
    fn test_network_settings() {
        let nic = json!({
            "HostName": "ilo-dl380-01",
            "FQDN": "ilo-dl380-01.lab.example",
            "MACAddress": "94:18:82:00:11:22",
            "IPv4Addresses": [ { "Address": "10.0.0.5", "SubnetMask": "255.255.255.0",
                                 "Gateway": "10.0.0.1", "AddressOrigin": "DHCP" } ]
        });
        let settings = network_settings(&nic);
        assert_eq!(settings["ipv4_address"], json!("10.0.0.5"));
        assert_eq!(settings["dhcp_enabled"], json!(true));
        assert_eq!(server_fqdn(&nic, URL).unwrap(), json!("ilo-dl380-01.lab.example"));
    }

    #[test]
    fn test_host_data_and_identity() {
        let data = host_data(&system());
        assert_eq!(data["model"], json!("ProLiant DL380 Gen10"));
        assert_eq!(data["serial_number"], json!("CZ2D1X0ABC"));
        assert_eq!(server_name(&system(), URL).unwrap(), json!("dl380-01"));
        assert_eq!(asset_tag(&system(), URL).unwrap(), json!("RACK7-U12"));
    }

    #[test]
    fn test_fw_version_requires_firmware() {
        let manager = json!({ "FirmwareVersion": "iLO 5 v2.78", "Model": "iLO 5" });
        assert_eq!(fw_version(&manager, URL).unwrap()["firmware_version"], json!("iLO 5 v2.78"));
        assert!(fw_version(&json!({ "Model": "iLO 5" }), URL).is_err());
    }
}
