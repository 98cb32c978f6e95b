use chardev::config::{DEFAULT_CAPACITY, DEFAULT_NAME};
use chardev::{ConfigError, DeviceConfig};

#[test]
fn test_empty_object_gives_defaults() {
    let config = DeviceConfig::from_json_str("{}").unwrap();
    assert_eq!(config, DeviceConfig::default());
    assert_eq!(config.name, DEFAULT_NAME);
    assert_eq!(config.capacity, DEFAULT_CAPACITY);
    assert_eq!(config.device_count(), 1);
}

#[test]
fn test_from_reader() {
    let json = br#"{"name": "fifo", "capacity": 128, "num_devices": 3, "major": 200}"#;
    let config = DeviceConfig::from_reader(json.as_slice()).unwrap();

    assert_eq!(config.name, "fifo");
    assert_eq!(config.capacity, 128);
    assert_eq!(config.device_count(), 3);
    assert_eq!(config.major, 200);
    assert_eq!(config.node_name(2), "fifo2");
}

#[test]
fn test_zero_devices_coerced_to_one() {
    let config = DeviceConfig::from_json_str(r#"{"num_devices": 0}"#).unwrap();
    assert_eq!(config.num_devices, 0);
    assert_eq!(config.device_count(), 1);
}

#[test]
fn test_zero_capacity_rejected() {
    let result = DeviceConfig::from_json_str(r#"{"capacity": 0}"#);
    assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
}

#[test]
fn test_empty_name_rejected() {
    let result = DeviceConfig::from_json_str(r#"{"name": ""}"#);
    assert!(matches!(result, Err(ConfigError::EmptyName)));
}

#[test]
fn test_unknown_field_rejected() {
    let result = DeviceConfig::from_json_str(r#"{"size": 10}"#);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_invalid_json_rejected() {
    let result = DeviceConfig::from_reader(b"{not json".as_slice());
    let err = result.unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().starts_with("failed to parse config JSON"));
}
