//! Integration tests for printer configuration files

use link_sync::io::config::load_devices;
use link_sync::{DeviceFamily, Error};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_json_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("printers.json");
    fs::write(
        &path,
        r#"{
            "mk4-2": {"host": "http://10.0.0.12", "username": "maker", "password": "b", "printer_type": "MK4"},
            "mk4-1": {"host": "http://10.0.0.11", "username": "maker", "password": "a", "printer_type": "MK4"}
        }"#,
    )
    .unwrap();

    let devices = load_devices(&path).unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].name, "mk4-1");
    assert_eq!(devices[0].host, "http://10.0.0.11");
    assert_eq!(devices[1].name, "mk4-2");
    assert_eq!(devices[1].family, DeviceFamily::PrusaLink);
}

#[test]
fn test_load_yaml_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("printers.yml");
    fs::write(
        &path,
        "xl:\n  host: http://10.0.0.20\n  username: maker\n  password: secret\n  printer_type: XL\n",
    )
    .unwrap();

    let devices = load_devices(&path).unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "xl");
    assert_eq!(devices[0].printer_type, "XL");
}

#[test]
fn test_password_is_not_printed_in_debug_output() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("printers.yaml");
    fs::write(
        &path,
        "mk4:\n  host: http://10.0.0.1\n  username: maker\n  password: hunter2\n  printer_type: MK4\n",
    )
    .unwrap();

    let devices = load_devices(&path).unwrap();
    let debug = format!("{:?}", devices[0]);

    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("mk4"));
}

#[test]
fn test_unsupported_suffix_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("printers.toml");
    fs::write(&path, "[mk4]\nhost = \"http://10.0.0.1\"\n").unwrap();

    let result = load_devices(&path);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_missing_file_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();

    let result = load_devices(temp_dir.path().join("absent.json"));

    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("printers.json");
    fs::write(&path, "{ not json").unwrap();

    match load_devices(&path) {
        Err(Error::Config(message)) => assert!(message.contains("printers.json")),
        other => panic!("expected a config error, got {other:?}"),
    }
}
