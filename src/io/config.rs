//! Printer configuration loading
//!
//! A configuration file maps each printer name to its connection details:
//!
//! ```yaml
//! mk4-1:
//!   host: http://192.168.0.21
//!   username: maker
//!   password: api-key
//!   printer_type: MK4
//! ```
//!
//! JSON and YAML are supported, chosen by file suffix.

use crate::models::DeviceConfig;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match extension.as_str() {
            "json" | "jso" | "jsn" => Some(ConfigFormat::Json),
            "yml" | "yaml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

/// Load every configured device from a JSON or YAML file, sorted by name
pub fn load_devices<P: AsRef<Path>>(path: P) -> Result<Vec<DeviceConfig>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "Configuration file does not exist: {}",
            path.display()
        )));
    }

    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        Error::Config("only JSON and YAML configuration files are supported".to_string())
    })?;

    let contents = fs::read_to_string(path)?;
    parse_devices(&contents, format).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

fn parse_devices(contents: &str, format: ConfigFormat) -> Result<Vec<DeviceConfig>> {
    let devices: BTreeMap<String, DeviceConfig> = match format {
        ConfigFormat::Json => {
            serde_json::from_str(contents).map_err(|e| Error::Config(e.to_string()))?
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?
        }
    };

    let devices: Vec<DeviceConfig> = devices
        .into_iter()
        .map(|(name, mut device)| {
            device.name = name;
            device
        })
        .collect();

    for device in &devices {
        if device.host.trim().is_empty() {
            return Err(Error::Config(format!(
                "printer '{}' has an empty host",
                device.name
            )));
        }
    }

    log::debug!("Loaded {} printer configurations", devices.len());
    Ok(devices)
}
