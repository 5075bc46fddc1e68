//! Data models for local files, device configuration, sync actions and results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A local file considered for synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileEntry {
    /// Forward-slash path relative to the relative-to root
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    /// Seconds since the Unix epoch
    pub modified: i64,
}

/// API family spoken by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    #[default]
    PrusaLink,
}

impl DeviceFamily {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceFamily::PrusaLink => "prusalink",
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details for one configured printer
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub name: String,
    pub host: String,
    pub username: String,
    pub password: String,
    /// Printer model tag (MK4, XL, ...), informational only
    pub printer_type: String,
    #[serde(default)]
    pub family: DeviceFamily,
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("printer_type", &self.printer_type)
            .field("family", &self.family)
            .finish()
    }
}

/// Coarse device state used to gate file operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Idle,
    Busy,
    Unknown,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Idle => f.write_str("idle"),
            DeviceState::Busy => f.write_str("busy"),
            DeviceState::Unknown => f.write_str("unknown"),
        }
    }
}

/// One step of a reconciliation plan
///
/// Remote paths are display paths relative to the device storage root,
/// destination prefix included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    CreateFolder {
        remote_path: String,
    },
    Upload {
        local_path: PathBuf,
        remote_path: String,
        /// True when an out-of-date remote file is being refreshed
        replaces_existing: bool,
    },
    Delete {
        remote_path: String,
    },
}

impl SyncAction {
    #[must_use]
    pub fn remote_path(&self) -> &str {
        match self {
            SyncAction::CreateFolder { remote_path }
            | SyncAction::Upload { remote_path, .. }
            | SyncAction::Delete { remote_path } => remote_path,
        }
    }

    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            SyncAction::CreateFolder { .. } => "create folder",
            SyncAction::Upload {
                replaces_existing: true,
                ..
            } => "refresh",
            SyncAction::Upload { .. } => "upload",
            SyncAction::Delete { .. } => "delete",
        }
    }
}

/// Number of actions per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub folders: u32,
    pub uploads: u32,
    pub refreshes: u32,
    pub deletes: u32,
}

impl ActionCounts {
    pub fn record(&mut self, action: &SyncAction) {
        match action {
            SyncAction::CreateFolder { .. } => self.folders += 1,
            SyncAction::Upload {
                replaces_existing: true,
                ..
            } => self.refreshes += 1,
            SyncAction::Upload { .. } => self.uploads += 1,
            SyncAction::Delete { .. } => self.deletes += 1,
        }
    }

    #[must_use]
    pub fn from_actions(actions: &[SyncAction]) -> Self {
        let mut counts = Self::default();
        for action in actions {
            counts.record(action);
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.folders + self.uploads + self.refreshes + self.deletes
    }
}

/// A single action that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub path: String,
    pub message: String,
}

/// Terminal outcome of a device task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncStatus {
    Done,
    Skipped { state: DeviceState },
    Failed,
}

/// Result of synchronizing one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub device: String,
    #[serde(flatten)]
    pub status: SyncStatus,
    pub dry_run: bool,
    pub planned: ActionCounts,
    pub applied: ActionCounts,
    pub actions: Vec<SyncAction>,
    pub action_errors: Vec<ActionError>,
    pub error: Option<String>,
}

impl SyncResult {
    #[must_use]
    pub fn new(device: &str, dry_run: bool) -> Self {
        Self {
            device: device.to_string(),
            status: SyncStatus::Done,
            dry_run,
            planned: ActionCounts::default(),
            applied: ActionCounts::default(),
            actions: Vec::new(),
            action_errors: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(device: &str, dry_run: bool, error: String) -> Self {
        Self {
            status: SyncStatus::Failed,
            error: Some(error),
            ..Self::new(device, dry_run)
        }
    }

    /// True when the device failed or any action could not be applied
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.status == SyncStatus::Failed || !self.action_errors.is_empty()
    }
}
