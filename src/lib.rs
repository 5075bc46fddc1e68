//! Printer Farm File Synchronization Library
//!
//! This library mirrors a local directory of print files onto the storage of
//! many networked printers at once. Each run scans the local tree once, then
//! for every selected printer fetches its current storage tree, computes the
//! folder creations, uploads and deletions needed to converge it, and applies
//! them (or only reports them in dry-run mode).

pub mod cli;
pub mod client;
pub mod io;
pub mod models;
pub mod services;

pub use client::{ClientRegistry, ClientResolver, DeviceClient};
pub use models::{
    ActionCounts, ActionError, DeviceConfig, DeviceFamily, DeviceState, LocalFileEntry,
    SyncAction, SyncResult, SyncStatus,
};
pub use services::local::LocalTree;
pub use services::orchestrate::{Orchestrator, RunReport};
pub use services::remote::{ListingEntry, RemoteTree};
pub use services::task::{DeviceSyncTask, TaskSettings};

use std::path::PathBuf;
use std::result;

/// Custom error type for the library
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    InvalidInput(String),
    Config(String),
    Transport(String),
    MalformedListing(String),
    System(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Transport(msg) => write!(f, "Transport error: {msg}"),
            Error::MalformedListing(msg) => write!(f, "Malformed listing: {msg}"),
            Error::System(msg) => write!(f, "System error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Options for one synchronization run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Local directory whose files are mirrored
    pub source: PathBuf,
    /// Local paths are made relative to this directory (defaults to `source`)
    pub relative_to: Option<PathBuf>,
    /// Folder inside the device storage that mirrors the source
    pub destination: String,
    /// Only files with one of these suffixes are considered; empty means all
    pub suffixes: Vec<String>,
    /// Perform mutating device calls; false means dry run
    pub execute: bool,
    /// Also process devices that are not idle
    pub ignore_state: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Worker pool size; `None` uses the available parallelism
    pub jobs: Option<usize>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            relative_to: None,
            destination: String::new(),
            suffixes: vec![".gcode".to_string()],
            execute: false,
            ignore_state: false,
            include: Vec::new(),
            exclude: Vec::new(),
            jobs: None,
        }
    }
}

/// Scan the local source and synchronize every selected device
///
/// # Arguments
/// * `devices` - All configured devices
/// * `opts` - Run options (source, destination, filters, mode)
/// * `clients` - Resolves the transport for each device
///
/// # Returns
/// A report holding one result per selected device. Local scan failures
/// abort the run before any device is contacted.
pub fn sync_devices(
    devices: &[DeviceConfig],
    opts: &SyncOptions,
    clients: &dyn ClientResolver,
) -> Result<RunReport> {
    let relative_to = opts.relative_to.as_deref().unwrap_or(&opts.source);
    let local = LocalTree::scan(&opts.source, relative_to, &opts.suffixes)?;

    log::info!(
        "Scanned {} local files under {}",
        local.len(),
        opts.source.display()
    );

    let selected = services::orchestrate::select_devices(devices, &opts.include, &opts.exclude);
    let settings = TaskSettings {
        destination: &opts.destination,
        execute: opts.execute,
        ignore_state: opts.ignore_state,
    };

    let orchestrator = Orchestrator::new(opts.jobs);
    log::info!(
        "Synchronizing {} of {} configured devices with {} workers",
        selected.len(),
        devices.len(),
        orchestrator.jobs()
    );
    orchestrator.run(&local, &selected, settings, clients)
}
