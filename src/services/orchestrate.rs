//! Fan-out of device tasks over a bounded worker pool
//!
//! Every selected device gets its own `DeviceSyncTask`. Tasks share only the
//! read-only local tree and device configuration, run on a rayon pool sized
//! by `jobs`, and are collected once all of them reached a terminal state.
//! One device failing, even by panicking, never cancels or alters another
//! device's work.

use crate::client::ClientResolver;
use crate::models::{DeviceConfig, SyncResult, SyncStatus};
use crate::services::local::LocalTree;
use crate::services::task::{DeviceSyncTask, TaskSettings};
use crate::{Error, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

/// Results of one run, in device selection order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub results: Vec<SyncResult>,
}

impl RunReport {
    /// True when any device failed or had actions that could not be applied
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(SyncResult::has_errors)
    }

    #[must_use]
    pub fn count(&self, matches: impl Fn(&SyncStatus) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| matches(&result.status))
            .count()
    }
}

/// Pick the devices to process
///
/// An include list restricts to the named devices; otherwise an exclude list
/// removes named devices; otherwise every device is selected. Names compare
/// case-insensitively.
#[must_use]
pub fn select_devices<'a>(
    devices: &'a [DeviceConfig],
    include: &[String],
    exclude: &[String],
) -> Vec<&'a DeviceConfig> {
    let lowered = |names: &[String]| -> HashSet<String> {
        names.iter().map(|name| name.to_lowercase()).collect()
    };

    if !include.is_empty() {
        let include = lowered(include);
        devices
            .iter()
            .filter(|device| include.contains(&device.name.to_lowercase()))
            .collect()
    } else if !exclude.is_empty() {
        let exclude = lowered(exclude);
        devices
            .iter()
            .filter(|device| !exclude.contains(&device.name.to_lowercase()))
            .collect()
    } else {
        devices.iter().collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Orchestrator {
    jobs: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Orchestrator {
    /// Construct an orchestrator with `jobs` workers (default: available parallelism)
    #[must_use]
    pub fn new(jobs: Option<usize>) -> Self {
        let jobs = jobs.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        });
        Self { jobs }
    }

    #[must_use]
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run one task per device and wait for all of them
    pub fn run(
        &self,
        local: &LocalTree,
        devices: &[&DeviceConfig],
        settings: TaskSettings<'_>,
        clients: &dyn ClientResolver,
    ) -> Result<RunReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|index| format!("link-sync-{index}"))
            .build()
            .map_err(|e| Error::System(format!("failed to start worker pool: {e}")))?;

        let results: Vec<SyncResult> = pool.install(|| {
            devices
                .par_iter()
                .map(|device| run_device(device, local, settings, clients))
                .collect()
        });

        let report = RunReport { results };
        log::info!(
            "Run finished: {} done, {} skipped, {} failed",
            report.count(|status| *status == SyncStatus::Done),
            report.count(|status| matches!(status, SyncStatus::Skipped { .. })),
            report.count(|status| *status == SyncStatus::Failed)
        );
        Ok(report)
    }
}

/// Run one device task, turning a panic inside it into a failed result
fn run_device(
    device: &DeviceConfig,
    local: &LocalTree,
    settings: TaskSettings<'_>,
    clients: &dyn ClientResolver,
) -> SyncResult {
    let Some(client) = clients.resolve(device) else {
        return SyncResult::failed(
            &device.name,
            !settings.execute,
            format!("no client registered for device family '{}'", device.family),
        );
    };

    let task = DeviceSyncTask::new(device, client, local, settings);
    match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("{}: task panicked: {message}", device.name);
            SyncResult::failed(
                &device.name,
                !settings.execute,
                format!("task panicked: {message}"),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
