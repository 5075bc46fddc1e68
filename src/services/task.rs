//! Per-device synchronization task
//!
//! A task walks one device through
//! `QueryState -> FetchRemote -> ComputePlan -> Apply -> Done`, stopping at
//! `Skipped` when the device is not idle or at `Failed` when it cannot be
//! queried or listed. Errors never escape the task: they end up in the
//! returned `SyncResult`.

use crate::Result;
use crate::client::DeviceClient;
use crate::models::{
    ActionCounts, ActionError, DeviceConfig, DeviceState, SyncAction, SyncResult, SyncStatus,
};
use crate::services::local::LocalTree;
use crate::services::plan;
use crate::services::remote::RemoteTree;

/// Stages of a device task
#[derive(Debug)]
enum Stage {
    QueryState,
    FetchRemote,
    ComputePlan(RemoteTree),
    Apply(RemoteTree, Vec<SyncAction>),
    Done,
    Skipped(DeviceState),
    Failed(String),
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::QueryState => "query-state",
            Stage::FetchRemote => "fetch-remote",
            Stage::ComputePlan(_) => "compute-plan",
            Stage::Apply(..) => "apply",
            Stage::Done => "done",
            Stage::Skipped(_) => "skipped",
            Stage::Failed(_) => "failed",
        }
    }
}

/// Run-wide settings shared by every device task
#[derive(Debug, Clone, Copy)]
pub struct TaskSettings<'a> {
    pub destination: &'a str,
    pub execute: bool,
    pub ignore_state: bool,
}

/// Unit of work synchronizing a single device
pub struct DeviceSyncTask<'a> {
    device: &'a DeviceConfig,
    client: &'a dyn DeviceClient,
    local: &'a LocalTree,
    settings: TaskSettings<'a>,
    result: SyncResult,
}

impl<'a> DeviceSyncTask<'a> {
    #[must_use]
    pub fn new(
        device: &'a DeviceConfig,
        client: &'a dyn DeviceClient,
        local: &'a LocalTree,
        settings: TaskSettings<'a>,
    ) -> Self {
        Self {
            device,
            client,
            local,
            settings,
            result: SyncResult::new(&device.name, !settings.execute),
        }
    }

    /// Drive the task to a terminal stage and return its result
    #[must_use]
    pub fn run(mut self) -> SyncResult {
        let mut stage = Stage::QueryState;

        loop {
            log::debug!("{}: {}", self.device.name, stage.label());
            stage = match stage {
                Stage::QueryState => self.query_state(),
                Stage::FetchRemote => self.fetch_remote(),
                Stage::ComputePlan(tree) => {
                    let actions = plan::plan(self.local, &tree, self.settings.destination);
                    Stage::Apply(tree, actions)
                }
                Stage::Apply(tree, actions) => self.apply(&tree, actions),
                Stage::Done => {
                    self.result.status = SyncStatus::Done;
                    break;
                }
                Stage::Skipped(state) => {
                    log::info!(
                        "{} is currently {state} and will not be accessed",
                        self.device.name
                    );
                    self.result.status = SyncStatus::Skipped { state };
                    break;
                }
                Stage::Failed(message) => {
                    log::error!("{}: {message}", self.device.name);
                    self.result.status = SyncStatus::Failed;
                    self.result.error = Some(message);
                    break;
                }
            };
        }

        self.result
    }

    fn query_state(&self) -> Stage {
        match self.client.query_state(self.device) {
            Ok(DeviceState::Idle) => Stage::FetchRemote,
            Ok(state) if self.settings.ignore_state => {
                log::warn!(
                    "{} is {state}; continuing because state is ignored",
                    self.device.name
                );
                Stage::FetchRemote
            }
            Ok(state) => Stage::Skipped(state),
            Err(e) => Stage::Failed(e.to_string()),
        }
    }

    fn fetch_remote(&self) -> Stage {
        let tree = self
            .client
            .fetch_listing(self.device)
            .and_then(|listing| RemoteTree::from_listing(&listing));

        match tree {
            Ok(tree) => Stage::ComputePlan(tree),
            Err(e) => Stage::Failed(e.to_string()),
        }
    }

    fn apply(&mut self, tree: &RemoteTree, actions: Vec<SyncAction>) -> Stage {
        self.result.planned = ActionCounts::from_actions(&actions);
        log::info!(
            "{}: {} to create, {} to upload, {} to refresh, {} to delete",
            self.device.name,
            self.result.planned.folders,
            self.result.planned.uploads,
            self.result.planned.refreshes,
            self.result.planned.deletes
        );

        if self.settings.execute {
            for action in &actions {
                match self.execute(tree, action) {
                    Ok(true) => {
                        log::info!(
                            "{}: {} {} succeeded",
                            self.device.name,
                            action.verb(),
                            action.remote_path()
                        );
                        self.result.applied.record(action);
                    }
                    Ok(false) => self.record_failure(action, "refused by device".to_string()),
                    Err(e) => self.record_failure(action, e.to_string()),
                }
            }
        } else {
            for action in &actions {
                log::debug!(
                    "{}: would {} {}",
                    self.device.name,
                    action.verb(),
                    action.remote_path()
                );
            }
        }

        self.result.actions = actions;
        Stage::Done
    }

    fn execute(&self, tree: &RemoteTree, action: &SyncAction) -> Result<bool> {
        let device_path = tree.device_path(action.remote_path());
        match action {
            SyncAction::CreateFolder { .. } => self.client.create_folder(self.device, &device_path),
            SyncAction::Upload { local_path, .. } => {
                self.client.upload(self.device, local_path, &device_path)
            }
            SyncAction::Delete { .. } => self.client.delete(self.device, &device_path),
        }
    }

    fn record_failure(&mut self, action: &SyncAction, message: String) {
        log::warn!(
            "{}: {} {} failed: {message}",
            self.device.name,
            action.verb(),
            action.remote_path()
        );
        self.result.action_errors.push(ActionError {
            path: action.remote_path().to_string(),
            message,
        });
    }
}
