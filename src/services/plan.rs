//! Reconciliation planning
//!
//! Computes the ordered actions that bring a device's storage below the
//! destination prefix in line with the local tree:
//!
//! - local files missing remotely are uploaded, after creating any missing
//!   ancestor folders top-down
//! - files whose remote copy is older than the local one by more than
//!   `STALE_THRESHOLD_SECS` (or has no timestamp) are uploaded again
//! - remote files with no local counterpart are deleted, after every upload
//!
//! A remote file standing where a local folder belongs (remote `a`, local
//! `a/x.gcode`) is only deleted at the end of the plan, so the folder
//! creation and uploads beneath it are refused on that run and succeed on
//! the next one.

use crate::models::SyncAction;
use crate::services::local::LocalTree;
use crate::services::remote::{NodeId, RemoteTree};
use std::collections::{BTreeMap, HashSet};

/// Local files newer than their remote copy by more than this are re-uploaded
pub const STALE_THRESHOLD_SECS: i64 = 60;

/// Compute the plan converging `remote` to `local` under `destination`
#[must_use]
pub fn plan(local: &LocalTree, remote: &RemoteTree, destination: &str) -> Vec<SyncAction> {
    let (destination, remote_files) = remote_scope(remote, destination.trim_matches('/'));
    let destination = destination.as_str();

    let mut actions = Vec::new();
    let mut created = HashSet::new();

    for entry in local.iter() {
        let remote_path = join(destination, &entry.relative_path);

        match remote_files.get(entry.relative_path.as_str()) {
            None => {
                push_missing_folders(remote, &remote_path, &mut created, &mut actions);
                actions.push(SyncAction::Upload {
                    local_path: entry.absolute_path.clone(),
                    remote_path,
                    replaces_existing: false,
                });
            }
            Some(&id) => {
                if is_stale(entry.modified, remote.node(id).modified) {
                    actions.push(SyncAction::Upload {
                        local_path: entry.absolute_path.clone(),
                        remote_path,
                        replaces_existing: true,
                    });
                }
            }
        }
    }

    for relative in remote_files.keys() {
        if !local.contains(relative) {
            actions.push(SyncAction::Delete {
                remote_path: join(destination, relative),
            });
        }
    }

    log::debug!(
        "Planned {} actions for {} local and {} remote files",
        actions.len(),
        local.len(),
        remote_files.len()
    );
    actions
}

/// Resolve `destination` and collect the remote files below it, keyed by
/// path relative to it
///
/// The destination may be given by display path or by short path; an
/// existing folder is always reported back by its display path. A missing
/// destination, or one that names a file, yields an empty scope.
fn remote_scope(remote: &RemoteTree, destination: &str) -> (String, BTreeMap<String, NodeId>) {
    let scope = remote
        .find(destination)
        .or_else(|| remote.find_short(destination));

    match scope {
        Some(scope) if remote.node(scope).is_dir => (
            remote.display_path(scope),
            remote.files_under(scope).into_iter().collect(),
        ),
        _ => (destination.to_string(), BTreeMap::new()),
    }
}

/// Whether the local copy is newer than the remote copy beyond the threshold
#[must_use]
pub fn is_stale(local_modified: i64, remote_modified: Option<i64>) -> bool {
    match remote_modified {
        None => true,
        Some(remote) => local_modified > remote.saturating_add(STALE_THRESHOLD_SECS),
    }
}

fn push_missing_folders(
    remote: &RemoteTree,
    file_path: &str,
    created: &mut HashSet<String>,
    actions: &mut Vec<SyncAction>,
) {
    let Some((parent, _)) = file_path.rsplit_once('/') else {
        return;
    };

    let mut folder = String::new();
    for component in parent.split('/') {
        folder = join(&folder, component);
        if remote.is_dir(&folder) || created.contains(&folder) {
            continue;
        }
        created.insert(folder.clone());
        actions.push(SyncAction::CreateFolder {
            remote_path: folder.clone(),
        });
    }
}

fn join(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{prefix}/{path}")
    }
}
