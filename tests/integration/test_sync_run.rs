//! Integration tests for device tasks and whole runs against fake printers

use crate::fixtures::{FakeFarm, FakePrinter, device, write_file_with_mtime};
use link_sync::services::plan;
use link_sync::{
    DeviceState, DeviceSyncTask, LocalTree, RemoteTree, SyncAction, SyncOptions, SyncStatus,
    TaskSettings,
};
use std::path::Path;
use tempfile::TempDir;

const DRY_RUN: TaskSettings<'static> = TaskSettings {
    destination: "",
    execute: false,
    ignore_state: false,
};

const EXECUTE: TaskSettings<'static> = TaskSettings {
    destination: "",
    execute: true,
    ignore_state: false,
};

fn scan(root: &Path) -> LocalTree {
    LocalTree::scan(root, root, &[".gcode".to_string()]).expect("scan")
}

fn remote_paths(actions: &[SyncAction]) -> Vec<String> {
    actions.iter().map(|a| a.remote_path().to_string()).collect()
}

#[test]
fn test_missing_file_in_new_folder_is_uploaded_after_folder_creation() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("a/x.gcode"), b"G28", 100).unwrap();
    let local = scan(temp_dir.path());

    let farm = FakeFarm::new().with_printer("mk4", FakePrinter::idle());
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert_eq!(result.status, SyncStatus::Done);
    assert!(matches!(result.actions[0], SyncAction::CreateFolder { .. }));
    assert!(matches!(result.actions[1], SyncAction::Upload { .. }));
    assert_eq!(remote_paths(&result.actions), vec!["a", "a/x.gcode"]);
    assert_eq!(farm.mutations("mk4"), vec!["mkdir a", "upload a/x.gcode"]);
    assert_eq!(farm.files("mk4"), vec!["a/x.gcode"]);
    assert_eq!(result.applied, result.planned);
}

#[test]
fn test_stale_file_is_refreshed() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("x.gcode"), b"G28", 200).unwrap();
    let local = scan(temp_dir.path());

    let farm =
        FakeFarm::new().with_printer("mk4", FakePrinter::idle().with_file("x.gcode", 100));
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert_eq!(result.planned.refreshes, 1);
    assert_eq!(result.planned.total(), 1);
    assert_eq!(farm.mutations("mk4"), vec!["upload x.gcode"]);
}

#[test]
fn test_file_within_threshold_is_in_sync() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("x.gcode"), b"G28", 100).unwrap();
    let local = scan(temp_dir.path());

    let farm = FakeFarm::new().with_printer("mk4", FakePrinter::idle().with_file("x.gcode", 90));
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert_eq!(result.status, SyncStatus::Done);
    assert!(result.actions.is_empty());
    assert!(farm.mutations("mk4").is_empty());
}

#[test]
fn test_excess_file_is_deleted() {
    let temp_dir = TempDir::new().unwrap();
    let local = scan(temp_dir.path());

    let farm =
        FakeFarm::new().with_printer("mk4", FakePrinter::idle().with_file("old.gcode", 100));
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert_eq!(
        result.actions,
        vec![SyncAction::Delete {
            remote_path: "old.gcode".to_string()
        }]
    );
    assert!(farm.files("mk4").is_empty());
}

#[test]
fn test_busy_printer_is_skipped_without_mutations() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("x.gcode"), b"G28", 100).unwrap();
    let local = scan(temp_dir.path());

    let farm = FakeFarm::new().with_printer(
        "mk4",
        FakePrinter::idle()
            .with_state(DeviceState::Busy)
            .with_file("old.gcode", 1),
    );
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert_eq!(
        result.status,
        SyncStatus::Skipped {
            state: DeviceState::Busy
        }
    );
    assert!(!result.has_errors());
    assert_eq!(farm.calls("mk4"), vec!["state"]);
}

#[test]
fn test_unknown_state_is_gated_like_busy() {
    let local = LocalTree::default();
    let farm = FakeFarm::new().with_printer(
        "mk4",
        FakePrinter::idle().with_state(DeviceState::Unknown),
    );
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert!(matches!(result.status, SyncStatus::Skipped { .. }));
}

#[test]
fn test_ignore_state_processes_busy_printer() {
    let local = LocalTree::default();
    let farm = FakeFarm::new().with_printer(
        "mk4",
        FakePrinter::idle()
            .with_state(DeviceState::Busy)
            .with_file("old.gcode", 1),
    );
    let config = device("mk4");
    let settings = TaskSettings {
        ignore_state: true,
        ..EXECUTE
    };
    let result = DeviceSyncTask::new(&config, &farm, &local, settings).run();

    assert_eq!(result.status, SyncStatus::Done);
    assert_eq!(farm.mutations("mk4"), vec!["delete old.gcode"]);
}

#[test]
fn test_dry_run_reports_without_mutating() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("new/x.gcode"), b"G28", 100).unwrap();
    let local = scan(temp_dir.path());

    let farm =
        FakeFarm::new().with_printer("mk4", FakePrinter::idle().with_file("old.gcode", 100));
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, DRY_RUN).run();

    assert_eq!(result.status, SyncStatus::Done);
    assert!(result.dry_run);
    assert_eq!(result.planned.folders, 1);
    assert_eq!(result.planned.uploads, 1);
    assert_eq!(result.planned.deletes, 1);
    assert_eq!(result.applied.total(), 0);
    assert_eq!(farm.calls("mk4"), vec!["state", "listing"]);
}

#[test]
fn test_refused_action_is_recorded_and_the_rest_of_the_plan_continues() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("x.gcode"), b"G28", 100).unwrap();
    let local = scan(temp_dir.path());

    let farm = FakeFarm::new().with_printer(
        "mk4",
        FakePrinter::idle()
            .with_file("printing.gcode", 1)
            .with_file("unused.gcode", 1)
            .refusing("printing.gcode"),
    );
    let config = device("mk4");
    let result = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();

    assert_eq!(result.status, SyncStatus::Done);
    assert!(result.has_errors());
    assert_eq!(result.action_errors.len(), 1);
    assert_eq!(result.action_errors[0].path, "printing.gcode");
    assert_eq!(result.applied.uploads, 1);
    assert_eq!(result.applied.deletes, 1);
    assert_eq!(farm.files("mk4"), vec!["printing.gcode", "x.gcode"]);
}

#[test]
fn test_destination_prefix_is_created_and_used() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("x.gcode"), b"G28", 100).unwrap();
    let local = scan(temp_dir.path());

    let farm = FakeFarm::new().with_printer(
        "mk4",
        FakePrinter::idle().with_file("outside.gcode", 1),
    );
    let config = device("mk4");
    let settings = TaskSettings {
        destination: "farm",
        ..EXECUTE
    };
    let result = DeviceSyncTask::new(&config, &farm, &local, settings).run();

    assert_eq!(remote_paths(&result.actions), vec!["farm", "farm/x.gcode"]);
    assert_eq!(farm.files("mk4"), vec!["farm/x.gcode", "outside.gcode"]);
}

#[test]
fn test_applied_plan_converges_to_an_empty_plan() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file_with_mtime(&root.join("a/b/one.gcode"), b"1", 1_000).unwrap();
    write_file_with_mtime(&root.join("a/two.gcode"), b"2", 5_000).unwrap();
    write_file_with_mtime(&root.join("three.gcode"), b"3", 9_000).unwrap();
    let local = scan(root);

    let farm = FakeFarm::new().with_printer(
        "mk4",
        FakePrinter::idle()
            .with_file("a/two.gcode", 10)
            .with_file("a/stray.gcode", 10)
            .with_file("z/old.gcode", 10)
            .with_file("three.gcode", 9_000),
    );
    let config = device("mk4");

    let first = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();
    assert!(!first.actions.is_empty());
    assert!(first.action_errors.is_empty());

    let second = DeviceSyncTask::new(&config, &farm, &local, EXECUTE).run();
    assert_eq!(second.status, SyncStatus::Done);
    assert!(second.actions.is_empty(), "second plan: {:?}", second.actions);
}

#[test]
fn test_folders_precede_everything_beneath_them() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for path in ["a/b/c/1.gcode", "a/2.gcode", "d/e/3.gcode", "a/b/4.gcode"] {
        write_file_with_mtime(&root.join(path), b"x", 1).unwrap();
    }
    let local = scan(root);
    let remote = RemoteTree::from_listing(&link_sync::ListingEntry::folder(
        "usb",
        vec![link_sync::ListingEntry::folder("a", vec![])],
    ))
    .unwrap();

    let actions = plan::plan(&local, &remote, "");
    for (index, action) in actions.iter().enumerate() {
        if let SyncAction::CreateFolder { remote_path } = action {
            let prefix = format!("{remote_path}/");
            let first_use = actions
                .iter()
                .position(|other| other.remote_path().starts_with(&prefix));
            assert!(first_use.is_some_and(|use_index| use_index > index));
        }
    }
    assert!(!remote_paths(&actions).contains(&"a".to_string()));
}

#[test]
fn test_full_run_reports_each_selected_printer() {
    let temp_dir = TempDir::new().unwrap();
    write_file_with_mtime(&temp_dir.path().join("x.gcode"), b"G28", 100).unwrap();

    let farm = FakeFarm::new()
        .with_printer("mk4-1", FakePrinter::idle())
        .with_printer("mk4-2", FakePrinter::idle())
        .with_printer("xl", FakePrinter::idle());
    let devices = vec![device("mk4-1"), device("mk4-2"), device("xl")];
    let opts = SyncOptions {
        source: temp_dir.path().to_path_buf(),
        execute: true,
        exclude: vec!["XL".to_string()],
        jobs: Some(2),
        ..SyncOptions::default()
    };

    let report = link_sync::sync_devices(&devices, &opts, &farm).expect("run");

    let names: Vec<&str> = report.results.iter().map(|r| r.device.as_str()).collect();
    assert_eq!(names, vec!["mk4-1", "mk4-2"]);
    assert!(!report.has_failures());
    assert_eq!(farm.files("mk4-1"), vec!["x.gcode"]);
    assert_eq!(farm.files("mk4-2"), vec!["x.gcode"]);
    assert!(farm.calls("xl").is_empty());
}
