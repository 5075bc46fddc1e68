//! Output formatting for CLI

use crate::models::{ActionCounts, SyncAction, SyncResult, SyncStatus};
use crate::services::orchestrate::RunReport;
use std::fmt::Write;

const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_YELLOW: &str = "\x1b[33m";
const COLOR_RED: &str = "\x1b[31m";
const COLOR_MAGENTA: &str = "\x1b[35m";
const COLOR_RESET: &str = "\x1b[0m";

fn plural(count: u32, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn describe_counts(counts: &ActionCounts) -> String {
    format!(
        "{} to create, {} to upload, {} to refresh, {} to delete",
        plural(counts.folders, "folder"),
        plural(counts.uploads, "file"),
        plural(counts.refreshes, "stale file"),
        plural(counts.deletes, "file")
    )
}

fn describe_action(action: &SyncAction) -> String {
    match action {
        SyncAction::CreateFolder { remote_path } => {
            format!("create folder {COLOR_MAGENTA}{remote_path}{COLOR_RESET}")
        }
        SyncAction::Upload {
            local_path,
            remote_path,
            replaces_existing,
        } => format!(
            "{} {COLOR_MAGENTA}{}{COLOR_RESET} => {COLOR_MAGENTA}{remote_path}{COLOR_RESET}",
            if *replaces_existing { "refresh" } else { "upload" },
            local_path.display()
        ),
        SyncAction::Delete { remote_path } => {
            format!("delete {COLOR_MAGENTA}{remote_path}{COLOR_RESET}")
        }
    }
}

/// Render the result of one device as human-readable text
#[must_use]
pub fn format_result(result: &SyncResult) -> String {
    let mut out = String::new();

    match result.status {
        SyncStatus::Skipped { state } => {
            let _ = writeln!(
                out,
                "{COLOR_YELLOW}{} is currently {state} and was not accessed.{COLOR_RESET}",
                result.device
            );
            return out;
        }
        SyncStatus::Failed => {
            let _ = writeln!(
                out,
                "{COLOR_RED}{} failed: {}{COLOR_RESET}",
                result.device,
                result.error.as_deref().unwrap_or("unknown error")
            );
            return out;
        }
        SyncStatus::Done => {}
    }

    let _ = writeln!(out, "{} - {}.", result.device, describe_counts(&result.planned));
    for action in &result.actions {
        let prefix = if result.dry_run { "Would " } else { "" };
        let _ = writeln!(out, "  {prefix}{}", describe_action(action));
    }

    if !result.dry_run {
        let color = if result.action_errors.is_empty() {
            COLOR_GREEN
        } else {
            COLOR_RED
        };
        let _ = writeln!(
            out,
            "{color}{}: {} of {} actions applied.{COLOR_RESET}",
            result.device,
            result.applied.total(),
            result.planned.total()
        );
        for error in &result.action_errors {
            let _ = writeln!(out, "  {COLOR_RED}{}: {}{COLOR_RESET}", error.path, error.message);
        }
    }

    out
}

/// Print the whole report as human-readable text
pub fn format_text(report: &RunReport, execute: bool) {
    if execute {
        println!("The following actions will be taken.");
    } else {
        println!("Dry run only. These actions will not be performed. (use -g/--go to perform them)");
    }
    println!();

    if report.results.is_empty() {
        println!("No printers selected.");
        return;
    }

    for result in &report.results {
        print!("{}", format_result(result));
    }
}

/// Format the report as JSON
#[must_use]
pub fn format_json(report: &RunReport) -> String {
    let output = serde_json::json!({
        "results": report.results,
        "has_failures": report.has_failures(),
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}
