//! Printer farm sync CLI (link-sync) - Main binary entry point

use link_sync::cli::args::{Command, SyncArgs, parse_args};
use link_sync::cli::output::{format_json, format_text};
use link_sync::{ClientRegistry, Error};
use std::process;

fn main() {
    // Initialize logger (controlled by RUST_LOG environment variable)
    // Example: RUST_LOG=debug link-sync --source ./gcode
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let exit_code = match &command {
        Command::Help => {
            print_help();
            0
        }
        Command::Version => {
            print_version();
            0
        }
        Command::Sync(sync_args) => handle_sync(sync_args),
    };

    process::exit(exit_code);
}

fn handle_sync(args: &SyncArgs) -> i32 {
    let devices = match link_sync::io::config::load_devices(&args.config) {
        Ok(devices) => devices,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let clients = match ClientRegistry::with_defaults() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            return 4;
        }
    };

    let opts = args.to_options();
    let report = match link_sync::sync_devices(&devices, &opts, &clients) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            return match e {
                Error::InvalidInput(_) | Error::Config(_) => 2,
                _ => 4,
            };
        }
    };

    if args.json {
        println!("{}", format_json(&report));
    } else {
        format_text(&report, opts.execute);
    }

    if report.has_failures() { 3 } else { 0 }
}

fn print_help() {
    println!("link-sync - Synchronize print files across a farm of networked printers");
    println!();
    println!("USAGE:");
    println!("    link-sync --source <DIR> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -s, --source <DIR>         Local root of the files to synchronize (required)");
    println!("    -c, --config <FILE>        JSON or YAML printer configuration (default: printers.json)");
    println!("    -d, --destination <PATH>   Folder inside the printers' storage (default: storage root)");
    println!("    -r, --relative-to <DIR>    Make source paths relative to this directory (default: source)");
    println!("    -p, --printer <NAME>...    Only process the named printers");
    println!("    -x, --exclude <NAME>...    Process all printers except these (ignored with --printer)");
    println!("        --suffix <EXT>         Only sync files with this suffix, repeatable (default: .gcode)");
    println!("    -j, --jobs <N>             Number of printers processed in parallel (default: CPU count)");
    println!("    -g, --go                   Perform the changes instead of a dry run");
    println!("        --ignore-state         Also process printers that are busy or printing");
    println!("        --json                 Emit machine-readable output");
    println!("    -h, --help                 Show this help message");
    println!("    -v, --version              Show version information");
    println!();
    println!("EXIT CODES:");
    println!("    0  every selected printer is in sync (or was skipped)");
    println!("    2  invalid arguments, configuration or source paths");
    println!("    3  a printer failed or some actions could not be applied");
    println!("    4  the local source could not be read or the runtime failed to start");
    println!();
    println!("EXAMPLES:");
    println!("    link-sync -c printers.yml -s ~/gcode/usb");
    println!("    link-sync -c printers.yml -s ~/gcode/usb -d farm -p mk4-1 mk4-2 --go");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_DATE: &str = env!("GIT_DATE");
    const BUILD_TARGET: &str = env!("BUILD_TARGET");

    println!("link-sync {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");

    #[cfg(debug_assertions)]
    println!("Build: debug");
    #[cfg(not(debug_assertions))]
    println!("Build: release");
}
