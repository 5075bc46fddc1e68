//! CLI argument parsing

use crate::SyncOptions;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sync(SyncArgs),
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    pub config: String,
    pub source: String,
    pub destination: Option<String>,
    pub relative_to: Option<String>,
    pub printers: Vec<String>,
    pub excluded: Vec<String>,
    pub suffixes: Vec<String>,
    pub jobs: Option<usize>,
    pub execute: bool,
    pub ignore_state: bool,
    pub json: bool,
}

impl Default for SyncArgs {
    fn default() -> Self {
        Self {
            config: "printers.json".to_string(),
            source: String::new(),
            destination: None,
            relative_to: None,
            printers: Vec::new(),
            excluded: Vec::new(),
            suffixes: Vec::new(),
            jobs: None,
            execute: false,
            ignore_state: false,
            json: false,
        }
    }
}

impl SyncArgs {
    /// Convert parsed arguments into run options
    #[must_use]
    pub fn to_options(&self) -> SyncOptions {
        let defaults = SyncOptions::default();
        SyncOptions {
            source: PathBuf::from(&self.source),
            relative_to: self.relative_to.as_ref().map(PathBuf::from),
            destination: self.destination.clone().unwrap_or_default(),
            suffixes: if self.suffixes.is_empty() {
                defaults.suffixes
            } else {
                self.suffixes.clone()
            },
            execute: self.execute,
            ignore_state: self.ignore_state,
            include: self.printers.clone(),
            exclude: self.excluded.clone(),
            jobs: self.jobs,
        }
    }
}

/// Parse command line arguments
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut sync_args = SyncArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "-c" | "--config" => {
                sync_args.config = required_value(args, &mut i)?;
            }
            "-s" | "--source" => {
                sync_args.source = required_value(args, &mut i)?;
            }
            "-d" | "--destination" => {
                sync_args.destination = Some(required_value(args, &mut i)?);
            }
            "-r" | "--relative-to" => {
                sync_args.relative_to = Some(required_value(args, &mut i)?);
            }
            "-p" | "--printer" => {
                sync_args.printers.extend(name_list(args, &mut i)?);
            }
            "-x" | "--exclude" => {
                sync_args.excluded.extend(name_list(args, &mut i)?);
            }
            "--suffix" => {
                let suffix = required_value(args, &mut i)?;
                if suffix.starts_with('.') {
                    sync_args.suffixes.push(suffix);
                } else {
                    sync_args.suffixes.push(format!(".{suffix}"));
                }
            }
            "-j" | "--jobs" => {
                let jobs: usize = required_value(args, &mut i)?
                    .parse()
                    .map_err(|_| "--jobs must be a positive integer".to_string())?;
                if jobs == 0 {
                    return Err("--jobs must be greater than zero".to_string());
                }
                sync_args.jobs = Some(jobs);
            }
            "-g" | "--go" => {
                sync_args.execute = true;
            }
            "--ignore-state" => {
                sync_args.ignore_state = true;
            }
            "--json" => {
                sync_args.json = true;
            }
            arg => return Err(format!("Unknown option: {arg}")),
        }
        i += 1;
    }

    if sync_args.source.is_empty() {
        return Err("Missing required option: --source".to_string());
    }

    Ok(Command::Sync(sync_args))
}

fn required_value(args: &[String], i: &mut usize) -> Result<String, String> {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) if !value.starts_with('-') || value.len() == 1 => Ok(value.clone()),
        _ => Err(format!("{flag} requires a value")),
    }
}

/// Consume one or more names following a flag (`-p a b -p c`)
fn name_list(args: &[String], i: &mut usize) -> Result<Vec<String>, String> {
    let flag = &args[*i];
    let mut names = Vec::new();

    while let Some(value) = args.get(*i + 1) {
        if value.starts_with('-') {
            break;
        }
        names.push(value.clone());
        *i += 1;
    }

    if names.is_empty() {
        return Err(format!("{flag} requires at least one printer name"));
    }
    Ok(names)
}
