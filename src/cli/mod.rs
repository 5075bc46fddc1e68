//! Command line surface: argument parsing and report output

pub mod args;
pub mod output;
