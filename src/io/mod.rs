//! Reading printer configuration files

pub mod config;
