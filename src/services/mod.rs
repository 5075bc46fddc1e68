//! Core services: local scanning, remote tree model, planning and orchestration

pub mod local;
pub mod orchestrate;
pub mod plan;
pub mod remote;
pub mod task;
