// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of the agent's tracing.
//!
//! Every crate declares its tracing targets with [`trace_target!`] (or [`custom_target!`]
//! for targets that do not correspond to a module path). Declarations are collected at
//! link time and loaded into a database of targets and tags whose log-levels can be
//! changed while the process runs.

pub mod control;
pub mod display;
pub mod targets;

// re-exports
pub use control::{TraceCtlError, TracingControl, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;

/// Log-level applied to any target that has not been explicitly declared
pub const DEFAULT_DEFAULT_LOGLEVEL: LevelFilter = LevelFilter::INFO;
