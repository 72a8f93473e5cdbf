// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! State errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum StateError {
    #[error("{what} {key} already exists")]
    Duplicate { what: &'static str, key: String },
    #[error("{what} {key} does not exist")]
    NotFound { what: &'static str, key: String },
    #[error("Invalid state: {0}")]
    Invalid(String),
    #[error("Update '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },
    #[error("Update scheduler is gone: {0}")]
    SchedulerGone(String),
}
