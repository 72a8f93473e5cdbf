// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of the agent

use config::ConfigError;
use dsf::DsfError;
use fabric::FabricError;
use rib::RibError;
use state::StateError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AgentError {
    #[error("Update '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(&'static str),

    #[error("Agent is not running")]
    NotRunning,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Rib(#[from] RibError),

    #[error(transparent)]
    Fabric(#[from] FabricError),

    #[error(transparent)]
    Dsf(#[from] DsfError),
}
