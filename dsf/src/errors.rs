// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of the fabric state exchange

use state::SwitchId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum DsfError {
    #[error("No loopback address on any local VOQ switch")]
    NoLocalLoopback,
    #[error("Got update for local switch id {switch_id} from {node}")]
    LocalSwitchId { node: String, switch_id: SwitchId },
    #[error("Got unexpected state update for {path} from {node}")]
    UnexpectedPath { node: String, path: String },
    #[error("Transport failure: {0}")]
    Transport(String),
}
