// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fabric errors. None of them is fatal: they leave the expected side of an endpoint unknown.

use state::{AsicType, PortId, SwitchId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum FabricError {
    #[error("No platform mapping for ASIC {0}")]
    NoPlatformMapping(AsicType),
    #[error("Port {port} is not a fabric port of ASIC {asic}")]
    UnknownPortName { asic: AsicType, port: String },
    #[error("Port id {0} is already mapped")]
    DuplicatePortId(PortId),
    #[error("Port name {0} is already mapped")]
    DuplicatePortName(String),
    #[error("No switch id known for switch {0}")]
    NoSwitchId(String),
    #[error("Unknown DSF node {0}")]
    UnknownDsfNode(SwitchId),
    #[error("Port id {port} of {switch} is out of range for ASIC {asic}")]
    PortIdOutOfRange {
        switch: String,
        port: u32,
        asic: AsicType,
    },
}
