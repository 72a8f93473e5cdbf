// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch agent: applies configuration and hardware events to the switch state through a
//! single update serializer, and exchanges state with the other nodes of the fabric.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::missing_errors_doc)]

pub mod apply;
pub mod errors;
pub mod events;
pub mod hwprog;
pub mod params;
pub mod swswitch;

pub use errors::AgentError;
pub use events::NeighborEvent;
pub use hwprog::{HwCallCount, HwCallCounters, LoggingHwProgrammer};
pub use params::{AgentParams, AgentParamsBuilder};
pub use swswitch::{
    AgentCtlSender, FabricStatus, SwSwitch, SwitchStateReader, UpdateMsg, UpdateQueue,
};

use tracectl::trace_target;
trace_target!("agent", tracectl::LevelFilter::INFO, &["agent"]);
