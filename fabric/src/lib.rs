// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fabric link bookkeeping.
//!
//! The [`FabricConnectivityManager`] keeps, for every local fabric port, the neighbor the port is
//! expected to be cabled to (from configuration and the DSF node table) next to the neighbor the
//! hardware actually sees, and classifies each port as conforming, mismatched or missing.
//! The [`FabricReachabilityManager`] derives from the same data which remote switches can be
//! reached over which fabric ports.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::missing_errors_doc)]

pub mod asic;
pub mod connectivity;
pub mod endpoint;
pub mod errors;
pub mod platform;
pub mod reachability;

pub use asic::AsicProfile;
pub use connectivity::{FabricConnectivityManager, RemoteConnectionGroups};
pub use endpoint::{FabricConnectivityDelta, FabricEndpoint, RemoteEndpoint};
pub use errors::FabricError;
pub use platform::{FabricPortInfo, PlatformMapping, PlatformMappings};
pub use reachability::{FabricReachabilityManager, ReachabilityChange};

use tracectl::trace_target;
trace_target!("fabric", tracectl::LevelFilter::INFO, &["fabric"]);
