// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Routing information base: per-VRF route tables holding the candidate entries of every
//! routing client, the recursive resolver collapsing them into forwarding entries, and the
//! synchronization of the result into the switch state.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
mod display;
pub mod errors;
pub mod fib;
pub mod nexthop;
pub mod rib;
pub mod route;
pub mod table;
pub mod updater;

pub use client::{AdminDistance, ClientId};
pub use errors::{RibError, RouteError};
pub use nexthop::{
    ECMP_WEIGHT, NextHop, NextHopWeight, RouteForwardAction, RouteNextHopEntry, RouteNextHopSet,
    UCMP_DEFAULT_WEIGHT,
};
pub use rib::{InterfaceRoute, RoutingInformationBase, StaticRoute, UnicastRoute, UpdateStatistics};
pub use route::{Route, RouteFlags, RouteNextHopsMulti};
pub use table::{RibFamily, RouteTable};
pub use updater::RouteUpdater;

use tracectl::trace_target;
trace_target!("rib", tracectl::LevelFilter::INFO, &["rib"]);
