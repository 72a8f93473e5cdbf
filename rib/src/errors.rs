// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The error results used by this library.

use lpm::PrefixError;
use state::{RouterId, StateError};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RouteError {
    #[error("A next-hop set must not be empty")]
    EmptyNextHopSet,

    #[error("Route {0} has no entry")]
    NoEntry(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum RibError {
    #[error("No such VRF {0}")]
    NoSuchVrf(RouterId),

    #[error("Invalid route {0}: {1}")]
    InvalidRoute(String, String),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Prefix(#[from] PrefixError),

    #[error(transparent)]
    State(#[from] StateError),
}
