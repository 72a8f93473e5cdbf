// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures.
//! Any result returned by the loading or validation methods of this crate is a `ConfigError`.

use lpm::prefix::PrefixError;
use thiserror::Error;
use tracectl::TraceCtlError;

/// The reasons why we may reject a configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Could not read configuration file {0}: {1}")]
    Read(String, String),
    #[error("Malformed configuration: {0}")]
    Parse(String),
    #[error("A {0} with id {1} already exists")]
    DuplicateId(&'static str, String),
    #[error("A {0} with name '{1}' already exists")]
    DuplicateName(&'static str, String),
    #[error("{0} refers to non-existent VLAN {1}")]
    NoSuchVlan(String, u16),
    #[error("Switch {0} is VOQ but no DSF node describes it")]
    NoDsfNodeForSwitch(u64),
    #[error("Fabric port {0} has {1} expected neighbors, at most one is supported")]
    TooManyExpectedNeighbors(String, usize),
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(&'static str),
    #[error("MTU out of range [68, 65535]: {0}")]
    BadMtu(u32),
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),
    #[error("Invalid static route {0}: {1}")]
    InvalidRoute(String, &'static str),
    #[error(transparent)]
    Prefix(#[from] PrefixError),

    // Interface addresses
    #[error("Invalid interface address format: {0}")]
    InvalidFormat(String),
    #[error("Invalid IP address interface address: {0}")]
    InvalidIpAddress(String),
    #[error("Invalid mask length in interface address: {0}")]
    InvalidMaskLength(String),

    #[error(transparent)]
    Tracing(#[from] TraceCtlError),
}

/// Result-like type for configurations
pub type ConfigResult = Result<(), ConfigError>;

#[must_use]
pub fn stringify(conf_result: &ConfigResult) -> String {
    match conf_result {
        Ok(()) => "Ok".to_string(),
        Err(e) => format!("FAILED: {e}"),
    }
}
