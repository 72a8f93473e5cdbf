// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Route prefixes and longest-prefix-match maps, one instance per address family.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::similar_names)]

pub mod prefix;
pub mod trie;

pub use prefix::{AnyPrefix, IpAddress, PrefixError, RoutePrefix};
pub use trie::NetworkToRouteMap;
