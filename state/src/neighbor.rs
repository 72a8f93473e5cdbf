// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! ARP and NDP entries, one generic implementation per address family

use crate::ids::{InterfaceId, PortId, SystemPortId};
use crate::node::{Node, NodeMap, PublishFlag, Publishable};
use lpm::IpAddress;
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborState {
    Reachable,
    #[default]
    Pending,
    Unverified,
    Stale,
}

/// Where a neighbor was resolved. Neighbors learnt from remote nodes sit behind system ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborPort {
    Physical(PortId),
    System(SystemPortId),
}

impl Display for NeighborPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Physical(p) => write!(f, "port {p}"),
            Self::System(p) => write!(f, "sysport {p}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NeighborEntry<A: IpAddress> {
    pub ip: A,
    pub mac: MacAddress,
    pub port: NeighborPort,
    pub interface: InterfaceId,
    pub state: NeighborState,
    pub is_local: bool,
    flag: PublishFlag,
}

impl<A: IpAddress> NeighborEntry<A> {
    #[must_use]
    pub fn new(
        ip: A,
        mac: MacAddress,
        port: NeighborPort,
        interface: InterfaceId,
        state: NeighborState,
    ) -> Self {
        Self {
            ip,
            mac,
            port,
            interface,
            state,
            is_local: true,
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.state == NeighborState::Reachable
    }
}

impl<A: IpAddress> Publishable for NeighborEntry<A> {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl<A: IpAddress> Node for NeighborEntry<A> {
    type Key = A;
    const KIND: &'static str = "neighbor";

    fn key(&self) -> A {
        self.ip
    }
}

pub type ArpEntry = NeighborEntry<Ipv4Addr>;
pub type NdpEntry = NeighborEntry<Ipv6Addr>;
pub type ArpTable = NodeMap<ArpEntry>;
pub type NdpTable = NodeMap<NdpEntry>;
