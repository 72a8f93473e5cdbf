// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forwarding information: the resolved routes of each VRF as handed to hardware

use crate::ids::{InterfaceId, RouterId};
use crate::node::{Node, NodeMap, PublishFlag, Publishable, cow};
use lpm::{IpAddress, RoutePrefix};
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FibAction {
    Drop,
    ToCpu,
    NextHops,
}

impl Display for FibAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FibAction::Drop => write!(f, "DROP"),
            FibAction::ToCpu => write!(f, "TO_CPU"),
            FibAction::NextHops => write!(f, "NEXTHOPS"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FibNextHop {
    pub addr: IpAddr,
    pub interface: InterfaceId,
    pub weight: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FibRoute<A: IpAddress> {
    pub prefix: RoutePrefix<A>,
    pub action: FibAction,
    pub nexthops: Vec<FibNextHop>,
    pub admin_distance: u8,
    pub connected: bool,
    flag: PublishFlag,
}

impl<A: IpAddress> FibRoute<A> {
    #[must_use]
    pub fn new(prefix: RoutePrefix<A>, action: FibAction, nexthops: Vec<FibNextHop>) -> Self {
        Self {
            prefix,
            action,
            nexthops,
            admin_distance: 0,
            connected: false,
            flag: PublishFlag::new(),
        }
    }
}

impl<A: IpAddress> Publishable for FibRoute<A> {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl<A: IpAddress> Node for FibRoute<A> {
    type Key = RoutePrefix<A>;
    const KIND: &'static str = "fib route";

    fn key(&self) -> RoutePrefix<A> {
        self.prefix
    }
}

pub type FibRouteMapV4 = NodeMap<FibRoute<Ipv4Addr>>;
pub type FibRouteMapV6 = NodeMap<FibRoute<Ipv6Addr>>;

/// Resolved routes of one VRF
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardingInfoBase {
    pub vrf: RouterId,
    v4: Arc<FibRouteMapV4>,
    v6: Arc<FibRouteMapV6>,
    flag: PublishFlag,
}

impl ForwardingInfoBase {
    #[must_use]
    pub fn new(vrf: RouterId) -> Self {
        Self {
            vrf,
            v4: Arc::default(),
            v6: Arc::default(),
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn v4(&self) -> &FibRouteMapV4 {
        &self.v4
    }
    #[must_use]
    pub fn v6(&self) -> &FibRouteMapV6 {
        &self.v6
    }
    pub fn v4_mut(&mut self) -> &mut FibRouteMapV4 {
        self.flag.assert_mutable(Self::KIND);
        cow(&mut self.v4)
    }
    pub fn v6_mut(&mut self) -> &mut FibRouteMapV6 {
        self.flag.assert_mutable(Self::KIND);
        cow(&mut self.v6)
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.v4.len() + self.v6.len()
    }
}

impl Publishable for ForwardingInfoBase {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
    fn publish(&self) {
        self.v4.publish();
        self.v6.publish();
        self.flag.publish();
    }
}

impl Node for ForwardingInfoBase {
    type Key = RouterId;
    const KIND: &'static str = "fib";

    fn key(&self) -> RouterId {
        self.vrf
    }
}

pub type ForwardingInfoBaseMap = NodeMap<ForwardingInfoBase>;
