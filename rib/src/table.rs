// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-VRF route tables

use crate::route::Route;
use lpm::{IpAddress, NetworkToRouteMap};
use state::{FibRoute, ForwardingInfoBase, NodeMap};
use std::net::{Ipv4Addr, Ipv6Addr};

pub type RouteMap<A> = NetworkToRouteMap<A, Route<A>>;

/// The IPv4 and IPv6 routes of one VRF
#[derive(Clone, Default)]
pub struct RouteTable {
    v4: RouteMap<Ipv4Addr>,
    v6: RouteMap<Ipv6Addr>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn v4(&self) -> &RouteMap<Ipv4Addr> {
        &self.v4
    }

    #[must_use]
    pub fn v6(&self) -> &RouteMap<Ipv6Addr> {
        &self.v6
    }

    /// Routes of family `A`
    #[must_use]
    pub fn routes<A: RibFamily>(&self) -> &RouteMap<A> {
        A::routes(self)
    }

    pub fn routes_mut<A: RibFamily>(&mut self) -> &mut RouteMap<A> {
        A::routes_mut(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}

/// An address family the RIB handles: selects the matching tables of a VRF,
/// both in the RIB and in the published forwarding state.
pub trait RibFamily: IpAddress {
    fn routes(table: &RouteTable) -> &RouteMap<Self>;
    fn routes_mut(table: &mut RouteTable) -> &mut RouteMap<Self>;
    fn fib_routes(fib: &ForwardingInfoBase) -> &NodeMap<FibRoute<Self>>;
    fn fib_routes_mut(fib: &mut ForwardingInfoBase) -> &mut NodeMap<FibRoute<Self>>;
}

impl RibFamily for Ipv4Addr {
    fn routes(table: &RouteTable) -> &RouteMap<Self> {
        &table.v4
    }
    fn routes_mut(table: &mut RouteTable) -> &mut RouteMap<Self> {
        &mut table.v4
    }
    fn fib_routes(fib: &ForwardingInfoBase) -> &NodeMap<FibRoute<Self>> {
        fib.v4()
    }
    fn fib_routes_mut(fib: &mut ForwardingInfoBase) -> &mut NodeMap<FibRoute<Self>> {
        fib.v4_mut()
    }
}

impl RibFamily for Ipv6Addr {
    fn routes(table: &RouteTable) -> &RouteMap<Self> {
        &table.v6
    }
    fn routes_mut(table: &mut RouteTable) -> &mut RouteMap<Self> {
        &mut table.v6
    }
    fn fib_routes(fib: &ForwardingInfoBase) -> &NodeMap<FibRoute<Self>> {
        fib.v6()
    }
    fn fib_routes_mut(fib: &mut ForwardingInfoBase) -> &mut NodeMap<FibRoute<Self>> {
        fib.v6_mut()
    }
}
