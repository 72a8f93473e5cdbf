// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display of RIB objects

use crate::nexthop::{NextHop, RouteForwardAction, RouteNextHopEntry};
use crate::rib::RoutingInformationBase;
use crate::route::Route;
use crate::table::{RouteMap, RouteTable};
use lpm::IpAddress;
use std::fmt::Display;

const LINE_WIDTH: usize = 81;

struct Heading(String);
impl Display for Heading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = LINE_WIDTH.saturating_sub(self.0.len() + 2) / 2;
        write!(f, " {0:─<width$}", "─", width = len)?;
        write!(f, " {} ", self.0)?;
        writeln!(f, " {0:─<width$}", "─", width = len)
    }
}

impl Display for NextHop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextHop::Resolved { addr, intf, weight } => {
                write!(f, "via {addr} interface:{intf} weight:{weight}")
            }
            NextHop::Unresolved { addr, weight } => write!(f, "via {addr} weight:{weight}"),
        }
    }
}

impl Display for RouteForwardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteForwardAction::Drop => write!(f, "DROP"),
            RouteForwardAction::ToCpu => write!(f, "TO_CPU"),
            RouteForwardAction::NextHops => write!(f, "NEXTHOPS"),
        }
    }
}

impl Display for RouteNextHopEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.action(), self.admin_distance())?;
        for nh in self.nexthops() {
            write!(f, " {nh}")?;
        }
        Ok(())
    }
}

impl<A: IpAddress> Display for Route<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())?;
        if self.is_connected() {
            write!(f, " (connected)")?;
        }
        match self.fwd() {
            Some(fwd) if self.is_resolved() => writeln!(f, " => {fwd}")?,
            _ => writeln!(f, " => unresolved")?,
        }
        for (client, entry) in self.entries().iter() {
            writeln!(f, "       {client}: {entry}")?;
        }
        Ok(())
    }
}

fn fmt_routes<A: IpAddress>(
    f: &mut std::fmt::Formatter<'_>,
    family: &str,
    routes: &RouteMap<A>,
) -> std::fmt::Result {
    Heading(format!("{family} routes ({})", routes.len())).fmt(f)?;
    for (_, route) in routes.iter() {
        write!(f, "  {route}")?;
    }
    Ok(())
}

impl Display for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_routes(f, "Ipv4", self.v4())?;
        fmt_routes(f, "Ipv6", self.v6())
    }
}

impl Display for RoutingInformationBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (vrf, table) in self.tables() {
            writeln!(f, " Vrf: {vrf}")?;
            table.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{AdminDistance, ClientId};
    use crate::nexthop::{NextHop, RouteNextHopEntry, RouteNextHopSet};
    use crate::route::Route;
    use lpm::RoutePrefix;
    use std::net::Ipv4Addr;

    #[test]
    fn test_route_display() {
        let prefix = RoutePrefix::<Ipv4Addr>::masked("10.0.0.0".parse().unwrap(), 24).unwrap();
        let entry = RouteNextHopEntry::from_nexthops(
            RouteNextHopSet::from([NextHop::unresolved("1.1.1.1".parse().unwrap(), 1)]),
            AdminDistance::EBGP,
        )
        .unwrap();
        let route = Route::new(prefix, ClientId::BGPD, entry);
        let out = route.to_string();
        assert!(out.starts_with("10.0.0.0/24 => unresolved"));
        assert!(out.contains("bgpd: NEXTHOPS [20] via 1.1.1.1 weight:1"));
    }
}
