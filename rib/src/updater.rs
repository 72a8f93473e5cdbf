// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Route table updates and recursive next-hop resolution

use crate::client::{AdminDistance, ClientId};
use crate::nexthop::{
    ECMP_WEIGHT, NextHop, NextHopWeight, RouteNextHopEntry, RouteNextHopSet, UCMP_DEFAULT_WEIGHT,
    total_weight,
};
use crate::route::Route;
use crate::table::{RibFamily, RouteTable};
use lpm::{AnyPrefix, IpAddress, RoutePrefix};
use state::InterfaceId;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{debug, warn};

/// Forwarding result of every next-hop of the entry being resolved
type NextHopForwardInfos = BTreeMap<NextHop, RouteNextHopSet>;

/// Non-forwarding outcomes met while resolving a route
#[derive(Debug, Default)]
struct Outcome {
    has_drop: bool,
    has_to_cpu: bool,
}

/// Applies client changes to the route table of one VRF. Changes are staged by the `add`/`del`
/// methods; [`RouteUpdater::update_done`] recomputes the forwarding information of every route.
pub struct RouteUpdater<'a> {
    table: &'a mut RouteTable,
}

impl<'a> RouteUpdater<'a> {
    pub fn new(table: &'a mut RouteTable) -> Self {
        Self { table }
    }

    /// Add or replace the entry of `client` for a prefix
    pub fn add_route(&mut self, prefix: AnyPrefix, client: ClientId, entry: RouteNextHopEntry) {
        match prefix {
            AnyPrefix::V4(p) => self.add_route_impl(p, client, entry),
            AnyPrefix::V6(p) => {
                if p.network().is_link_local() {
                    debug!("Ignoring v6 link-local route {p}");
                    return;
                }
                self.add_route_impl(p, client, entry);
            }
        }
    }

    fn add_route_impl<A: RibFamily>(
        &mut self,
        prefix: RoutePrefix<A>,
        client: ClientId,
        entry: RouteNextHopEntry,
    ) {
        if !client.is_interface_client()
            && let Some(nh) = entry
                .nexthops()
                .iter()
                .find(|nh| nh.is_resolved() && !is_v6_link_local(nh.addr()))
        {
            warn!("Route {prefix} of {client} comes with next-hop {nh} already resolved on an interface");
        }
        let routes = self.table.routes_mut::<A>();
        match routes.get_mut(&prefix) {
            Some(route) => {
                if !route.has(client, &entry) {
                    route.update(client, entry);
                }
            }
            None => {
                routes.insert(prefix, Route::new(prefix, client, entry));
            }
        }
    }

    /// Remove the entry of `client` for a prefix. The route goes away with its last entry.
    pub fn del_route(&mut self, prefix: AnyPrefix, client: ClientId) {
        match prefix {
            AnyPrefix::V4(p) => self.del_route_impl(p, client),
            AnyPrefix::V6(p) => self.del_route_impl(p, client),
        }
    }

    fn del_route_impl<A: RibFamily>(&mut self, prefix: RoutePrefix<A>, client: ClientId) {
        let routes = self.table.routes_mut::<A>();
        let Some(route) = routes.get_mut(&prefix) else {
            debug!("Failed to delete route {prefix} of {client}: not found");
            return;
        };
        route.del_entry_for_client(client);
        debug!("Deleted next-hops for prefix {prefix} of {client}");
        if route.has_no_entry() {
            routes.remove(&prefix);
            debug!("Deleted route {prefix}");
        }
    }

    /// Remove every entry of a client, in both families
    pub fn remove_all_routes_for_client(&mut self, client: ClientId) {
        self.remove_all_routes_for_client_impl::<Ipv4Addr>(client);
        self.remove_all_routes_for_client_impl::<Ipv6Addr>(client);
    }

    fn remove_all_routes_for_client_impl<A: RibFamily>(&mut self, client: ClientId) {
        let routes = self.table.routes_mut::<A>();
        for (_, route) in routes.iter_mut() {
            route.del_entry_for_client(client);
        }
        routes.retain(|_, route| !route.has_no_entry());
    }

    /// Add the route to the subnet of a local interface address
    pub fn add_interface_route(
        &mut self,
        addr: IpAddr,
        len: u8,
        intf: InterfaceId,
    ) -> Result<(), lpm::PrefixError> {
        self.add_connected_route(ClientId::INTERFACE_ROUTE, addr, len, intf)
    }

    /// Add the route to the subnet of an interface of a remote switch
    pub fn add_remote_interface_route(
        &mut self,
        addr: IpAddr,
        len: u8,
        intf: InterfaceId,
    ) -> Result<(), lpm::PrefixError> {
        self.add_connected_route(ClientId::REMOTE_INTERFACE_ROUTE, addr, len, intf)
    }

    fn add_connected_route(
        &mut self,
        client: ClientId,
        addr: IpAddr,
        len: u8,
        intf: InterfaceId,
    ) -> Result<(), lpm::PrefixError> {
        let prefix = AnyPrefix::masked(addr, len)?;
        let entry = RouteNextHopEntry::from_nexthop(
            NextHop::resolved(addr, intf, UCMP_DEFAULT_WEIGHT),
            AdminDistance::DIRECTLY_CONNECTED,
        );
        self.add_route(prefix, client, entry);
        Ok(())
    }

    /// Remove the route to the subnet of a local interface address
    pub fn del_interface_route(&mut self, addr: IpAddr, len: u8) -> Result<(), lpm::PrefixError> {
        self.del_route(AnyPrefix::masked(addr, len)?, ClientId::INTERFACE_ROUTE);
        Ok(())
    }

    fn link_local_prefix() -> RoutePrefix<Ipv6Addr> {
        RoutePrefix::masked(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 64)
            .unwrap_or_else(|_| RoutePrefix::root())
    }

    /// Punt the v6 link-local subnet to the CPU
    pub fn add_link_local_routes(&mut self) {
        self.add_route_impl(
            Self::link_local_prefix(),
            ClientId::LINKLOCAL_ROUTE,
            RouteNextHopEntry::to_cpu(AdminDistance::DIRECTLY_CONNECTED),
        );
    }

    pub fn del_link_local_routes(&mut self) {
        self.del_route_impl(Self::link_local_prefix(), ClientId::LINKLOCAL_ROUTE);
    }

    /// Apply a batch of changes of one client and resolve the table again.
    /// With `reset`, all previous entries of the client are dropped first.
    pub fn update(
        &mut self,
        client: ClientId,
        to_add: impl IntoIterator<Item = (AnyPrefix, RouteNextHopEntry)>,
        to_del: impl IntoIterator<Item = AnyPrefix>,
        reset: bool,
    ) {
        if reset {
            self.remove_all_routes_for_client(client);
        }
        for prefix in to_del {
            self.del_route(prefix, client);
        }
        for (prefix, entry) in to_add {
            self.add_route(prefix, client, entry);
        }
        self.update_done();
    }

    /// Recompute the forwarding information of all routes
    pub fn update_done(&mut self) {
        // next-hops may resolve across families: clear both before resolving any
        self.clear_forward::<Ipv4Addr>();
        self.clear_forward::<Ipv6Addr>();
        self.resolve::<Ipv4Addr>();
        self.resolve::<Ipv6Addr>();
    }

    fn clear_forward<A: RibFamily>(&mut self) {
        for (_, route) in self.table.routes_mut::<A>().iter_mut() {
            route.clear_forward();
        }
    }

    fn resolve<A: RibFamily>(&mut self) {
        let prefixes: Vec<RoutePrefix<A>> = self.table.routes::<A>().prefixes().collect();
        for prefix in prefixes {
            let pending = self
                .table
                .routes::<A>()
                .get(&prefix)
                .is_some_and(Route::need_resolve);
            if pending {
                self.resolve_one(prefix);
            }
        }
    }

    fn resolve_one<A: RibFamily>(&mut self, prefix: RoutePrefix<A>) {
        let Some(route) = self.table.routes_mut::<A>().get_mut(&prefix) else {
            return;
        };
        // cleared by set_resolved() or set_unresolvable()
        route.set_processing();
        let (client, best) = match route.best_entry() {
            Ok((client, entry)) => (client, entry.clone()),
            Err(e) => {
                warn!("Cannot resolve route {prefix}: {e}");
                route.set_unresolvable();
                return;
            }
        };

        let mut outcome = Outcome::default();
        let mut fwd = RouteNextHopSet::new();
        if best.is_drop() {
            outcome.has_drop = true;
        } else if best.is_to_cpu() {
            outcome.has_to_cpu = true;
        } else {
            let mut nh_to_fwds = NextHopForwardInfos::new();
            for nh in best.nexthops() {
                // interface routes and v6 link-local next-hops come resolved
                if nh.is_resolved() {
                    nh_to_fwds.entry(*nh).or_default().insert(*nh);
                    continue;
                }
                let resolved = self.fwd_info_from_nhop(nh.addr(), &mut outcome);
                nh_to_fwds.entry(*nh).or_default().extend(resolved);
            }
            fwd = merge_forward_infos(&nh_to_fwds, &prefix.to_string());
        }

        let Some(route) = self.table.routes_mut::<A>().get_mut(&prefix) else {
            return;
        };
        match RouteNextHopEntry::from_nexthops(fwd, AdminDistance::MAX) {
            Ok(_) if outcome.has_drop => {
                debug!("Route {prefix} has both DROP and next-hops, resolved to DROP");
                route.set_resolved(RouteNextHopEntry::drop(AdminDistance::MAX));
            }
            Ok(entry) => {
                route.set_resolved(entry);
                if client.is_interface_client() {
                    route.set_connected();
                }
            }
            Err(_) if outcome.has_drop => {
                if outcome.has_to_cpu {
                    warn!("Route {prefix} resolves to both DROP and TO_CPU, resolved to DROP");
                }
                route.set_resolved(RouteNextHopEntry::drop(AdminDistance::MAX));
            }
            Err(_) if outcome.has_to_cpu => {
                route.set_resolved(RouteNextHopEntry::to_cpu(AdminDistance::MAX));
            }
            Err(_) => route.set_unresolvable(),
        }
        debug!(
            "{} route {prefix}",
            if route.is_resolved() {
                "Resolved"
            } else {
                "Cannot resolve"
            }
        );
    }

    fn fwd_info_from_nhop(&mut self, addr: IpAddr, outcome: &mut Outcome) -> RouteNextHopSet {
        match addr {
            IpAddr::V4(a) => self.fwd_info_from_nhop_impl(a, outcome),
            IpAddr::V6(a) => self.fwd_info_from_nhop_impl(a, outcome),
        }
    }

    fn fwd_info_from_nhop_impl<A: RibFamily>(
        &mut self,
        nh: A,
        outcome: &mut Outcome,
    ) -> RouteNextHopSet {
        let mut fwd = RouteNextHopSet::new();
        let Some((matched, pending)) = self
            .table
            .routes::<A>()
            .longest_match(nh)
            .map(|(p, route)| (*p, route.need_resolve()))
        else {
            debug!("Could not find subnet for next-hop {nh}");
            return fwd;
        };
        if pending {
            self.resolve_one(matched);
        }
        let Some(route) = self.table.routes::<A>().get(&matched) else {
            return fwd;
        };
        let Some(info) = route.fwd().filter(|_| route.is_resolved()) else {
            return fwd;
        };
        if info.is_drop() {
            outcome.has_drop = true;
        } else if info.is_to_cpu() {
            outcome.has_to_cpu = true;
        } else if route.is_connected() {
            // leaf of a weighted resolution: weight must be UCMP compatible
            if let Some(intf) = info.nexthops().first().and_then(NextHop::intf) {
                fwd.insert(NextHop::resolved(nh.into(), intf, UCMP_DEFAULT_WEIGHT));
            }
        } else {
            fwd.extend(info.nexthops().iter().copied());
        }
        fwd
    }
}

/// Only v6 link-local next-hops may come from a client bound to an interface
fn is_v6_link_local(addr: IpAddr) -> bool {
    matches!(addr, IpAddr::V6(a) if a.is_unicast_link_local())
}

fn gcd(a: NextHopWeight, b: NextHopWeight) -> NextHopWeight {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: NextHopWeight, b: NextHopWeight) -> NextHopWeight {
    if a == 0 || b == 0 {
        0
    } else {
        (a / gcd(a, b)).saturating_mul(b)
    }
}

fn has_ecmp_nexthop(nh_to_fwds: &NextHopForwardInfos) -> bool {
    nh_to_fwds.keys().any(|nh| nh.weight() == ECMP_WEIGHT)
}

/// Any next-hop of weight 0 turns the whole resolution into ECMP
fn merge_forward_infos_ecmp(nh_to_fwds: &NextHopForwardInfos, route: &str) -> RouteNextHopSet {
    let mut fwd = RouteNextHopSet::new();
    for (nh, resolved) in nh_to_fwds {
        if nh.weight() != ECMP_WEIGHT {
            warn!(
                "While resolving {route} defaulting resolution of weighted next hop {nh} to ECMP because another next hop has weight 0"
            );
        }
        for fnh in resolved {
            if let Some(intf) = fnh.intf() {
                fwd.insert(NextHop::resolved(fnh.addr(), intf, ECMP_WEIGHT));
            }
        }
    }
    fwd
}

/// Scale the resolved sets to the lcm of their total weights so that the ratios between the
/// top level next-hops and within each resolved set are both kept. Weights of the same
/// (address, interface) coming from different sets add up.
fn combine_weights(
    nh_to_fwds: &NextHopForwardInfos,
    route: &str,
) -> BTreeMap<(IpAddr, InterfaceId), NextHopWeight> {
    let l = nh_to_fwds
        .values()
        .fold(1, |acc, resolved| lcm(acc, total_weight(resolved)));
    let mut combined = BTreeMap::new();
    for (unh, resolved) in nh_to_fwds {
        if resolved.is_empty() {
            continue;
        }
        let t = total_weight(resolved);
        // a zero total is an ECMP set below: the 0 propagates up
        let normalization = if t == 0 { 0 } else { l / t };
        let mut logged = false;
        for fnh in resolved {
            let Some(intf) = fnh.intf() else {
                continue;
            };
            let w = fnh
                .weight()
                .saturating_mul(normalization)
                .saturating_mul(unh.weight());
            if !logged && w == 0 && unh.weight() != 0 {
                warn!(
                    "While resolving {route} defaulting resolution of weighted next hop {unh} to ECMP because another next hop in the resolution tree uses ECMP"
                );
                logged = true;
            }
            let total = combined.entry((fnh.addr(), intf)).or_insert(0);
            *total = NextHopWeight::saturating_add(*total, w);
        }
    }
    combined
}

/// Divide all weights by their gcd
fn optimize_weights(combined: &BTreeMap<(IpAddr, InterfaceId), NextHopWeight>) -> RouteNextHopSet {
    let g = combined.values().fold(0, |g, w| if g == 0 { *w } else { gcd(g, *w) });
    combined
        .iter()
        .map(|((addr, intf), w)| NextHop::resolved(*addr, *intf, if g == 0 { 0 } else { w / g }))
        .collect()
}

fn merge_forward_infos(nh_to_fwds: &NextHopForwardInfos, route: &str) -> RouteNextHopSet {
    if has_ecmp_nexthop(nh_to_fwds) {
        merge_forward_infos_ecmp(nh_to_fwds, route)
    } else {
        optimize_weights(&combine_weights(nh_to_fwds, route))
    }
}
