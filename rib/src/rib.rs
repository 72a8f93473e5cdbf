// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The routing information base: one route table per VRF

use crate::client::{AdminDistance, ClientId};
use crate::errors::RibError;
use crate::nexthop::{ECMP_WEIGHT, NextHop, RouteForwardAction, RouteNextHopEntry};
use crate::route::Route;
use crate::table::{RibFamily, RouteTable};
use crate::updater::RouteUpdater;
use lpm::AnyPrefix;
use serde::{Deserialize, Serialize};
use state::{InterfaceId, RouterId};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A route as announced by a routing client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicastRoute {
    pub prefix: AnyPrefix,
    pub action: RouteForwardAction,
    #[serde(default)]
    pub nexthops: Vec<NextHop>,
}

impl UnicastRoute {
    #[must_use]
    pub fn via(prefix: AnyPrefix, nexthops: Vec<NextHop>) -> Self {
        Self {
            prefix,
            action: RouteForwardAction::NextHops,
            nexthops,
        }
    }
    #[must_use]
    pub fn drop(prefix: AnyPrefix) -> Self {
        Self {
            prefix,
            action: RouteForwardAction::Drop,
            nexthops: vec![],
        }
    }
    #[must_use]
    pub fn to_cpu(prefix: AnyPrefix) -> Self {
        Self {
            prefix,
            action: RouteForwardAction::ToCpu,
            nexthops: vec![],
        }
    }

    fn entry(&self, admin_distance: AdminDistance) -> RouteNextHopEntry {
        match self.action {
            RouteForwardAction::Drop => RouteNextHopEntry::drop(admin_distance),
            RouteForwardAction::ToCpu => RouteNextHopEntry::to_cpu(admin_distance),
            RouteForwardAction::NextHops => RouteNextHopEntry::from_client_nexthops(
                self.nexthops.iter().copied().collect(),
                admin_distance,
            ),
        }
    }
}

/// The subnet of an interface address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceRoute {
    pub interface: InterfaceId,
    pub addr: IpAddr,
    pub len: u8,
}

/// A configured route
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticRoute {
    pub vrf: RouterId,
    pub prefix: AnyPrefix,
    pub action: RouteForwardAction,
    pub nexthops: Vec<IpAddr>,
}

impl StaticRoute {
    fn entry(&self) -> RouteNextHopEntry {
        match self.action {
            RouteForwardAction::Drop => RouteNextHopEntry::drop(AdminDistance::STATIC_ROUTE),
            RouteForwardAction::ToCpu => RouteNextHopEntry::to_cpu(AdminDistance::STATIC_ROUTE),
            RouteForwardAction::NextHops => RouteNextHopEntry::from_client_nexthops(
                self.nexthops
                    .iter()
                    .map(|addr| NextHop::unresolved(*addr, ECMP_WEIGHT))
                    .collect(),
                AdminDistance::STATIC_ROUTE,
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStatistics {
    pub v4_routes_added: usize,
    pub v4_routes_deleted: usize,
    pub v6_routes_added: usize,
    pub v6_routes_deleted: usize,
    pub duration: Duration,
}

impl UpdateStatistics {
    fn count_added(&mut self, prefix: &AnyPrefix) {
        if prefix.is_ipv4() {
            self.v4_routes_added += 1;
        } else {
            self.v6_routes_added += 1;
        }
    }
    fn count_deleted(&mut self, prefix: &AnyPrefix) {
        if prefix.is_ipv4() {
            self.v4_routes_deleted += 1;
        } else {
            self.v6_routes_deleted += 1;
        }
    }
}

/// Route tables of all VRFs. The default VRF always exists.
#[derive(Clone)]
pub struct RoutingInformationBase {
    tables: BTreeMap<RouterId, RouteTable>,
}

impl Default for RoutingInformationBase {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingInformationBase {
    #[must_use]
    pub fn new() -> Self {
        let mut rib = Self {
            tables: BTreeMap::new(),
        };
        rib.ensure_vrf(RouterId::DEFAULT);
        rib
    }

    /// Create the table of a VRF if it does not exist
    pub fn ensure_vrf(&mut self, vrf: RouterId) {
        self.tables.entry(vrf).or_insert_with(|| {
            debug!("Creating route table for VRF {vrf}");
            RouteTable::new()
        });
    }

    pub fn vrfs(&self) -> impl Iterator<Item = RouterId> + '_ {
        self.tables.keys().copied()
    }

    #[must_use]
    pub fn table(&self, vrf: RouterId) -> Option<&RouteTable> {
        self.tables.get(&vrf)
    }

    pub(crate) fn tables(&self) -> impl Iterator<Item = (&RouterId, &RouteTable)> {
        self.tables.iter()
    }

    fn table_mut(&mut self, vrf: RouterId) -> Result<&mut RouteTable, RibError> {
        self.tables.get_mut(&vrf).ok_or(RibError::NoSuchVrf(vrf))
    }

    /// Apply a batch of routes of one client to a VRF, then resolve the VRF again.
    /// With `reset`, the previous routes of the client in that VRF are removed first.
    pub fn update(
        &mut self,
        vrf: RouterId,
        client: ClientId,
        admin_distance: AdminDistance,
        to_add: &[UnicastRoute],
        to_del: &[AnyPrefix],
        reset: bool,
    ) -> Result<UpdateStatistics, RibError> {
        let start = Instant::now();
        let mut stats = UpdateStatistics::default();
        let table = self.table_mut(vrf)?;
        let adds: Vec<(AnyPrefix, RouteNextHopEntry)> = to_add
            .iter()
            .map(|route| {
                stats.count_added(&route.prefix);
                (route.prefix, route.entry(admin_distance))
            })
            .collect();
        for prefix in to_del {
            stats.count_deleted(prefix);
        }
        RouteUpdater::new(table).update(client, adds, to_del.iter().copied(), reset);
        stats.duration = start.elapsed();
        debug!(
            "RIB update of {client} in VRF {vrf}: {} added, {} deleted in {:?}",
            stats.v4_routes_added + stats.v6_routes_added,
            stats.v4_routes_deleted + stats.v6_routes_deleted,
            stats.duration
        );
        Ok(stats)
    }

    /// Make the interface and static routes of every VRF those of the configuration.
    /// VRFs without interface routes, other than the default one, are removed.
    pub fn reconfigure(
        &mut self,
        interface_routes: &BTreeMap<RouterId, Vec<InterfaceRoute>>,
        static_routes: &[StaticRoute],
    ) -> Result<(), RibError> {
        let stale: Vec<RouterId> = self
            .tables
            .keys()
            .filter(|vrf| **vrf != RouterId::DEFAULT && !interface_routes.contains_key(vrf))
            .copied()
            .collect();
        for vrf in stale {
            info!("Removing route table of VRF {vrf}");
            self.tables.remove(&vrf);
        }
        for vrf in interface_routes.keys() {
            self.ensure_vrf(*vrf);
        }
        for route in static_routes {
            if !self.tables.contains_key(&route.vrf) {
                return Err(RibError::InvalidRoute(
                    route.prefix.to_string(),
                    format!("VRF {} is not configured", route.vrf),
                ));
            }
        }

        let no_routes = Vec::new();
        for (vrf, table) in &mut self.tables {
            let mut updater = RouteUpdater::new(table);
            updater.remove_all_routes_for_client(ClientId::INTERFACE_ROUTE);
            updater.remove_all_routes_for_client(ClientId::STATIC_ROUTE);
            for route in interface_routes.get(vrf).unwrap_or(&no_routes) {
                updater
                    .add_interface_route(route.addr, route.len, route.interface)
                    .map_err(|e| RibError::InvalidRoute(route.addr.to_string(), e.to_string()))?;
            }
            for route in static_routes.iter().filter(|r| r.vrf == *vrf) {
                updater.add_route(route.prefix, ClientId::STATIC_ROUTE, route.entry());
            }
            updater.add_link_local_routes();
            updater.update_done();
            debug!("Reconfigured VRF {vrf}: {} routes", table.len());
        }
        Ok(())
    }

    /// Make the routes to the subnets of remote interfaces in `vrf` exactly `routes`
    pub fn update_remote_interface_routes(
        &mut self,
        vrf: RouterId,
        routes: &[InterfaceRoute],
    ) -> Result<(), RibError> {
        let table = self.table_mut(vrf)?;
        let mut updater = RouteUpdater::new(table);
        updater.remove_all_routes_for_client(ClientId::REMOTE_INTERFACE_ROUTE);
        for route in routes {
            updater
                .add_remote_interface_route(route.addr, route.len, route.interface)
                .map_err(|e| RibError::InvalidRoute(route.addr.to_string(), e.to_string()))?;
        }
        updater.update_done();
        Ok(())
    }

    /// Longest prefix match of an address in a VRF
    #[must_use]
    pub fn longest_match<A: RibFamily>(&self, vrf: RouterId, addr: A) -> Option<&Route<A>> {
        self.tables
            .get(&vrf)?
            .routes::<A>()
            .longest_match(addr)
            .map(|(_, route)| route)
    }
}
