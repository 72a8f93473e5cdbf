// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Synchronization of the resolved routes into the forwarding state

use crate::rib::RoutingInformationBase;
use crate::route::Route;
use crate::table::{RibFamily, RouteTable};
use lpm::RoutePrefix;
use state::{FibRoute, ForwardingInfoBase, NodeMap, RouterId, SwitchState};
use std::collections::BTreeSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::debug;

/// Changes to apply to the routes of one family of a FIB
struct FibChanges<A: RibFamily> {
    upserts: Vec<FibRoute<A>>,
    removals: Vec<RoutePrefix<A>>,
}

impl<A: RibFamily> FibChanges<A> {
    fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    fn apply(self, routes: &mut NodeMap<FibRoute<A>>) {
        for prefix in &self.removals {
            let _ = routes.remove_node(prefix);
        }
        for route in self.upserts {
            routes.add_or_update_node(route);
        }
    }
}

/// Only resolved routes are forwarded
fn fib_route<A: RibFamily>(route: &Route<A>) -> Option<FibRoute<A>> {
    if !route.is_resolved() {
        return None;
    }
    let fwd = route.fwd()?;
    let (action, nexthops) = fwd.to_fib();
    let mut fib = FibRoute::new(route.prefix(), action, nexthops);
    fib.admin_distance = route.best_entry().ok()?.1.admin_distance().0;
    fib.connected = route.is_connected();
    Some(fib)
}

fn fib_changes<A: RibFamily>(
    table: &RouteTable,
    current: Option<&NodeMap<FibRoute<A>>>,
) -> FibChanges<A> {
    let mut upserts = Vec::new();
    let mut wanted = BTreeSet::new();
    for (prefix, route) in table.routes::<A>().iter() {
        let Some(fib) = fib_route(route) else {
            continue;
        };
        wanted.insert(*prefix);
        if current.and_then(|c| c.get(prefix)).is_none_or(|old| **old != fib) {
            upserts.push(fib);
        }
    }
    let removals = current
        .map(|c| c.keys().filter(|p| !wanted.contains(*p)).copied().collect())
        .unwrap_or_default();
    FibChanges { upserts, removals }
}

impl RoutingInformationBase {
    /// Bring the forwarding state of every VRF in line with the resolved routes.
    /// `state` is only modified if something differs; returns whether it was.
    pub fn sync_fib(&self, state: &mut Arc<SwitchState>) -> bool {
        let mut changed = false;

        let stale: Vec<RouterId> = state
            .fibs()
            .keys()
            .filter(|vrf| self.table(**vrf).is_none())
            .copied()
            .collect();
        for vrf in stale {
            debug!("Removing FIB of VRF {vrf}");
            let _ = SwitchState::modify(state).fibs_mut().remove_node(&vrf);
            changed = true;
        }

        for (vrf, table) in self.tables() {
            let current = state.fibs().get(vrf).cloned();
            let v4 = fib_changes::<Ipv4Addr>(table, current.as_deref().map(ForwardingInfoBase::v4));
            let v6 = fib_changes::<Ipv6Addr>(table, current.as_deref().map(ForwardingInfoBase::v6));
            let exists = current.is_some();
            drop(current);
            if exists && v4.is_empty() && v6.is_empty() {
                continue;
            }
            debug!(
                "Syncing FIB of VRF {vrf}: {} v4 and {} v6 updates, {} v4 and {} v6 removals",
                v4.upserts.len(),
                v6.upserts.len(),
                v4.removals.len(),
                v6.removals.len()
            );
            let fibs = SwitchState::modify(state).fibs_mut();
            if !fibs.contains(vrf) {
                fibs.add_or_update_node(ForwardingInfoBase::new(*vrf));
            }
            if let Some(fib) = fibs.modify_node(vrf) {
                v4.apply(<Ipv4Addr as RibFamily>::fib_routes_mut(fib));
                v6.apply(<Ipv6Addr as RibFamily>::fib_routes_mut(fib));
            }
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdminDistance, ClientId};
    use crate::nexthop::NextHop;
    use crate::rib::{InterfaceRoute, UnicastRoute};
    use lpm::AnyPrefix;
    use state::{FibAction, FibNextHop, InterfaceId, Publishable};
    use std::collections::BTreeMap;

    fn configured_rib() -> RoutingInformationBase {
        let mut rib = RoutingInformationBase::new();
        rib.reconfigure(
            &BTreeMap::from([(
                RouterId::DEFAULT,
                vec![InterfaceRoute {
                    interface: InterfaceId(5),
                    addr: "1.1.1.10".parse().unwrap(),
                    len: 24,
                }],
            )]),
            &[],
        )
        .unwrap();
        rib
    }

    fn add_bgp(rib: &mut RoutingInformationBase, prefix: &str, nh: &str) {
        rib.update(
            RouterId::DEFAULT,
            ClientId::BGPD,
            AdminDistance::EBGP,
            &[UnicastRoute::via(
                AnyPrefix::expect_from(prefix),
                vec![NextHop::unresolved(nh.parse().unwrap(), 1)],
            )],
            &[],
            false,
        )
        .unwrap();
    }

    #[test]
    fn test_sync_fib() {
        let mut rib = configured_rib();
        add_bgp(&mut rib, "10.0.0.0/24", "1.1.1.1");
        // never resolves, never forwarded
        add_bgp(&mut rib, "20.0.0.0/24", "3.3.3.3");

        let mut state = Arc::new(SwitchState::new());
        state.publish();
        let old = state.clone();
        assert!(rib.sync_fib(&mut state));
        assert!(!Arc::ptr_eq(&old, &state));
        assert!(old.fibs().is_empty());

        let fib = state.fibs().get(&RouterId::DEFAULT).unwrap();
        let prefix = "10.0.0.0/24".parse().unwrap();
        let route = fib.v4().get(&prefix).unwrap();
        assert_eq!(route.action, FibAction::NextHops);
        assert_eq!(
            route.nexthops,
            vec![FibNextHop {
                addr: "1.1.1.1".parse().unwrap(),
                interface: InterfaceId(5),
                weight: 1
            }]
        );
        assert_eq!(route.admin_distance, AdminDistance::EBGP.0);
        assert!(!route.connected);
        assert!(fib.v4().get(&"1.1.1.0/24".parse().unwrap()).unwrap().connected);
        assert!(fib.v4().get(&"20.0.0.0/24".parse().unwrap()).is_none());
        // link-local punt route
        assert_eq!(fib.v6().len(), 1);

        // nothing changed, nothing to do
        state.publish();
        let published = state.clone();
        assert!(!rib.sync_fib(&mut state));
        assert!(Arc::ptr_eq(&published, &state));
    }

    #[test]
    fn test_sync_fib_removes_routes() {
        let mut rib = configured_rib();
        add_bgp(&mut rib, "10.0.0.0/24", "1.1.1.1");
        let mut state = Arc::new(SwitchState::new());
        assert!(rib.sync_fib(&mut state));
        state.publish();
        let before = state.clone();

        rib.update(
            RouterId::DEFAULT,
            ClientId::BGPD,
            AdminDistance::EBGP,
            &[],
            &[AnyPrefix::expect_from("10.0.0.0/24")],
            false,
        )
        .unwrap();
        assert!(rib.sync_fib(&mut state));
        let fib = state.fibs().get(&RouterId::DEFAULT).unwrap();
        assert!(fib.v4().get(&"10.0.0.0/24".parse().unwrap()).is_none());
        // untouched routes are shared with the previous version
        let connected = "1.1.1.0/24".parse().unwrap();
        let old_fib = before.fibs().get(&RouterId::DEFAULT).unwrap();
        assert!(Arc::ptr_eq(
            old_fib.v4().get(&connected).unwrap(),
            fib.v4().get(&connected).unwrap()
        ));
    }
}
