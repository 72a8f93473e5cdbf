// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Next-hops and the forwarding entries built from them

use crate::client::AdminDistance;
use crate::errors::RouteError;
use serde::{Deserialize, Serialize};
use state::{FibAction, FibNextHop, InterfaceId};
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::warn;

pub type NextHopWeight = u64;

/// Weight of a next-hop taking part in equal-cost multipath
pub const ECMP_WEIGHT: NextHopWeight = 0;
/// Weight given to next-hops resolved over a connected route, so that they can be
/// the leaves of a weighted resolution
pub const UCMP_DEFAULT_WEIGHT: NextHopWeight = 1;

/// A next-hop, either bound to an interface or pending a recursive lookup of its address
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextHop {
    Resolved {
        addr: IpAddr,
        intf: InterfaceId,
        weight: NextHopWeight,
    },
    Unresolved {
        addr: IpAddr,
        weight: NextHopWeight,
    },
}

impl NextHop {
    #[must_use]
    pub fn resolved(addr: IpAddr, intf: InterfaceId, weight: NextHopWeight) -> Self {
        NextHop::Resolved { addr, intf, weight }
    }

    #[must_use]
    pub fn unresolved(addr: IpAddr, weight: NextHopWeight) -> Self {
        NextHop::Unresolved { addr, weight }
    }

    #[must_use]
    pub fn addr(&self) -> IpAddr {
        match *self {
            NextHop::Resolved { addr, .. } | NextHop::Unresolved { addr, .. } => addr,
        }
    }

    #[must_use]
    pub fn weight(&self) -> NextHopWeight {
        match *self {
            NextHop::Resolved { weight, .. } | NextHop::Unresolved { weight, .. } => weight,
        }
    }

    #[must_use]
    pub fn intf(&self) -> Option<InterfaceId> {
        match *self {
            NextHop::Resolved { intf, .. } => Some(intf),
            NextHop::Unresolved { .. } => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, NextHop::Resolved { .. })
    }
}

pub type RouteNextHopSet = BTreeSet<NextHop>;

/// Sum of the weights of a set, saturated at the largest weight
#[must_use]
pub fn total_weight(set: &RouteNextHopSet) -> NextHopWeight {
    set.iter()
        .map(NextHop::weight)
        .fold(0, NextHopWeight::saturating_add)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteForwardAction {
    Drop,
    ToCpu,
    NextHops,
}

/// What a client wants done with the traffic of a prefix: drop it, punt it, or forward it
/// over a non-empty set of next-hops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteNextHopEntry {
    action: RouteForwardAction,
    admin_distance: AdminDistance,
    nexthops: RouteNextHopSet,
}

impl RouteNextHopEntry {
    #[must_use]
    pub fn drop(admin_distance: AdminDistance) -> Self {
        Self {
            action: RouteForwardAction::Drop,
            admin_distance,
            nexthops: RouteNextHopSet::new(),
        }
    }

    #[must_use]
    pub fn to_cpu(admin_distance: AdminDistance) -> Self {
        Self {
            action: RouteForwardAction::ToCpu,
            admin_distance,
            nexthops: RouteNextHopSet::new(),
        }
    }

    /// Build a forwarding entry. An empty set is rejected.
    pub fn from_nexthops(
        nexthops: RouteNextHopSet,
        admin_distance: AdminDistance,
    ) -> Result<Self, RouteError> {
        if nexthops.is_empty() {
            return Err(RouteError::EmptyNextHopSet);
        }
        Ok(Self {
            action: RouteForwardAction::NextHops,
            admin_distance,
            nexthops,
        })
    }

    #[must_use]
    pub fn from_nexthop(nexthop: NextHop, admin_distance: AdminDistance) -> Self {
        Self {
            action: RouteForwardAction::NextHops,
            admin_distance,
            nexthops: RouteNextHopSet::from([nexthop]),
        }
    }

    /// Build the entry of a client route. An empty next-hop set never yields a zero-member
    /// group: the route is forced to drop.
    #[must_use]
    pub fn from_client_nexthops(nexthops: RouteNextHopSet, admin_distance: AdminDistance) -> Self {
        match Self::from_nexthops(nexthops, admin_distance) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("{e}: route set to DROP");
                Self::drop(admin_distance)
            }
        }
    }

    #[must_use]
    pub fn action(&self) -> RouteForwardAction {
        self.action
    }

    #[must_use]
    pub fn admin_distance(&self) -> AdminDistance {
        self.admin_distance
    }

    #[must_use]
    pub fn nexthops(&self) -> &RouteNextHopSet {
        &self.nexthops
    }

    #[must_use]
    pub fn is_drop(&self) -> bool {
        self.action == RouteForwardAction::Drop
    }

    #[must_use]
    pub fn is_to_cpu(&self) -> bool {
        self.action == RouteForwardAction::ToCpu
    }

    /// The action and members of this entry as programmed in hardware.
    /// Unresolved members are never programmed.
    #[must_use]
    pub fn to_fib(&self) -> (FibAction, Vec<FibNextHop>) {
        match self.action {
            RouteForwardAction::Drop => (FibAction::Drop, vec![]),
            RouteForwardAction::ToCpu => (FibAction::ToCpu, vec![]),
            RouteForwardAction::NextHops => (
                FibAction::NextHops,
                self.nexthops
                    .iter()
                    .filter_map(|nh| match *nh {
                        NextHop::Resolved { addr, intf, weight } => Some(FibNextHop {
                            addr,
                            interface: intf,
                            weight,
                        }),
                        NextHop::Unresolved { .. } => None,
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn addr(a: &str) -> IpAddr {
        a.parse().unwrap()
    }

    #[test]
    fn test_empty_nexthop_set_rejected() {
        assert_eq!(
            RouteNextHopEntry::from_nexthops(RouteNextHopSet::new(), AdminDistance::EBGP),
            Err(RouteError::EmptyNextHopSet)
        );
    }

    #[traced_test]
    #[test]
    fn test_empty_client_nexthops_become_drop() {
        let entry =
            RouteNextHopEntry::from_client_nexthops(RouteNextHopSet::new(), AdminDistance::EBGP);
        assert!(entry.is_drop());
        assert!(entry.nexthops().is_empty());
        assert_eq!(entry.admin_distance(), AdminDistance::EBGP);
        assert!(logs_contain("route set to DROP"));
    }

    #[test]
    fn test_nexthop_accessors() {
        let r = NextHop::resolved(addr("10.0.0.1"), InterfaceId(5), 3);
        let u = NextHop::unresolved(addr("2001:db8::1"), ECMP_WEIGHT);
        assert_eq!(r.intf(), Some(InterfaceId(5)));
        assert_eq!(u.intf(), None);
        assert!(r.is_resolved() && !u.is_resolved());
        assert_eq!(total_weight(&RouteNextHopSet::from([r, u])), 3);
    }

    #[test]
    fn test_total_weight_saturates() {
        let set = RouteNextHopSet::from([
            NextHop::unresolved(addr("10.0.0.1"), NextHopWeight::MAX),
            NextHop::unresolved(addr("10.0.0.2"), 2),
        ]);
        assert_eq!(total_weight(&set), NextHopWeight::MAX);
    }

    #[test]
    fn test_to_fib_skips_unresolved() {
        let set = RouteNextHopSet::from([
            NextHop::resolved(addr("10.0.0.1"), InterfaceId(5), 1),
            NextHop::unresolved(addr("10.0.0.2"), 1),
        ]);
        let entry = RouteNextHopEntry::from_nexthops(set, AdminDistance::MAX).unwrap();
        let (action, nhs) = entry.to_fib();
        assert_eq!(action, FibAction::NextHops);
        assert_eq!(
            nhs,
            vec![FibNextHop {
                addr: addr("10.0.0.1"),
                interface: InterfaceId(5),
                weight: 1
            }]
        );
    }
}
