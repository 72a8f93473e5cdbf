// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Which remote switches can be reached over which local fabric ports

use crate::asic::AsicProfile;
use crate::endpoint::FabricEndpoint;
use state::{DeltaEntry, PortId, StateDelta, StateObserver, SwitchId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReachabilityChange {
    /// The set of ports reaching a switch changed, and is not empty
    Reachable {
        switch_id: SwitchId,
        ports: BTreeSet<PortId>,
    },
    Unreachable(SwitchId),
}

/// Interface nodes of the fabric, by base switch id
#[derive(Clone, Debug, PartialEq, Eq)]
struct InterfaceNode {
    name: String,
    num_cores: u64,
}

#[derive(Debug, Default)]
pub struct FabricReachabilityManager {
    nodes: BTreeMap<SwitchId, InterfaceNode>,
    reachability: BTreeMap<SwitchId, BTreeSet<PortId>>,
}

impl FabricReachabilityManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the reachability from the current fabric endpoints. Only attached endpoints
    /// count, whether or not they are the expected ones.
    pub fn recompute(
        &mut self,
        endpoints: &BTreeMap<PortId, FabricEndpoint>,
    ) -> Vec<ReachabilityChange> {
        let mut next: BTreeMap<SwitchId, BTreeSet<PortId>> = BTreeMap::new();
        for (port, endpoint) in endpoints.iter().filter(|(_, e)| e.is_attached) {
            next.entry(endpoint.switch_id).or_default().insert(*port);
        }

        let mut changes = vec![];
        for (switch_id, ports) in &next {
            if self.reachability.get(switch_id) != Some(ports) {
                changes.push(ReachabilityChange::Reachable {
                    switch_id: *switch_id,
                    ports: ports.clone(),
                });
            }
        }
        for switch_id in self.reachability.keys().filter(|s| !next.contains_key(*s)) {
            info!("Switch {switch_id} is no longer reachable");
            changes.push(ReachabilityChange::Unreachable(*switch_id));
        }
        self.reachability = next;
        changes
    }

    #[must_use]
    pub fn reachable_ports(&self, switch_id: SwitchId) -> Option<&BTreeSet<PortId>> {
        self.reachability.get(&switch_id)
    }

    #[must_use]
    pub fn is_reachable(&self, switch_id: SwitchId) -> bool {
        self.reachability.contains_key(&switch_id)
    }

    /// Interface nodes none of whose cores is reachable
    #[must_use]
    pub fn unreachable_nodes(&self) -> Vec<(SwitchId, &str)> {
        self.nodes
            .iter()
            .filter(|(base, node)| {
                !(0..node.num_cores).any(|core| self.is_reachable(SwitchId(base.0 + core)))
            })
            .map(|(base, node)| (*base, node.name.as_str()))
            .collect()
    }
}

impl StateObserver for FabricReachabilityManager {
    fn name(&self) -> &str {
        "fabric reachability"
    }

    fn state_updated(&mut self, delta: &StateDelta) {
        for entry in delta.dsf_nodes_delta() {
            match entry {
                DeltaEntry::Added(node) | DeltaEntry::Changed { new: node, .. } => {
                    if node.is_interface_node() {
                        debug!("Tracking reachability of {} ({})", node.name, node.switch_id);
                        self.nodes.insert(
                            node.switch_id,
                            InterfaceNode {
                                name: node.name.clone(),
                                num_cores: AsicProfile::of(node.asic).num_cores,
                            },
                        );
                    } else {
                        self.nodes.remove(&node.switch_id);
                    }
                }
                DeltaEntry::Removed(node) => {
                    self.nodes.remove(&node.switch_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use state::{AsicType, DsfNode, DsfNodeType, Publishable, SwitchState};
    use std::sync::Arc;

    fn endpoints(samples: &[(u32, u64, bool)]) -> BTreeMap<PortId, FabricEndpoint> {
        samples
            .iter()
            .map(|(port, switch, attached)| {
                (
                    PortId(*port),
                    FabricEndpoint::sample(SwitchId(*switch), PortId(1), *attached),
                )
            })
            .collect()
    }

    #[test]
    fn test_recompute() {
        let mut mgr = FabricReachabilityManager::new();
        let changes = mgr.recompute(&endpoints(&[(1, 4, true), (2, 4, true), (3, 8, false)]));
        assert_eq!(
            changes,
            vec![ReachabilityChange::Reachable {
                switch_id: SwitchId(4),
                ports: BTreeSet::from([PortId(1), PortId(2)]),
            }]
        );
        assert!(!mgr.is_reachable(SwitchId(8)));

        // same input, nothing to report
        assert!(
            mgr.recompute(&endpoints(&[(1, 4, true), (2, 4, true), (3, 8, false)]))
                .is_empty()
        );

        let changes = mgr.recompute(&endpoints(&[(3, 8, true)]));
        assert_eq!(
            changes,
            vec![
                ReachabilityChange::Reachable {
                    switch_id: SwitchId(8),
                    ports: BTreeSet::from([PortId(3)]),
                },
                ReachabilityChange::Unreachable(SwitchId(4)),
            ]
        );
        assert_eq!(
            mgr.reachable_ports(SwitchId(8)),
            Some(&BTreeSet::from([PortId(3)]))
        );
    }

    #[test]
    fn test_unreachable_nodes() {
        let mut mgr = FabricReachabilityManager::new();
        let old = Arc::new(SwitchState::new());
        old.publish();
        let mut new = old.clone();
        {
            let nodes = SwitchState::modify(&mut new).dsf_nodes_mut();
            nodes
                .add_node(DsfNode::new(
                    SwitchId(4),
                    "rdsw1",
                    DsfNodeType::Interface,
                    AsicType::Jericho2,
                ))
                .unwrap();
            nodes
                .add_node(DsfNode::new(
                    SwitchId(8),
                    "rdsw2",
                    DsfNodeType::Interface,
                    AsicType::Jericho2,
                ))
                .unwrap();
            nodes
                .add_node(DsfNode::new(
                    SwitchId(100),
                    "fdsw1",
                    DsfNodeType::Fabric,
                    AsicType::Ramon,
                ))
                .unwrap();
        }
        new.publish();
        mgr.state_updated(&StateDelta::new(old, new));

        assert_eq!(
            mgr.unreachable_nodes(),
            vec![(SwitchId(4), "rdsw1"), (SwitchId(8), "rdsw2")]
        );
        // second core of rdsw1
        mgr.recompute(&endpoints(&[(1, 5, true)]));
        assert_eq!(mgr.unreachable_nodes(), vec![(SwitchId(8), "rdsw2")]);
    }
}
