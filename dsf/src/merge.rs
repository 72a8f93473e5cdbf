// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Folding the state published by a remote node into the local state

use crate::errors::DsfError;
use lpm::IpAddress;
use state::{
    DeltaEntry, Interface, InterfaceMap, LivenessStatus, MapDelta, NeighborEntry, Node, NodeMap,
    RemoteAttrs, RemoteEntryType, SwitchId, SwitchState, SystemPort, SystemPortMap,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error};

/// The system ports and interfaces of a remote node, by switch id of that node
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteUpdate {
    pub node_name: String,
    pub system_ports: BTreeMap<SwitchId, SystemPortMap>,
    pub interfaces: BTreeMap<SwitchId, InterfaceMap>,
}

impl RemoteUpdate {
    #[must_use]
    pub fn new(node_name: &str) -> Self {
        Self {
            node_name: node_name.to_owned(),
            ..Default::default()
        }
    }

    fn switch_ids(&self) -> impl Iterator<Item = &SwitchId> {
        self.system_ports.keys().chain(self.interfaces.keys())
    }
}

fn is_dynamic(remote: Option<RemoteAttrs>) -> bool {
    remote.is_some_and(|r| r.kind == RemoteEntryType::Dynamic)
}

/// Neighbors learnt on a remote node, as they are programmed here: only reachable ones, never
/// link-local ones, and none of them local.
fn remote_neighbors<A: IpAddress>(
    table: &NodeMap<NeighborEntry<A>>,
) -> NodeMap<NeighborEntry<A>> {
    table
        .values()
        .filter(|e| e.is_reachable() && !e.ip.is_link_local())
        .map(|e| {
            let mut entry = NeighborEntry::clone(e);
            entry.is_local = false;
            entry
        })
        .collect()
}

fn remote_system_port(port: &SystemPort, switch_id: SwitchId) -> SystemPort {
    let mut port = port.clone();
    port.switch_id = switch_id;
    port.remote = Some(RemoteAttrs::dynamic_live());
    port
}

fn remote_interface(intf: &Interface, switch_id: SwitchId) -> Interface {
    let mut intf = intf.clone();
    intf.switch_id = switch_id;
    intf.remote = Some(RemoteAttrs::dynamic_live());
    let arp = remote_neighbors(intf.arp_table());
    let ndp = remote_neighbors(intf.ndp_table());
    intf.set_arp_table(arp);
    intf.set_ndp_table(ndp);
    intf
}

/// The dynamic remote entries of `switch_id` currently in `map`
fn current_entries<N, F>(map: &NodeMap<N>, belongs: F) -> NodeMap<N>
where
    N: Node,
    F: Fn(&N) -> bool,
{
    let mut out = NodeMap::new();
    for node in map.values().filter(|n| belongs(n)) {
        out.add_or_update_shared(node.clone());
    }
    out
}

/// Apply to `target` the delta from `old` to `new`. Returns the number of entries changed.
fn apply_delta<N: Node>(target: &mut NodeMap<N>, old: &NodeMap<N>, new: &NodeMap<N>) -> usize {
    let mut changes = 0;
    for entry in MapDelta::new(Some(old), Some(new)) {
        match entry {
            DeltaEntry::Added(n) | DeltaEntry::Changed { new: n, .. } => {
                target.add_or_update_shared(n.clone());
            }
            DeltaEntry::Removed(n) => {
                let _ = target.remove_node(&n.key());
            }
        }
        changes += 1;
    }
    changes
}

/// Refuse updates describing switches of this node. A remote feed describing local switches
/// means the subscriptions are miswired, and continuing would corrupt the fabric state.
///
/// # Panics
/// If `update` holds entries for a local switch id.
fn check_remote(current: &SwitchState, update: &RemoteUpdate) {
    for switch_id in update.switch_ids() {
        if current.is_local_switch_id(*switch_id) {
            let err = DsfError::LocalSwitchId {
                node: update.node_name.clone(),
                switch_id: *switch_id,
            };
            error!("{err}");
            panic!("{err}");
        }
    }
}

/// Merge what a remote node published into `current`. Every switch id in `update` replaces the
/// dynamic remote entries of that switch id; other switch ids are left alone. Returns `None` if
/// the merge changes nothing.
///
/// # Panics
/// If `update` holds entries for a local switch id.
#[must_use]
pub fn merge_remote_state(
    current: &Arc<SwitchState>,
    update: &RemoteUpdate,
) -> Option<Arc<SwitchState>> {
    check_remote(current, update);
    let mut next = current.clone();
    let mut changes = 0;

    for (switch_id, ports) in &update.system_ports {
        let old = current_entries(current.remote_system_ports(), |p| {
            p.switch_id == *switch_id && is_dynamic(p.remote)
        });
        let new: SystemPortMap = ports
            .values()
            .map(|p| remote_system_port(p, *switch_id))
            .collect();
        if MapDelta::new(Some(&old), Some(&new)).is_empty() {
            continue;
        }
        changes += apply_delta(
            SwitchState::modify(&mut next).remote_system_ports_mut(),
            &old,
            &new,
        );
    }

    for (switch_id, intfs) in &update.interfaces {
        let old = current_entries(current.remote_interfaces(), |i| {
            i.switch_id == *switch_id && is_dynamic(i.remote)
        });
        let new: InterfaceMap = intfs
            .values()
            .map(|i| remote_interface(i, *switch_id))
            .collect();
        if MapDelta::new(Some(&old), Some(&new)).is_empty() {
            continue;
        }
        changes += apply_delta(
            SwitchState::modify(&mut next).remote_interfaces_mut(),
            &old,
            &new,
        );
    }

    if changes == 0 {
        debug!("Update from {} changes nothing", update.node_name);
        return None;
    }
    debug!("Update from {}: {changes} remote entries changed", update.node_name);
    Some(next)
}

/// Mark stale the dynamic remote system ports and interfaces of the switches of a remote node
/// whose graceful restart hold time expired. The neighbors of those interfaces are flushed.
#[must_use]
pub fn mark_remote_node_stale(
    current: &Arc<SwitchState>,
    node_name: &str,
    switch_ids: &BTreeSet<SwitchId>,
) -> Option<Arc<SwitchState>> {
    let owned = |port: &SystemPort| switch_ids.contains(&port.switch_id) && is_dynamic(port.remote);

    let ports: Vec<_> = current
        .remote_system_ports()
        .values()
        .filter(|p| owned(p) && !p.is_stale())
        .map(|p| p.id)
        .collect();
    let intfs: Vec<_> = current
        .remote_interfaces()
        .values()
        .filter(|i| is_dynamic(i.remote))
        .filter(|i| {
            i.system_port
                .and_then(|id| current.remote_system_ports().get(&id))
                .is_some_and(|p| owned(p))
        })
        .filter(|i| !i.is_stale() || !i.arp_table().is_empty() || !i.ndp_table().is_empty())
        .map(|i| i.id)
        .collect();
    if ports.is_empty() && intfs.is_empty() {
        return None;
    }

    let mut next = current.clone();
    let state = SwitchState::modify(&mut next);
    for id in &ports {
        if let Some(port) = state.remote_system_ports_mut().modify_node(id)
            && let Some(remote) = port.remote.as_mut()
        {
            remote.liveness = LivenessStatus::Stale;
        }
    }
    for id in &intfs {
        if let Some(intf) = state.remote_interfaces_mut().modify_node(id) {
            if let Some(remote) = intf.remote.as_mut() {
                remote.liveness = LivenessStatus::Stale;
            }
            intf.set_arp_table(NodeMap::new());
            intf.set_ndp_table(NodeMap::new());
        }
    }
    debug!(
        "Marked {} remote system ports and {} remote interfaces of {node_name} stale",
        ports.len(),
        intfs.len()
    );
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mac_address::MacAddress;
    use pretty_assertions::assert_eq;
    use state::{
        AsicType, InterfaceId, InterfaceType, NeighborPort, NeighborState, Publishable,
        RouterId, SwitchInfo, SwitchSettings, SwitchType, SystemPortId,
    };
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    static MAC: std::sync::LazyLock<MacAddress> = std::sync::LazyLock::new(|| MacAddress::new([2, 0, 0, 0, 0, 1]));

    fn local_state() -> Arc<SwitchState> {
        let mut state = Arc::new(SwitchState::new());
        *SwitchState::modify(&mut state).settings_mut() = SwitchSettings::new("rdswB").with_switch(
            SwitchId(4),
            SwitchInfo {
                switch_type: SwitchType::Voq,
                asic: AsicType::Jericho2,
                switch_index: 0,
            },
        );
        state.publish();
        state
    }

    fn sysports(switch_id: u64, ids: &[u64]) -> SystemPortMap {
        ids.iter()
            .map(|id| SystemPort::new(SystemPortId(*id), SwitchId(switch_id), &format!("rdswA:eth{id}")))
            .collect()
    }

    fn rdsw_a(ports: SystemPortMap) -> RemoteUpdate {
        let mut update = RemoteUpdate::new("rdswA");
        update.system_ports.insert(SwitchId(20), ports);
        update
    }

    fn arp(ip: Ipv4Addr, state: NeighborState) -> NeighborEntry<Ipv4Addr> {
        NeighborEntry::new(ip, *MAC, NeighborPort::System(SystemPortId(101)), InterfaceId(101), state)
    }

    fn ndp(ip: Ipv6Addr, state: NeighborState) -> NeighborEntry<Ipv6Addr> {
        NeighborEntry::new(ip, *MAC, NeighborPort::System(SystemPortId(101)), InterfaceId(101), state)
    }

    fn remote_intf() -> Interface {
        let mut intf = Interface::new(InterfaceId(101), RouterId::DEFAULT, "fboss101", *MAC)
            .with_address(IpAddr::V4(Ipv4Addr::new(10, 0, 1, 1)), 24);
        intf.intf_type = InterfaceType::SystemPort;
        intf.system_port = Some(SystemPortId(101));
        intf.set_arp_table(
            [
                arp(Ipv4Addr::new(10, 0, 1, 2), NeighborState::Reachable),
                arp(Ipv4Addr::new(10, 0, 1, 3), NeighborState::Pending),
                arp(Ipv4Addr::new(169, 254, 0, 1), NeighborState::Reachable),
            ]
            .into_iter()
            .collect(),
        );
        intf.set_ndp_table(
            [
                ndp("2001:db8::2".parse().unwrap(), NeighborState::Reachable),
                ndp("fe80::2".parse().unwrap(), NeighborState::Reachable),
                ndp("2001:db8::3".parse().unwrap(), NeighborState::Stale),
            ]
            .into_iter()
            .collect(),
        );
        intf
    }

    #[test]
    fn test_merge_system_ports_once() {
        let current = local_state();
        let update = rdsw_a(sysports(20, &[100, 101]));

        let next = merge_remote_state(&current, &update).unwrap();
        let remote = next.remote_system_ports();
        assert_eq!(remote.len(), 2);
        for port in remote.values() {
            assert_eq!(port.switch_id, SwitchId(20));
            assert_eq!(port.remote, Some(RemoteAttrs::dynamic_live()));
        }
        assert!(current.remote_system_ports().is_empty());

        // the same update again is a no-op
        next.publish();
        assert!(merge_remote_state(&next, &update).is_none());
    }

    #[test]
    fn test_merge_replaces_entries_of_the_switch_only() {
        let current = local_state();
        let mut update = rdsw_a(sysports(20, &[100, 101]));
        update.system_ports.insert(SwitchId(24), sysports(24, &[200]));
        let state = merge_remote_state(&current, &update).unwrap();
        state.publish();

        // switch 20 withdraws port 101, switch 24 is not in the update
        let next = merge_remote_state(&state, &rdsw_a(sysports(20, &[100]))).unwrap();
        let ids: Vec<u64> = next.remote_system_ports().keys().map(|k| k.0).collect();
        assert_eq!(ids, vec![100, 200]);
        // untouched entries are shared with the previous version
        assert!(Arc::ptr_eq(
            state.remote_system_ports().get(&SystemPortId(200)).unwrap(),
            next.remote_system_ports().get(&SystemPortId(200)).unwrap()
        ));
    }

    #[test]
    fn test_merge_filters_neighbors() {
        let current = local_state();
        let mut update = rdsw_a(sysports(20, &[101]));
        update
            .interfaces
            .insert(SwitchId(20), [remote_intf()].into_iter().collect());

        let next = merge_remote_state(&current, &update).unwrap();
        let intf = next.remote_interfaces().get(&InterfaceId(101)).unwrap();
        assert_eq!(intf.switch_id, SwitchId(20));
        assert!(intf.is_remote());

        let arp: Vec<_> = intf.arp_table().values().collect();
        assert_eq!(arp.len(), 1);
        assert_eq!(arp[0].ip, Ipv4Addr::new(10, 0, 1, 2));
        assert!(!arp[0].is_local);

        let ndp: Vec<_> = intf.ndp_table().values().collect();
        assert_eq!(ndp.len(), 1);
        assert_eq!(ndp[0].ip, "2001:db8::2".parse::<Ipv6Addr>().unwrap());
        assert!(!ndp[0].is_local);
    }

    #[test]
    #[should_panic(expected = "Got update for local switch id 4 from rdswA")]
    fn test_update_for_local_switch_is_fatal() {
        let current = local_state();
        let mut update = RemoteUpdate::new("rdswA");
        update.system_ports.insert(SwitchId(4), sysports(4, &[1]));
        let _ = merge_remote_state(&current, &update);
    }

    #[test]
    fn test_gr_expiry_marks_stale() {
        let current = local_state();
        let mut update = rdsw_a(sysports(20, &[101]));
        update
            .interfaces
            .insert(SwitchId(20), [remote_intf()].into_iter().collect());
        let merged = merge_remote_state(&current, &update).unwrap();
        merged.publish();

        let switch_ids = BTreeSet::from([SwitchId(20), SwitchId(21)]);
        let stale = mark_remote_node_stale(&merged, "rdswA", &switch_ids).unwrap();
        let port = stale.remote_system_ports().get(&SystemPortId(101)).unwrap();
        assert!(port.is_stale());
        let intf = stale.remote_interfaces().get(&InterfaceId(101)).unwrap();
        assert!(intf.is_stale());
        assert!(intf.arp_table().is_empty());
        assert!(intf.ndp_table().is_empty());
        // the published version is untouched
        assert!(!merged.remote_system_ports().get(&SystemPortId(101)).unwrap().is_stale());

        stale.publish();
        assert!(mark_remote_node_stale(&stale, "rdswA", &switch_ids).is_none());
        // other nodes are not affected
        assert!(mark_remote_node_stale(&merged, "rdswC", &BTreeSet::from([SwitchId(28)])).is_none());

        // the node coming back revives its entries
        let revived = merge_remote_state(&stale, &update).unwrap();
        assert!(!revived.remote_system_ports().get(&SystemPortId(101)).unwrap().is_stale());
    }
}
