// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Differences between two versions of the state.
//!
//! A [`MapDelta`] walks two [`NodeMap`]s in key order and reports every key exactly once:
//! added, removed, or changed. Nodes present on both sides are compared by value; sharing the
//! same allocation only short-cuts that comparison. A missing map is an empty one.

use crate::acl::Acl;
use crate::dsf_node::DsfNode;
use crate::fib::ForwardingInfoBase;
use crate::interface::Interface;
use crate::mirror::Mirror;
use crate::node::{Node, NodeMap};
use crate::port::Port;
use crate::settings::SwitchSettings;
use crate::switch_state::SwitchState;
use crate::system_port::SystemPort;
use crate::vlan::Vlan;
use std::cmp::Ordering;
use std::collections::btree_map;
use std::iter::Peekable;
use std::sync::Arc;

/// One entry of a [`MapDelta`]
#[derive(Debug)]
pub enum DeltaEntry<'a, N: Node> {
    Added(&'a Arc<N>),
    Removed(&'a Arc<N>),
    Changed { old: &'a Arc<N>, new: &'a Arc<N> },
}

impl<N: Node> Clone for DeltaEntry<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<N: Node> Copy for DeltaEntry<'_, N> {}

impl<'a, N: Node> DeltaEntry<'a, N> {
    #[must_use]
    pub fn key(&self) -> N::Key {
        match *self {
            DeltaEntry::Added(n) | DeltaEntry::Removed(n) | DeltaEntry::Changed { new: n, .. } => {
                n.key()
            }
        }
    }
    #[must_use]
    pub fn old_node(&self) -> Option<&'a Arc<N>> {
        match *self {
            DeltaEntry::Added(_) => None,
            DeltaEntry::Removed(old) | DeltaEntry::Changed { old, .. } => Some(old),
        }
    }
    #[must_use]
    pub fn new_node(&self) -> Option<&'a Arc<N>> {
        match *self {
            DeltaEntry::Removed(_) => None,
            DeltaEntry::Added(new) | DeltaEntry::Changed { new, .. } => Some(new),
        }
    }

    /// The delta of a child map of this entry, with an empty map standing for the side where
    /// the entry does not exist.
    pub fn nested<C, F>(&self, child: F) -> MapDelta<'a, C>
    where
        C: Node,
        F: Fn(&'a N) -> &'a NodeMap<C>,
    {
        MapDelta::new(
            self.old_node().map(|n| child(n.as_ref())),
            self.new_node().map(|n| child(n.as_ref())),
        )
    }
}

/// The delta of one keyed collection between two state versions
#[derive(Debug)]
pub struct MapDelta<'a, N: Node> {
    old: Option<&'a NodeMap<N>>,
    new: Option<&'a NodeMap<N>>,
}

impl<N: Node> Clone for MapDelta<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<N: Node> Copy for MapDelta<'_, N> {}

impl<'a, N: Node> MapDelta<'a, N> {
    #[must_use]
    pub fn new(old: Option<&'a NodeMap<N>>, new: Option<&'a NodeMap<N>>) -> Self {
        Self { old, new }
    }

    #[must_use]
    pub fn old(&self) -> Option<&'a NodeMap<N>> {
        self.old
    }
    #[must_use]
    pub fn new_map(&self) -> Option<&'a NodeMap<N>> {
        self.new
    }

    #[must_use]
    pub fn iter(&self) -> MapDeltaIter<'a, N> {
        let shared = match (self.old, self.new) {
            (Some(o), Some(n)) => std::ptr::eq(o, n),
            _ => false,
        };
        let (old, new) = if shared {
            (None, None)
        } else {
            (
                self.old.map(|m| m.iter().peekable()),
                self.new.map(|m| m.iter().peekable()),
            )
        };
        MapDeltaIter { old, new }
    }

    pub fn added(&self) -> impl Iterator<Item = &'a Arc<N>> + use<'a, N> {
        self.iter().filter_map(|e| match e {
            DeltaEntry::Added(n) => Some(n),
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = &'a Arc<N>> + use<'a, N> {
        self.iter().filter_map(|e| match e {
            DeltaEntry::Removed(n) => Some(n),
            _ => None,
        })
    }

    pub fn changed(&self) -> impl Iterator<Item = (&'a Arc<N>, &'a Arc<N>)> + use<'a, N> {
        self.iter().filter_map(|e| match e {
            DeltaEntry::Changed { old, new } => Some((old, new)),
            _ => None,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a, N: Node> IntoIterator for MapDelta<'a, N> {
    type Item = DeltaEntry<'a, N>;
    type IntoIter = MapDeltaIter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

type NodeIter<'a, N> = Peekable<btree_map::Iter<'a, <N as Node>::Key, Arc<N>>>;

/// Two-pointer merge over the key-ordered sides of a [`MapDelta`]
pub struct MapDeltaIter<'a, N: Node> {
    old: Option<NodeIter<'a, N>>,
    new: Option<NodeIter<'a, N>>,
}

impl<'a, N: Node> Iterator for MapDeltaIter<'a, N> {
    type Item = DeltaEntry<'a, N>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let old_head = self.old.as_mut().and_then(Peekable::peek).copied();
            let new_head = self.new.as_mut().and_then(Peekable::peek).copied();
            let order = match (old_head, new_head) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((ko, _)), Some((kn, _))) => ko.cmp(kn),
            };
            match order {
                Ordering::Less => {
                    let (_, o) = self.old.as_mut()?.next()?;
                    return Some(DeltaEntry::Removed(o));
                }
                Ordering::Greater => {
                    let (_, n) = self.new.as_mut()?.next()?;
                    return Some(DeltaEntry::Added(n));
                }
                Ordering::Equal => {
                    let (_, o) = self.old.as_mut()?.next()?;
                    let (_, n) = self.new.as_mut()?.next()?;
                    if Arc::ptr_eq(o, n) || o == n {
                        continue;
                    }
                    return Some(DeltaEntry::Changed { old: o, new: n });
                }
            }
        }
    }
}

/// Call exactly one of the callbacks for every key in the delta
pub fn for_each_changed<N, C, A, R>(
    delta: &MapDelta<'_, N>,
    mut on_changed: C,
    mut on_added: A,
    mut on_removed: R,
) where
    N: Node,
    C: FnMut(&Arc<N>, &Arc<N>),
    A: FnMut(&Arc<N>),
    R: FnMut(&Arc<N>),
{
    for entry in delta.iter() {
        match entry {
            DeltaEntry::Changed { old, new } => on_changed(old, new),
            DeltaEntry::Added(new) => on_added(new),
            DeltaEntry::Removed(old) => on_removed(old),
        }
    }
}

/// Like [`for_each_changed`], stopping at the first error
pub fn try_for_each_changed<N, C, A, R, E>(
    delta: &MapDelta<'_, N>,
    mut on_changed: C,
    mut on_added: A,
    mut on_removed: R,
) -> Result<(), E>
where
    N: Node,
    C: FnMut(&Arc<N>, &Arc<N>) -> Result<(), E>,
    A: FnMut(&Arc<N>) -> Result<(), E>,
    R: FnMut(&Arc<N>) -> Result<(), E>,
{
    for entry in delta.iter() {
        match entry {
            DeltaEntry::Changed { old, new } => on_changed(old, new)?,
            DeltaEntry::Added(new) => on_added(new)?,
            DeltaEntry::Removed(old) => on_removed(old)?,
        }
    }
    Ok(())
}

/// The delta of a single-valued child of the state
#[derive(Debug)]
pub struct DeltaValue<'a, T> {
    pub old: &'a T,
    pub new: &'a T,
}

impl<T: PartialEq> DeltaValue<'_, T> {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !std::ptr::eq(self.old, self.new) && self.old != self.new
    }
}

/// The differences between two versions of the switch state
#[derive(Clone, Debug)]
pub struct StateDelta {
    old: Arc<SwitchState>,
    new: Arc<SwitchState>,
}

impl StateDelta {
    #[must_use]
    pub fn new(old: Arc<SwitchState>, new: Arc<SwitchState>) -> Self {
        Self { old, new }
    }

    #[must_use]
    pub fn old_state(&self) -> &Arc<SwitchState> {
        &self.old
    }

    #[must_use]
    pub fn new_state(&self) -> &Arc<SwitchState> {
        &self.new
    }

    #[must_use]
    pub fn settings_delta(&self) -> DeltaValue<'_, SwitchSettings> {
        DeltaValue {
            old: self.old.settings(),
            new: self.new.settings(),
        }
    }

    #[must_use]
    pub fn ports_delta(&self) -> MapDelta<'_, Port> {
        MapDelta::new(Some(self.old.ports()), Some(self.new.ports()))
    }

    #[must_use]
    pub fn vlans_delta(&self) -> MapDelta<'_, Vlan> {
        MapDelta::new(Some(self.old.vlans()), Some(self.new.vlans()))
    }

    #[must_use]
    pub fn interfaces_delta(&self) -> MapDelta<'_, Interface> {
        MapDelta::new(Some(self.old.interfaces()), Some(self.new.interfaces()))
    }

    #[must_use]
    pub fn remote_interfaces_delta(&self) -> MapDelta<'_, Interface> {
        MapDelta::new(
            Some(self.old.remote_interfaces()),
            Some(self.new.remote_interfaces()),
        )
    }

    #[must_use]
    pub fn system_ports_delta(&self) -> MapDelta<'_, SystemPort> {
        MapDelta::new(Some(self.old.system_ports()), Some(self.new.system_ports()))
    }

    #[must_use]
    pub fn remote_system_ports_delta(&self) -> MapDelta<'_, SystemPort> {
        MapDelta::new(
            Some(self.old.remote_system_ports()),
            Some(self.new.remote_system_ports()),
        )
    }

    #[must_use]
    pub fn dsf_nodes_delta(&self) -> MapDelta<'_, DsfNode> {
        MapDelta::new(Some(self.old.dsf_nodes()), Some(self.new.dsf_nodes()))
    }

    #[must_use]
    pub fn acls_delta(&self) -> MapDelta<'_, Acl> {
        MapDelta::new(Some(self.old.acls()), Some(self.new.acls()))
    }

    #[must_use]
    pub fn mirrors_delta(&self) -> MapDelta<'_, Mirror> {
        MapDelta::new(Some(self.old.mirrors()), Some(self.new.mirrors()))
    }

    #[must_use]
    pub fn fibs_delta(&self) -> MapDelta<'_, ForwardingInfoBase> {
        MapDelta::new(Some(self.old.fibs()), Some(self.new.fibs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{InterfaceId, PortId, RouterId, VlanId};
    use crate::neighbor::{ArpEntry, NeighborPort, NeighborState};
    use crate::node::tests::TestNode;
    use crate::node::Publishable;
    use crate::port::OperState;
    use mac_address::MacAddress;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;

    fn map_of(entries: &[(u16, u8)]) -> NodeMap<TestNode> {
        entries.iter().map(|(k, v)| TestNode::new(*k, *v)).collect()
    }

    #[derive(Debug, Default, PartialEq)]
    struct Seen {
        added: Vec<u16>,
        removed: Vec<u16>,
        changed: Vec<u16>,
    }

    fn collect(delta: &MapDelta<'_, TestNode>) -> Seen {
        let mut seen = Seen::default();
        for entry in delta.iter() {
            match entry {
                DeltaEntry::Added(n) => seen.added.push(n.id),
                DeltaEntry::Removed(n) => seen.removed.push(n.id),
                DeltaEntry::Changed { old, new } => {
                    assert_eq!(old.id, new.id);
                    seen.changed.push(new.id);
                }
            }
        }
        seen
    }

    #[test]
    fn test_map_delta_basic() {
        let old = map_of(&[(1, 1), (2, 2), (4, 4)]);
        let new = map_of(&[(2, 2), (3, 3), (4, 40)]);
        let delta = MapDelta::new(Some(&old), Some(&new));
        assert_eq!(
            collect(&delta),
            Seen {
                added: vec![3],
                removed: vec![1],
                changed: vec![4],
            }
        );
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_map_delta_missing_sides_are_empty() {
        let map = map_of(&[(1, 1), (2, 2)]);
        let added = MapDelta::new(None, Some(&map));
        assert_eq!(collect(&added).added, vec![1, 2]);
        let removed = MapDelta::new(Some(&map), None);
        assert_eq!(collect(&removed).removed, vec![1, 2]);
        assert!(MapDelta::<TestNode>::new(None, None).is_empty());
        assert!(MapDelta::new(Some(&map), Some(&map)).is_empty());
    }

    #[test]
    fn test_value_equal_nodes_are_not_changed() {
        // distinct allocations holding equal values, as when a peer sends back the same node
        let old = map_of(&[(1, 1)]);
        let new = map_of(&[(1, 1)]);
        old.publish();
        assert!(!Arc::ptr_eq(old.get(&1).unwrap(), new.get(&1).unwrap()));
        assert!(MapDelta::new(Some(&old), Some(&new)).is_empty());
    }

    #[test]
    fn test_for_each_changed_calls_once_per_key() {
        let old = map_of(&[(1, 1), (2, 2)]);
        let new = map_of(&[(2, 3), (5, 5)]);
        let delta = MapDelta::new(Some(&old), Some(&new));
        let calls = std::cell::RefCell::new(vec![]);
        for_each_changed(
            &delta,
            |o, n| calls.borrow_mut().push(format!("changed {}:{}->{}", o.id, o.value, n.value)),
            |n| calls.borrow_mut().push(format!("added {}", n.id)),
            |o| calls.borrow_mut().push(format!("removed {}", o.id)),
        );
        assert_eq!(calls.into_inner(), vec!["removed 1", "changed 2:2->3", "added 5"]);

        let r: Result<(), String> = try_for_each_changed(
            &delta,
            |_, _| Err("stop".to_owned()),
            |_| Ok(()),
            |_| Ok(()),
        );
        assert_eq!(r, Err("stop".to_owned()));
    }

    #[test]
    fn test_delta_completeness() {
        bolero::check!()
            .with_type::<(BTreeMap<u8, u8>, BTreeMap<u8, u8>)>()
            .for_each(|(a, b)| {
                let old: NodeMap<TestNode> =
                    a.iter().map(|(k, v)| TestNode::new((*k).into(), *v)).collect();
                let new: NodeMap<TestNode> =
                    b.iter().map(|(k, v)| TestNode::new((*k).into(), *v)).collect();
                let seen = collect(&MapDelta::new(Some(&old), Some(&new)));

                let removed: Vec<u16> = a.keys().filter(|k| !b.contains_key(*k)).map(|k| (*k).into()).collect();
                let added: Vec<u16> = b.keys().filter(|k| !a.contains_key(*k)).map(|k| (*k).into()).collect();
                let changed: Vec<u16> = a
                    .iter()
                    .filter(|(k, v)| b.get(*k).is_some_and(|w| w != *v))
                    .map(|(k, _)| (*k).into())
                    .collect();
                assert_eq!(seen, Seen { added, removed, changed });
            });
    }

    fn arp(ip: Ipv4Addr) -> ArpEntry {
        ArpEntry::new(
            ip,
            MacAddress::new([2, 0, 0, 0, 0, 1]),
            NeighborPort::Physical(PortId(1)),
            InterfaceId(1),
            NeighborState::Reachable,
        )
    }

    #[test]
    fn test_state_delta_and_nested() {
        let mut state = Arc::new(SwitchState::new());
        {
            let s = SwitchState::modify(&mut state);
            s.ports_mut().add_node(Port::new(PortId(1), "eth1")).unwrap();
            s.vlans_mut().add_node(Vlan::new(VlanId(10), "v10")).unwrap();
            s.fibs_mut().add_node(ForwardingInfoBase::new(RouterId::DEFAULT)).unwrap();
        }
        state.publish();
        let old = state.clone();

        {
            let s = SwitchState::modify(&mut state);
            s.ports_mut().modify_node(&PortId(1)).unwrap().oper_state = OperState::Up;
            let vlans = s.vlans_mut();
            vlans
                .modify_node(&VlanId(10))
                .unwrap()
                .arp_table_mut()
                .add_node(arp(Ipv4Addr::new(10, 0, 0, 2)))
                .unwrap();
            let mut v20 = Vlan::new(VlanId(20), "v20");
            v20.arp_table_mut().add_node(arp(Ipv4Addr::new(10, 0, 1, 2))).unwrap();
            vlans.add_node(v20).unwrap();
        }
        state.publish();

        let delta = StateDelta::new(old, state);
        assert_eq!(delta.ports_delta().changed().count(), 1);
        assert!(delta.dsf_nodes_delta().is_empty());
        assert!(delta.fibs_delta().is_empty());
        assert!(!delta.settings_delta().is_changed());

        let mut arp_added = vec![];
        for entry in delta.vlans_delta() {
            for arp_entry in entry.nested(Vlan::arp_table).added() {
                arp_added.push((entry.key(), arp_entry.ip));
            }
        }
        assert_eq!(
            arp_added,
            vec![
                (VlanId(10), Ipv4Addr::new(10, 0, 0, 2)),
                (VlanId(20), Ipv4Addr::new(10, 0, 1, 2))
            ]
        );
    }
}
