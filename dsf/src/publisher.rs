// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Publication of the local system ports and interfaces to the other nodes of the fabric

use state::{
    InterfaceMap, Node, NodeMap, StateDelta, StateObserver, SwitchId, SwitchState, SystemPortMap,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of what this node publishes, by local switch id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishedState {
    /// Generation of the state the snapshot was taken from
    pub generation: u64,
    pub system_ports: BTreeMap<SwitchId, SystemPortMap>,
    pub interfaces: BTreeMap<SwitchId, InterfaceMap>,
}

fn by_switch<N, F>(map: &NodeMap<N>, switch_of: F) -> BTreeMap<SwitchId, NodeMap<N>>
where
    N: Node,
    F: Fn(&N) -> SwitchId,
{
    let mut out: BTreeMap<SwitchId, NodeMap<N>> = BTreeMap::new();
    for node in map.values() {
        out.entry(switch_of(node))
            .or_default()
            .add_or_update_shared(node.clone());
    }
    out
}

impl PublishedState {
    #[must_use]
    pub fn from_state(state: &Arc<SwitchState>) -> Self {
        Self {
            generation: state.generation(),
            system_ports: by_switch(state.system_ports(), |p| p.switch_id),
            interfaces: by_switch(state.interfaces(), |i| i.switch_id),
        }
    }
}

/// Observer feeding the published snapshot. A new snapshot is only produced when the local
/// system ports or interfaces change.
#[derive(Debug)]
pub struct StatePublisher {
    tx: watch::Sender<PublishedState>,
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatePublisher {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PublishedState::default());
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> PublishedState {
        self.tx.borrow().clone()
    }
}

impl StateObserver for StatePublisher {
    fn name(&self) -> &str {
        "state publisher"
    }

    fn state_updated(&mut self, delta: &StateDelta) {
        if delta.system_ports_delta().is_empty() && delta.interfaces_delta().is_empty() {
            return;
        }
        let published = PublishedState::from_state(delta.new_state());
        debug!(
            "Publishing generation {}: {} switches with system ports, {} with interfaces",
            published.generation,
            published.system_ports.len(),
            published.interfaces.len()
        );
        self.tx.send_replace(published);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use state::{Port, PortId, Publishable, SystemPort, SystemPortId};

    #[test]
    fn test_publish_on_relevant_changes_only() {
        let mut publisher = StatePublisher::new();
        let mut rx = publisher.subscribe();

        let old = Arc::new(SwitchState::new());
        old.publish();
        let mut new = old.clone();
        {
            let ports = SwitchState::modify(&mut new).system_ports_mut();
            ports.add_or_update_node(SystemPort::new(SystemPortId(100), SwitchId(4), "eth1"));
            ports.add_or_update_node(SystemPort::new(SystemPortId(101), SwitchId(4), "eth2"));
            ports.add_or_update_node(SystemPort::new(SystemPortId(200), SwitchId(5), "eth3"));
        }
        new.publish();
        publisher.state_updated(&StateDelta::new(old, new.clone()));

        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone();
        assert_eq!(published.generation, 1);
        let sizes: Vec<_> = published
            .system_ports
            .iter()
            .map(|(sw, ports)| (sw.0, ports.len()))
            .collect();
        assert_eq!(sizes, vec![(4, 2), (5, 1)]);
        assert!(published.interfaces.is_empty());

        // front panel ports are not published
        let mut next = new.clone();
        SwitchState::modify(&mut next)
            .ports_mut()
            .add_or_update_node(Port::new(PortId(1), "eth1/1/1"));
        next.publish();
        publisher.state_updated(&StateDelta::new(new, next));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(publisher.current().generation, 1);
    }
}
