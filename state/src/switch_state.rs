// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The root of the state tree

use crate::acl::AclMap;
use crate::dsf_node::DsfNodeMap;
use crate::fib::ForwardingInfoBaseMap;
use crate::ids::SwitchId;
use crate::interface::InterfaceMap;
use crate::mirror::MirrorMap;
use crate::node::{PublishFlag, Publishable, cow};
use crate::port::PortMap;
use crate::settings::SwitchSettings;
use crate::system_port::SystemPortMap;
use crate::vlan::VlanMap;
use std::sync::Arc;
use tracing::debug;

macro_rules! state_child {
    ($field:ident, $field_mut:ident, $ty:ty) => {
        #[must_use]
        pub fn $field(&self) -> &$ty {
            &self.$field
        }
        pub fn $field_mut(&mut self) -> &mut $ty {
            self.flag.assert_mutable("switch state");
            cow(&mut self.$field)
        }
    };
}

/// A version of the switch state. Children are shared with other versions until modified.
#[derive(Clone, Debug, Default)]
pub struct SwitchState {
    generation: u64,
    settings: Arc<SwitchSettings>,
    ports: Arc<PortMap>,
    vlans: Arc<VlanMap>,
    interfaces: Arc<InterfaceMap>,
    remote_interfaces: Arc<InterfaceMap>,
    system_ports: Arc<SystemPortMap>,
    remote_system_ports: Arc<SystemPortMap>,
    dsf_nodes: Arc<DsfNodeMap>,
    acls: Arc<AclMap>,
    mirrors: Arc<MirrorMap>,
    fibs: Arc<ForwardingInfoBaseMap>,
    flag: PublishFlag,
}

impl SwitchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a mutable version of the state held in `state`. If that version is published, it is
    /// replaced by an unpublished shallow copy with the next generation number; the published
    /// version is left untouched for whoever still holds it.
    pub fn modify(state: &mut Arc<SwitchState>) -> &mut SwitchState {
        if state.is_published() {
            let mut next = SwitchState::clone(state);
            next.generation += 1;
            debug!("Cloned state generation {} for modification", next.generation);
            *state = Arc::new(next);
        }
        Arc::make_mut(state)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    state_child!(settings, settings_mut, SwitchSettings);
    state_child!(ports, ports_mut, PortMap);
    state_child!(vlans, vlans_mut, VlanMap);
    state_child!(interfaces, interfaces_mut, InterfaceMap);
    state_child!(remote_interfaces, remote_interfaces_mut, InterfaceMap);
    state_child!(system_ports, system_ports_mut, SystemPortMap);
    state_child!(remote_system_ports, remote_system_ports_mut, SystemPortMap);
    state_child!(dsf_nodes, dsf_nodes_mut, DsfNodeMap);
    state_child!(acls, acls_mut, AclMap);
    state_child!(mirrors, mirrors_mut, MirrorMap);
    state_child!(fibs, fibs_mut, ForwardingInfoBaseMap);

    /// Replace a whole child. Used when a map is rebuilt from scratch.
    pub fn reset_ports(&mut self, ports: PortMap) {
        self.flag.assert_mutable("switch state");
        self.ports = Arc::new(ports);
    }
    pub fn reset_remote_system_ports(&mut self, map: SystemPortMap) {
        self.flag.assert_mutable("switch state");
        self.remote_system_ports = Arc::new(map);
    }
    pub fn reset_remote_interfaces(&mut self, map: InterfaceMap) {
        self.flag.assert_mutable("switch state");
        self.remote_interfaces = Arc::new(map);
    }

    #[must_use]
    pub fn is_local_switch_id(&self, id: SwitchId) -> bool {
        self.settings.is_local_switch(id)
    }
}

impl Publishable for SwitchState {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
    fn publish(&self) {
        self.settings.publish();
        self.ports.publish();
        self.vlans.publish();
        self.interfaces.publish();
        self.remote_interfaces.publish();
        self.system_ports.publish();
        self.remote_system_ports.publish();
        self.dsf_nodes.publish();
        self.acls.publish();
        self.mirrors.publish();
        self.fibs.publish();
        self.flag.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PortId, SwitchId};
    use crate::port::{OperState, Port, PortType};
    use crate::dsf_node::{AsicType, DsfNode, DsfNodeType};
    use pretty_assertions::assert_eq;

    fn published_state() -> Arc<SwitchState> {
        let mut state = Arc::new(SwitchState::new());
        let s = SwitchState::modify(&mut state);
        s.ports_mut().add_node(Port::new(PortId(1), "eth1")).unwrap();
        s.ports_mut()
            .add_node(Port::new(PortId(2), "fab1/1/1").with_type(PortType::Fabric))
            .unwrap();
        s.dsf_nodes_mut()
            .add_node(DsfNode::new(SwitchId(4), "rdsw1", DsfNodeType::Interface, AsicType::Jericho2))
            .unwrap();
        state.publish();
        state
    }

    #[test]
    fn test_modify_published_leaves_old_untouched() {
        let old = published_state();
        let mut new = old.clone();
        SwitchState::modify(&mut new)
            .ports_mut()
            .modify_node(&PortId(1))
            .unwrap()
            .oper_state = OperState::Up;

        assert_eq!(old.ports().get(&PortId(1)).unwrap().oper_state, OperState::Down);
        assert_eq!(new.ports().get(&PortId(1)).unwrap().oper_state, OperState::Up);
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(old.is_published());
        assert!(!new.is_published());

        // untouched subtrees and siblings are shared
        assert!(Arc::ptr_eq(&old.dsf_nodes, &new.dsf_nodes));
        assert!(Arc::ptr_eq(
            old.ports().get(&PortId(2)).unwrap(),
            new.ports().get(&PortId(2)).unwrap()
        ));
    }

    #[test]
    fn test_modify_unpublished_in_place() {
        let mut state = Arc::new(SwitchState::new());
        let before = Arc::as_ptr(&state);
        SwitchState::modify(&mut state).settings_mut().hostname = "sw1".to_owned();
        SwitchState::modify(&mut state).settings_mut().hostname = "sw2".to_owned();
        assert_eq!(Arc::as_ptr(&state), before);
        assert_eq!(state.generation(), 0);
        assert_eq!(state.settings().hostname, "sw2");
    }

    #[test]
    fn test_publish_is_recursive() {
        let state = published_state();
        assert!(state.ports().is_published());
        assert!(state.ports().get(&PortId(1)).unwrap().is_published());
        assert!(state.settings().is_published());
    }

    #[test]
    #[should_panic(expected = "Attempted to mutate published switch state")]
    fn test_mutating_published_state_is_fatal() {
        let state = published_state();
        let mut copy = SwitchState::clone(&state);
        copy.flag.publish();
        copy.ports_mut();
    }
}
