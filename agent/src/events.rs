// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! State updates derived from hardware events: neighbor resolution and port link changes

use lpm::IpAddress;
use mac_address::MacAddress;
use state::{
    Interface, InterfaceId, NeighborEntry, NeighborPort, NeighborState, NodeMap, OperState,
    PortId, StateContext, StateError, SwitchState, Vlan, VlanId,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::debug;

/// A neighbor resolved, or refreshed, by the hardware or the kernel
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborEvent {
    pub ip: IpAddr,
    pub mac: MacAddress,
    pub port: NeighborPort,
    pub interface: InterfaceId,
    pub state: NeighborState,
}

/// Where the neighbors of an interface are kept
#[derive(Clone, Copy, Debug)]
enum TableOwner {
    Vlan(VlanId),
    Interface(InterfaceId),
}

fn table_owner(
    state: &SwitchState,
    ctx: StateContext,
    interface: InterfaceId,
) -> Result<TableOwner, StateError> {
    let intf = state
        .interfaces()
        .get(&interface)
        .ok_or_else(|| StateError::NotFound {
            what: "interface",
            key: interface.to_string(),
        })?;
    if ctx.intf_neighbor_tables() {
        return Ok(TableOwner::Interface(interface));
    }
    intf.vlan.map(TableOwner::Vlan).ok_or_else(|| {
        StateError::Invalid(format!("interface {interface} has no VLAN to keep neighbors in"))
    })
}

/// Address families with a neighbor table on VLANs and interfaces
trait NeighborFamily: IpAddress {
    fn vlan_table(vlan: &Vlan) -> &NodeMap<NeighborEntry<Self>>;
    fn vlan_table_mut(vlan: &mut Vlan) -> &mut NodeMap<NeighborEntry<Self>>;
    fn intf_table(intf: &Interface) -> &NodeMap<NeighborEntry<Self>>;
    fn intf_table_mut(intf: &mut Interface) -> &mut NodeMap<NeighborEntry<Self>>;
}

impl NeighborFamily for Ipv4Addr {
    fn vlan_table(vlan: &Vlan) -> &NodeMap<NeighborEntry<Self>> {
        vlan.arp_table()
    }
    fn vlan_table_mut(vlan: &mut Vlan) -> &mut NodeMap<NeighborEntry<Self>> {
        vlan.arp_table_mut()
    }
    fn intf_table(intf: &Interface) -> &NodeMap<NeighborEntry<Self>> {
        intf.arp_table()
    }
    fn intf_table_mut(intf: &mut Interface) -> &mut NodeMap<NeighborEntry<Self>> {
        intf.arp_table_mut()
    }
}

impl NeighborFamily for Ipv6Addr {
    fn vlan_table(vlan: &Vlan) -> &NodeMap<NeighborEntry<Self>> {
        vlan.ndp_table()
    }
    fn vlan_table_mut(vlan: &mut Vlan) -> &mut NodeMap<NeighborEntry<Self>> {
        vlan.ndp_table_mut()
    }
    fn intf_table(intf: &Interface) -> &NodeMap<NeighborEntry<Self>> {
        intf.ndp_table()
    }
    fn intf_table_mut(intf: &mut Interface) -> &mut NodeMap<NeighborEntry<Self>> {
        intf.ndp_table_mut()
    }
}

fn owner_not_found(owner: TableOwner) -> StateError {
    match owner {
        TableOwner::Vlan(id) => StateError::NotFound {
            what: "vlan",
            key: id.to_string(),
        },
        TableOwner::Interface(id) => StateError::NotFound {
            what: "interface",
            key: id.to_string(),
        },
    }
}

fn table<A: NeighborFamily>(
    state: &SwitchState,
    owner: TableOwner,
) -> Result<&NodeMap<NeighborEntry<A>>, StateError> {
    let table = match owner {
        TableOwner::Vlan(id) => state.vlans().get(&id).map(|v| A::vlan_table(v)),
        TableOwner::Interface(id) => state.interfaces().get(&id).map(|i| A::intf_table(i)),
    };
    table.ok_or_else(|| owner_not_found(owner))
}

fn table_mut<A: NeighborFamily>(
    state: &mut Arc<SwitchState>,
    owner: TableOwner,
) -> Result<&mut NodeMap<NeighborEntry<A>>, StateError> {
    let state = SwitchState::modify(state);
    let table = match owner {
        TableOwner::Vlan(id) => state.vlans_mut().modify_node(&id).map(A::vlan_table_mut),
        TableOwner::Interface(id) => state
            .interfaces_mut()
            .modify_node(&id)
            .map(A::intf_table_mut),
    };
    table.ok_or_else(|| owner_not_found(owner))
}

fn upsert<A: NeighborFamily>(
    current: &Arc<SwitchState>,
    owner: TableOwner,
    entry: NeighborEntry<A>,
) -> Result<Option<Arc<SwitchState>>, StateError> {
    let existing = table::<A>(current, owner)?;
    if existing.get(&entry.ip).is_some_and(|e| **e == entry) {
        return Ok(None);
    }
    debug!("Neighbor {} is at {} ({:?})", entry.ip, entry.mac, entry.state);
    let mut next = current.clone();
    table_mut::<A>(&mut next, owner)?.add_or_update_node(entry);
    Ok(Some(next))
}

fn remove<A: NeighborFamily>(
    current: &Arc<SwitchState>,
    owner: TableOwner,
    ip: A,
) -> Result<Option<Arc<SwitchState>>, StateError> {
    if !table::<A>(current, owner)?.contains(&ip) {
        return Ok(None);
    }
    debug!("Flushing neighbor {ip}");
    let mut next = current.clone();
    table_mut::<A>(&mut next, owner)?.remove_node(&ip)?;
    Ok(Some(next))
}

/// Record a neighbor in the table of its interface, or of the VLAN of its interface, as the
/// context says
pub fn learn_neighbor(
    current: &Arc<SwitchState>,
    ctx: StateContext,
    event: &NeighborEvent,
) -> Result<Option<Arc<SwitchState>>, StateError> {
    let owner = table_owner(current, ctx, event.interface)?;
    match event.ip {
        IpAddr::V4(ip) => upsert(
            current,
            owner,
            NeighborEntry::new(ip, event.mac, event.port, event.interface, event.state),
        ),
        IpAddr::V6(ip) => upsert(
            current,
            owner,
            NeighborEntry::new(ip, event.mac, event.port, event.interface, event.state),
        ),
    }
}

pub fn flush_neighbor(
    current: &Arc<SwitchState>,
    ctx: StateContext,
    interface: InterfaceId,
    ip: IpAddr,
) -> Result<Option<Arc<SwitchState>>, StateError> {
    let owner = table_owner(current, ctx, interface)?;
    match ip {
        IpAddr::V4(ip) => remove(current, owner, ip),
        IpAddr::V6(ip) => remove(current, owner, ip),
    }
}

/// Record a link state change of a port
pub fn set_port_oper_state(
    current: &Arc<SwitchState>,
    port: PortId,
    oper_state: OperState,
) -> Result<Option<Arc<SwitchState>>, StateError> {
    let existing = current.ports().get(&port).ok_or_else(|| StateError::NotFound {
        what: "port",
        key: port.to_string(),
    })?;
    if existing.oper_state == oper_state {
        return Ok(None);
    }
    debug!("Port {} is now {oper_state:?}", existing.name);
    let mut next = current.clone();
    if let Some(p) = SwitchState::modify(&mut next).ports_mut().modify_node(&port) {
        p.oper_state = oper_state;
    }
    Ok(Some(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use state::{NeighborTableLocation, Port, Publishable, RouterId};

    fn mac() -> MacAddress {
        MacAddress::new([2, 0, 0, 0, 0, 9])
    }

    fn state() -> Arc<SwitchState> {
        let mut state = Arc::new(SwitchState::new());
        {
            let s = SwitchState::modify(&mut state);
            s.ports_mut().add_or_update_node(Port::new(PortId(1), "eth1"));
            s.vlans_mut().add_or_update_node(Vlan::new(VlanId(10), "vlan10"));
            let mut intf = Interface::new(InterfaceId(10), RouterId::DEFAULT, "vlan10", mac());
            intf.vlan = Some(VlanId(10));
            s.interfaces_mut().add_or_update_node(intf);
            s.interfaces_mut().add_or_update_node(Interface::new(
                InterfaceId(20),
                RouterId::DEFAULT,
                "port20",
                mac(),
            ));
        }
        state.publish();
        state
    }

    fn event(ip: &str, interface: u32) -> NeighborEvent {
        NeighborEvent {
            ip: ip.parse().unwrap(),
            mac: mac(),
            port: NeighborPort::Physical(PortId(1)),
            interface: InterfaceId(interface),
            state: NeighborState::Reachable,
        }
    }

    #[test]
    fn test_learn_on_vlan() {
        let current = state();
        let ctx = StateContext::default();
        let next = learn_neighbor(&current, ctx, &event("10.0.0.2", 10))
            .unwrap()
            .unwrap();
        let vlan = next.vlans().get(&VlanId(10)).unwrap();
        assert_eq!(vlan.arp_table().len(), 1);
        assert!(vlan.ndp_table().is_empty());
        assert!(current.vlans().get(&VlanId(10)).unwrap().arp_table().is_empty());
        // interface tables unused in this mode
        assert!(next.interfaces().get(&InterfaceId(10)).unwrap().arp_table().is_empty());

        next.publish();
        assert!(learn_neighbor(&next, ctx, &event("10.0.0.2", 10)).unwrap().is_none());

        // no VLAN to keep the neighbors of interface 20
        assert!(matches!(
            learn_neighbor(&next, ctx, &event("10.0.0.3", 20)),
            Err(StateError::Invalid(_))
        ));
    }

    #[test]
    fn test_learn_on_interface() {
        let current = state();
        let ctx = StateContext::new(NeighborTableLocation::Interface);
        let next = learn_neighbor(&current, ctx, &event("2001:db8::2", 20))
            .unwrap()
            .unwrap();
        let intf = next.interfaces().get(&InterfaceId(20)).unwrap();
        assert_eq!(intf.ndp_table().len(), 1);
        assert!(next.vlans().get(&VlanId(10)).unwrap().ndp_table().is_empty());

        next.publish();
        let ip: IpAddr = "2001:db8::2".parse().unwrap();
        let flushed = flush_neighbor(&next, ctx, InterfaceId(20), ip).unwrap().unwrap();
        assert!(flushed.interfaces().get(&InterfaceId(20)).unwrap().ndp_table().is_empty());
        flushed.publish();
        assert!(flush_neighbor(&flushed, ctx, InterfaceId(20), ip).unwrap().is_none());
    }

    #[test]
    fn test_unknown_interface() {
        let err = learn_neighbor(&state(), StateContext::default(), &event("10.0.0.2", 99))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::NotFound {
                what: "interface",
                key: "99".to_owned()
            }
        );
    }

    #[test]
    fn test_port_oper_state() {
        let current = state();
        let next = set_port_oper_state(&current, PortId(1), OperState::Up)
            .unwrap()
            .unwrap();
        assert_eq!(next.ports().get(&PortId(1)).unwrap().oper_state, OperState::Up);
        next.publish();
        assert!(set_port_oper_state(&next, PortId(1), OperState::Up).unwrap().is_none());
        assert!(set_port_oper_state(&next, PortId(9), OperState::Up).is_err());
    }
}
