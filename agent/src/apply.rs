// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Turning a switch configuration into a candidate switch state and RIB configuration

use crate::errors::AgentError;
use config::{RouteAction, StaticRouteConfig, SwitchConfig};
use fabric::{PlatformMapping, PlatformMappings};
use rib::{InterfaceRoute, RouteForwardAction, StaticRoute};
use state::{
    AdminState, DsfNode, Interface, Node, NodeMap, OperState, Port, PortId,
    PortType, RouterId, StateError, SwitchId, SwitchInfo, SwitchSettings, SwitchState,
    SwitchType, SystemPort, SystemPortId, Vlan,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Build the fabric port tables of the platforms described in a configuration
pub fn platform_mappings(config: &SwitchConfig) -> Result<PlatformMappings, AgentError> {
    let mut mappings = PlatformMappings::new();
    for platform in &config.fabric_platforms {
        let mut mapping = PlatformMapping::new();
        for port in &platform.ports {
            mapping.add_port(&port.name, PortId(port.id), port.virtual_device)?;
        }
        debug!("Platform mapping of {}: {} fabric ports", platform.asic, mapping.len());
        mappings.insert(platform.asic, mapping);
    }
    Ok(mappings)
}

/// Make a map holding exactly the `wanted` nodes. Nodes equal to those of `current` are shared
/// with it. Returns `None` if the result would be equal to `current`.
fn rebuild<N: Node>(current: &NodeMap<N>, wanted: impl IntoIterator<Item = N>) -> Option<NodeMap<N>> {
    let mut map = NodeMap::new();
    for node in wanted {
        match current.get(&node.key()) {
            Some(old) if **old == node => {
                map.add_or_update_shared(old.clone());
            }
            _ => {
                map.add_or_update_node(node);
            }
        }
    }
    (map != *current).then_some(map)
}

fn settings(config: &SwitchConfig) -> SwitchSettings {
    config
        .settings
        .switches
        .iter()
        .fold(SwitchSettings::new(&config.settings.hostname), |settings, s| {
            settings.with_switch(
                s.id,
                SwitchInfo {
                    switch_type: s.switch_type,
                    asic: s.asic,
                    switch_index: s.index,
                },
            )
        })
}

fn ports(current: &SwitchState, config: &SwitchConfig) -> Vec<Port> {
    config
        .ports
        .iter()
        .map(|p| {
            let mut port = Port::new(p.id, &p.name).with_type(p.port_type);
            port.admin_state = if p.enabled {
                AdminState::Enabled
            } else {
                AdminState::Disabled
            };
            // the operational state is not configuration
            port.oper_state = current
                .ports()
                .get(&p.id)
                .map_or(OperState::Down, |old| old.oper_state);
            port.speed_mbps = p.speed_mbps;
            port.vlans = p.vlans.iter().copied().collect();
            port.expected_neighbors.clone_from(&p.expected_neighbors);
            port
        })
        .collect()
}

fn vlans(current: &SwitchState, config: &SwitchConfig) -> Vec<Vlan> {
    config
        .vlans
        .iter()
        .map(|v| {
            // learnt neighbors survive reconfiguration
            let mut vlan = current
                .vlans()
                .get(&v.id)
                .map_or_else(|| Vlan::new(v.id, &v.name), |old| Vlan::clone(old));
            vlan.name.clone_from(&v.name);
            vlan.ports = config
                .ports
                .iter()
                .filter(|p| p.vlans.contains(&v.id))
                .map(|p| p.id)
                .collect();
            vlan.interface = config
                .interfaces
                .iter()
                .find(|i| i.vlan == Some(v.id))
                .map(|i| i.id);
            vlan
        })
        .collect()
}

/// The local switch owning a system port, by the system port ranges of the local DSF nodes
fn switch_of_system_port(config: &SwitchConfig, id: SystemPortId) -> Option<SwitchId> {
    config
        .settings
        .switches
        .iter()
        .filter_map(|s| config.dsf_node(s.id))
        .find(|n| {
            n.system_port_range
                .is_some_and(|r| r.min <= id && id <= r.max)
        })
        .map(|n| n.switch_id)
}

fn interfaces(current: &SwitchState, config: &SwitchConfig) -> Result<Vec<Interface>, AgentError> {
    let default_switch = config
        .settings
        .switches
        .first()
        .map(|s| s.id)
        .unwrap_or_default();
    let mut interfaces = vec![];
    for i in &config.interfaces {
        let mac = i.mac()?;
        let mut intf = current.interfaces().get(&i.id).map_or_else(
            || Interface::new(i.id, i.vrf, &i.name, mac),
            |old| Interface::clone(old),
        );
        intf.router_id = i.vrf;
        intf.name.clone_from(&i.name);
        intf.mac = mac;
        intf.intf_type = i.intf_type;
        intf.vlan = i.vlan;
        intf.system_port = i.system_port;
        intf.switch_id = i
            .system_port
            .and_then(|sp| switch_of_system_port(config, sp))
            .unwrap_or(default_switch);
        intf.mtu = i.mtu.unwrap_or(Interface::DEFAULT_MTU);
        intf.addresses = i.addresses()?.into_iter().collect();
        interfaces.push(intf);
    }
    Ok(interfaces)
}

/// System ports of the local VOQ switches: one per front panel port, numbered from the start of
/// the system port range of the switch. Ports all belong to the first VOQ switch.
fn system_ports(config: &SwitchConfig) -> Result<Vec<SystemPort>, AgentError> {
    let Some(switch) = config
        .settings
        .switches
        .iter()
        .find(|s| s.switch_type == SwitchType::Voq)
    else {
        return Ok(vec![]);
    };
    let range = config
        .dsf_node(switch.id)
        .and_then(|n| n.system_port_range)
        .ok_or_else(|| {
            StateError::Invalid(format!("VOQ switch {} has no system port range", switch.id))
        })?;
    let mut system_ports = vec![];
    for port in config.ports.iter().filter(|p| p.port_type == PortType::Interface) {
        let id = SystemPortId(range.min.0 + u64::from(port.id.0));
        if id > range.max {
            return Err(StateError::Invalid(format!(
                "system port of {} would be {id}, beyond the range of switch {}",
                port.name, switch.id
            ))
            .into());
        }
        let mut sysport = SystemPort::new(
            id,
            switch.id,
            &format!("{}:{}", config.settings.hostname, port.name),
        );
        sysport.core_index = u32::from(switch.index);
        sysport.port = Some(port.id);
        sysport.speed_mbps = port.speed_mbps;
        system_ports.push(sysport);
    }
    Ok(system_ports)
}

/// Remote entries can not belong to switches that are local now
fn prune_remote<N, F>(map: &NodeMap<N>, settings: &SwitchSettings, switch_of: F) -> Option<NodeMap<N>>
where
    N: Node,
    F: Fn(&N) -> SwitchId,
{
    if !map.values().any(|n| settings.is_local_switch(switch_of(n))) {
        return None;
    }
    let mut pruned = map.clone();
    pruned.retain(|_, n| !settings.is_local_switch(switch_of(n)));
    Some(pruned)
}

/// Make a candidate state out of `current` and a validated configuration. The candidate is
/// `current` itself if the configuration changes nothing.
pub fn build_state(
    current: &Arc<SwitchState>,
    config: &SwitchConfig,
) -> Result<Arc<SwitchState>, AgentError> {
    let mut next = current.clone();

    let settings = settings(config);
    if *current.settings() != settings {
        *SwitchState::modify(&mut next).settings_mut() = settings.clone();
    }
    if let Some(map) = rebuild(current.ports(), ports(current, config)) {
        *SwitchState::modify(&mut next).ports_mut() = map;
    }
    if let Some(map) = rebuild(current.vlans(), vlans(current, config)) {
        *SwitchState::modify(&mut next).vlans_mut() = map;
    }
    if let Some(map) = rebuild(current.interfaces(), interfaces(current, config)?) {
        *SwitchState::modify(&mut next).interfaces_mut() = map;
    }
    if let Some(map) = rebuild(current.system_ports(), system_ports(config)?) {
        *SwitchState::modify(&mut next).system_ports_mut() = map;
    }
    let dsf_nodes = config.dsf_nodes.iter().map(DsfNode::from);
    if let Some(map) = rebuild(current.dsf_nodes(), dsf_nodes) {
        *SwitchState::modify(&mut next).dsf_nodes_mut() = map;
    }
    if let Some(map) = prune_remote(current.remote_system_ports(), &settings, |p| p.switch_id) {
        SwitchState::modify(&mut next).reset_remote_system_ports(map);
    }
    if let Some(map) = prune_remote(current.remote_interfaces(), &settings, |i| i.switch_id) {
        SwitchState::modify(&mut next).reset_remote_interfaces(map);
    }
    Ok(next)
}

fn static_route(route: &StaticRouteConfig) -> StaticRoute {
    StaticRoute {
        vrf: route.vrf,
        prefix: route.prefix,
        action: match route.action {
            RouteAction::NextHops => RouteForwardAction::NextHops,
            RouteAction::Drop => RouteForwardAction::Drop,
            RouteAction::ToCpu => RouteForwardAction::ToCpu,
        },
        nexthops: route.nexthops.clone(),
    }
}

/// The interface routes by VRF and the static routes of a configuration
pub fn rib_config(
    config: &SwitchConfig,
) -> Result<(BTreeMap<RouterId, Vec<InterfaceRoute>>, Vec<StaticRoute>), AgentError> {
    let mut interface_routes: BTreeMap<RouterId, Vec<InterfaceRoute>> = BTreeMap::new();
    for intf in &config.interfaces {
        let routes = interface_routes.entry(intf.vrf).or_default();
        for (addr, len) in intf.addresses()? {
            routes.push(InterfaceRoute {
                interface: intf.id,
                addr,
                len,
            });
        }
    }
    let mut vrfs: BTreeSet<RouterId> = interface_routes.keys().copied().collect();
    vrfs.insert(RouterId::DEFAULT);
    if let Some(route) = config.static_routes.iter().find(|r| !vrfs.contains(&r.vrf)) {
        return Err(rib::RibError::NoSuchVrf(route.vrf).into());
    }
    let static_routes = config.static_routes.iter().map(static_route).collect();
    Ok((interface_routes, static_routes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{DsfNodeConfig, InterfaceConfig, PortConfig, SwitchIdConfig, VlanConfig};
    use pretty_assertions::assert_eq;
    use state::{
        AsicType, DsfNodeType, InterfaceId, InterfaceType, Publishable, SystemPortRange, VlanId,
    };

    const MAC: &str = "02:00:00:00:00:04";

    fn voq_config() -> SwitchConfig {
        let mut config = SwitchConfig::default();
        config.settings.hostname = "rdsw001".to_owned();
        config.settings.switches.push(SwitchIdConfig {
            id: SwitchId(4),
            switch_type: SwitchType::Voq,
            asic: AsicType::Jericho2,
            index: 0,
        });
        config.dsf_nodes.push(DsfNodeConfig {
            switch_id: SwitchId(4),
            name: "rdsw001".to_owned(),
            node_type: DsfNodeType::Interface,
            asic: AsicType::Jericho2,
            platform: String::new(),
            loopbacks: vec!["2401::4".parse().unwrap()],
            system_port_range: Some(SystemPortRange {
                min: SystemPortId(100),
                max: SystemPortId(199),
            }),
        });
        config.ports.push(PortConfig::new(PortId(1), "eth1/1/1"));
        config.ports.push(PortConfig::new(PortId(2), "eth1/2/1"));
        config
            .ports
            .push(PortConfig::fabric(PortId(50), "fab1/1/1").with_expected_neighbor("fdsw", "fab1/1/1"));
        let mut intf = InterfaceConfig::new(InterfaceId(101), "eth1/1/1", MAC)
            .with_address("10.0.1.1/24")
            .with_address("2401:db00::1/64");
        intf.intf_type = InterfaceType::SystemPort;
        intf.system_port = Some(SystemPortId(101));
        config.interfaces.push(intf);
        config
    }

    fn published(state: SwitchState) -> Arc<SwitchState> {
        let state = Arc::new(state);
        state.publish();
        state
    }

    #[test]
    fn test_build_voq_state() {
        let config = voq_config();
        assert_eq!(config.validate(), Ok(()));
        let current = published(SwitchState::new());
        let next = build_state(&current, &config).unwrap();
        assert_eq!(next.generation(), 1);
        assert!(next.is_local_switch_id(SwitchId(4)));
        assert_eq!(next.ports().len(), 3);

        // no system port for the fabric port
        let sysports: Vec<_> = next.system_ports().keys().map(|k| k.0).collect();
        assert_eq!(sysports, vec![101, 102]);
        let sysport = next.system_ports().get(&SystemPortId(101)).unwrap();
        assert_eq!(sysport.name, "rdsw001:eth1/1/1");
        assert_eq!(sysport.switch_id, SwitchId(4));

        let intf = next.interfaces().get(&InterfaceId(101)).unwrap();
        assert_eq!(intf.switch_id, SwitchId(4));
        assert_eq!(intf.addresses.len(), 2);
        assert_eq!(next.dsf_nodes().len(), 1);
    }

    #[test]
    fn test_reapply_is_noop() {
        let config = voq_config();
        let current = published(SwitchState::new());
        let next = build_state(&current, &config).unwrap();
        next.publish();
        let again = build_state(&next, &config).unwrap();
        assert!(Arc::ptr_eq(&next, &again));
    }

    #[test]
    fn test_oper_state_and_neighbors_survive() {
        let mut config = SwitchConfig::default();
        config.vlans.push(VlanConfig::new(VlanId(10), "vlan10"));
        let mut port = PortConfig::new(PortId(1), "eth1");
        port.vlans.push(VlanId(10));
        config.ports.push(port);

        let current = published(SwitchState::new());
        let mut next = build_state(&current, &config).unwrap();
        SwitchState::modify(&mut next)
            .ports_mut()
            .modify_node(&PortId(1))
            .unwrap()
            .oper_state = OperState::Up;
        next.publish();

        config.ports[0].speed_mbps = 100_000;
        let after = build_state(&next, &config).unwrap();
        let port = after.ports().get(&PortId(1)).unwrap();
        assert_eq!(port.oper_state, OperState::Up);
        assert_eq!(port.speed_mbps, 100_000);
        let vlan = after.vlans().get(&VlanId(10)).unwrap();
        assert_eq!(vlan.ports.iter().copied().collect::<Vec<_>>(), vec![PortId(1)]);
        // untouched maps are shared
        assert!(std::ptr::eq(after.vlans(), next.vlans()));
    }

    #[test]
    fn test_system_port_out_of_range() {
        let mut config = voq_config();
        config.ports.push(PortConfig::new(PortId(150), "eth1/50/1"));
        let current = published(SwitchState::new());
        assert!(matches!(
            build_state(&current, &config),
            Err(AgentError::State(StateError::Invalid(_)))
        ));
    }

    #[test]
    fn test_rib_config() {
        let mut config = voq_config();
        config.static_routes.push(StaticRouteConfig::via(
            "0.0.0.0/0".parse().unwrap(),
            &["10.0.1.2".parse().unwrap()],
        ));
        let (intf_routes, static_routes) = rib_config(&config).unwrap();
        assert_eq!(intf_routes.get(&RouterId::DEFAULT).map(Vec::len), Some(2));
        assert_eq!(static_routes.len(), 1);
        assert_eq!(static_routes[0].action, RouteForwardAction::NextHops);

        config.static_routes[0].vrf = RouterId(7);
        assert_eq!(
            rib_config(&config).map(|_| ()),
            Err(AgentError::Rib(rib::RibError::NoSuchVrf(RouterId(7))))
        );
    }

    #[test]
    fn test_platform_mappings() {
        let config = SwitchConfig::from_yaml(
            "fabric_platforms:\n  - asic: ramon\n    ports:\n      - { name: fab1/2/4, id: 12, virtual_device: 0 }\n",
        )
        .unwrap();
        let mappings = platform_mappings(&config).unwrap();
        let ramon = mappings.get(AsicType::Ramon).unwrap();
        assert_eq!(ramon.port_id("fab1/2/4"), Some(PortId(12)));
    }
}
