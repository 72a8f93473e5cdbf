// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Expected versus actual connectivity of the local fabric ports

use crate::asic::AsicProfile;
use crate::endpoint::{FabricConnectivityDelta, FabricEndpoint, RemoteEndpoint};
use crate::errors::FabricError;
use crate::platform::PlatformMappings;
use state::{DeltaEntry, DsfNode, Port, PortId, StateDelta, StateObserver, SwitchId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Remote endpoints of one virtual device, grouped by their number of connecting ports
pub type RemoteConnectionGroups = BTreeMap<usize, BTreeSet<RemoteEndpoint>>;

pub struct FabricConnectivityManager {
    platforms: PlatformMappings,
    endpoints: BTreeMap<PortId, FabricEndpoint>,
    port_names: BTreeMap<PortId, String>,
    dsf_nodes: BTreeMap<SwitchId, Arc<DsfNode>>,
    // several DSF nodes share a name on multi-NPU systems
    switch_ids_by_name: BTreeMap<String, BTreeSet<SwitchId>>,
    // every core id of a node to the node's base id and name
    base_switch_ids: BTreeMap<SwitchId, (SwitchId, String)>,
}

impl FabricConnectivityManager {
    #[must_use]
    pub fn new(platforms: PlatformMappings) -> Self {
        Self {
            platforms,
            endpoints: BTreeMap::new(),
            port_names: BTreeMap::new(),
            dsf_nodes: BTreeMap::new(),
            switch_ids_by_name: BTreeMap::new(),
            base_switch_ids: BTreeMap::new(),
        }
    }

    /// Endpoints of all the known fabric ports
    #[must_use]
    pub fn connectivity(&self) -> &BTreeMap<PortId, FabricEndpoint> {
        &self.endpoints
    }

    #[must_use]
    pub fn endpoint(&self, port: PortId) -> Option<&FabricEndpoint> {
        self.endpoints.get(&port)
    }

    /// Derive the id of the expected remote switch and port from their configured names
    fn expected_ids(
        &self,
        switch_name: &str,
        port_name: &str,
    ) -> Result<(SwitchId, PortId), FabricError> {
        let base = self
            .switch_ids_by_name
            .get(switch_name)
            .and_then(|ids| ids.first())
            .copied()
            .ok_or_else(|| FabricError::NoSwitchId(switch_name.to_owned()))?;
        let node = self
            .dsf_nodes
            .get(&base)
            .ok_or(FabricError::UnknownDsfNode(base))?;
        let mapping = self.platforms.get(node.asic)?;
        let info = mapping
            .port(port_name)
            .ok_or_else(|| FabricError::UnknownPortName {
                asic: node.asic,
                port: port_name.to_owned(),
            })?;
        let profile = AsicProfile::of(node.asic);
        let out_of_range = || FabricError::PortIdOutOfRange {
            switch: switch_name.to_owned(),
            port: info.port_id.0,
            asic: node.asic,
        };

        let switch_id = SwitchId(base.0 + u64::from(info.virtual_device));
        let mut port_id = info
            .port_id
            .0
            .checked_sub(profile.remote_port_offset)
            .ok_or_else(out_of_range)?;
        // offset within its ASIC on multi-ASIC nodes
        port_id %= profile.max_ports;
        // offset within its virtual device on multi-VD ASICs
        let vd_offset = info.virtual_device % profile.virtual_devices;
        port_id = port_id
            .checked_sub(profile.fabric_ports_per_virtual_device * vd_offset)
            .ok_or_else(out_of_range)?;
        Ok((switch_id, PortId(port_id)))
    }

    fn update_expected(&mut self, port: PortId) {
        let Some(endpoint) = self.endpoints.get(&port) else {
            return;
        };
        let (Some(switch_name), Some(port_name)) = (
            endpoint.expected_switch_name.clone(),
            endpoint.expected_port_name.clone(),
        ) else {
            if let Some(endpoint) = self.endpoints.get_mut(&port) {
                endpoint.expected_switch_id = None;
                endpoint.expected_port_id = None;
                endpoint.switch_name = None;
                endpoint.port_name = None;
            }
            return;
        };

        let expected = self.expected_ids(&switch_name, &port_name);
        let Some(endpoint) = self.endpoints.get_mut(&port) else {
            return;
        };
        match expected {
            Ok((switch_id, port_id)) => {
                debug!(
                    "Local port {port} expects peer {switch_name}:{port_name} (switch {switch_id} port {port_id})"
                );
                endpoint.expected_switch_id = Some(switch_id);
                endpoint.expected_port_id = Some(port_id);
            }
            Err(FabricError::NoSwitchId(_)) => {
                // the DSF node may not be configured yet
                debug!("Local port {port}: no DSF node named {switch_name} yet");
                endpoint.expected_switch_id = None;
                endpoint.expected_port_id = None;
            }
            Err(e) => {
                warn!("Local port {port}: unable to derive expected peer: {e}");
                endpoint.expected_switch_id = None;
                endpoint.expected_port_id = None;
            }
        }
    }

    fn add_or_update_port(&mut self, port: &Port) {
        // the connectivity of the other ports is learnt by other means
        if !port.is_fabric() {
            self.remove_port(port);
            return;
        }
        if port.expected_neighbors.len() > 1 {
            error!(
                "Fabric port {} has {} expected neighbors, only one is supported",
                port.name,
                port.expected_neighbors.len()
            );
            panic!(
                "Fabric port {} has more than one expected neighbor",
                port.name
            );
        }
        self.port_names.insert(port.id, port.name.clone());
        let endpoint = self.endpoints.entry(port.id).or_default();
        let neighbor = port.expected_neighbors.first();
        endpoint.expected_switch_name = neighbor.map(|n| n.remote_system.clone());
        endpoint.expected_port_name = neighbor.map(|n| n.remote_port.clone());
        self.update_expected(port.id);
    }

    fn remove_port(&mut self, port: &Port) {
        self.endpoints.remove(&port.id);
        self.port_names.remove(&port.id);
    }

    fn add_dsf_node(&mut self, node: &Arc<DsfNode>) {
        let base = node.switch_id;
        self.dsf_nodes.insert(base, node.clone());
        self.switch_ids_by_name
            .entry(node.name.clone())
            .or_default()
            .insert(base);
        // a multi-core node is known by its first id, the hardware may report any of the others
        for core in 0..AsicProfile::of(node.asic).num_cores {
            self.base_switch_ids
                .insert(SwitchId(base.0 + core), (base, node.name.clone()));
        }
    }

    fn remove_dsf_node(&mut self, node: &Arc<DsfNode>) {
        self.dsf_nodes.remove(&node.switch_id);
        if let Some(ids) = self.switch_ids_by_name.get_mut(&node.name) {
            ids.remove(&node.switch_id);
            if ids.is_empty() {
                self.switch_ids_by_name.remove(&node.name);
            }
        }
        self.base_switch_ids
            .retain(|_, (base, _)| *base != node.switch_id);
    }

    /// Port id on the remote switch, as used in the platform mapping of that switch
    fn actual_port_id(
        &self,
        port: PortId,
        switch_id: SwitchId,
        base: SwitchId,
        name: &str,
    ) -> Option<PortId> {
        let ids = self.switch_ids_by_name.get(name)?;
        let npu_index = ids.iter().position(|id| *id == base)?;
        let node = self.dsf_nodes.get(&base)?;
        let profile = AsicProfile::of(node.asic);
        let npu_index = u32::try_from(npu_index).ok()?;
        let core = u32::try_from(switch_id.0.checked_sub(base.0)?).ok()?;
        let actual = npu_index
            .checked_mul(profile.max_ports)
            .zip(core.checked_mul(profile.fabric_ports_per_virtual_device))
            .and_then(|(npu, core)| port.0.checked_add(npu)?.checked_add(core))
            .and_then(|id| id.checked_add(profile.remote_port_offset));
        if actual.is_none() {
            warn!("Port {port} reported by switch {switch_id} is out of range");
        }
        actual.map(PortId)
    }

    /// Names of the remote switch and port the hardware reports
    fn actual_names(&self, switch_id: SwitchId, port: PortId) -> (Option<String>, Option<String>) {
        let Some((base, switch_name)) = self.base_switch_ids.get(&switch_id) else {
            error!("Unknown peer switch id {switch_id}");
            return (None, None);
        };
        let port_name = self
            .actual_port_id(port, switch_id, *base, switch_name)
            .and_then(|actual| {
                let node = self.dsf_nodes.get(base)?;
                match self.platforms.get(node.asic) {
                    Ok(mapping) => mapping.port_name(actual).map(ToOwned::to_owned),
                    Err(e) => {
                        warn!("Unable to name port {actual} of {switch_name}: {e}");
                        None
                    }
                }
            });
        (Some(switch_name.clone()), port_name)
    }

    /// Merge a hardware sample for `port` with what is expected on it. Returns the change, if
    /// any, of the endpoint of the port.
    pub fn process_connectivity_info_for_port(
        &mut self,
        port: PortId,
        sample: &FabricEndpoint,
    ) -> Option<FabricConnectivityDelta> {
        let Some(current) = self.endpoints.get(&port) else {
            self.endpoints.insert(port, sample.clone());
            let delta = FabricConnectivityDelta {
                port,
                old: None,
                new: Some(sample.clone()),
            };
            debug!("Fabric connectivity changed on {delta}");
            return Some(delta);
        };

        let old = current.clone();
        let mut new = current.clone();
        new.is_attached = sample.is_attached;
        new.switch_id = sample.switch_id;
        new.port_id = sample.port_id;
        new.switch_type = sample.switch_type;

        let as_expected = new.expected_switch_id == Some(new.switch_id)
            && new.expected_port_id == Some(new.port_id)
            && new.expected_switch_name.is_some()
            && new.expected_port_name.is_some();
        if as_expected {
            new.switch_name.clone_from(&new.expected_switch_name);
            new.port_name.clone_from(&new.expected_port_name);
        } else {
            // miscabled, or nothing expected: name what is actually there
            let (switch_name, port_name) = self.actual_names(new.switch_id, new.port_id);
            if switch_name.is_some() {
                new.switch_name = switch_name;
            }
            if port_name.is_some() {
                new.port_name = port_name;
            }
        }

        if new == old {
            return None;
        }
        self.endpoints.insert(port, new.clone());
        let delta = FabricConnectivityDelta {
            port,
            old: Some(old),
            new: Some(new),
        };
        debug!("Fabric connectivity changed on {delta}");
        Some(delta)
    }

    /// Tell if `port` is attached to something else than what is expected
    #[must_use]
    pub fn is_connectivity_info_mismatch(&self, port: PortId) -> bool {
        self.endpoints
            .get(&port)
            .is_some_and(FabricEndpoint::is_mismatch)
    }

    /// Tell if the expected or actual neighbor of `port` is not fully known. Ports that are not
    /// fabric ports of this switch are never missing anything.
    #[must_use]
    pub fn is_connectivity_info_missing(&self, port: PortId) -> bool {
        self.endpoints
            .get(&port)
            .is_some_and(FabricEndpoint::is_missing)
    }

    /// Group the remote endpoints attached to every local virtual device by the number of links
    /// to them. `port_to_virtual_device` gives the local virtual device of a port; ports it has
    /// no answer for are skipped.
    pub fn virtual_device_to_remote_connection_groups<F>(
        &self,
        port_to_virtual_device: F,
    ) -> BTreeMap<u32, RemoteConnectionGroups>
    where
        F: Fn(PortId) -> Option<u32>,
    {
        let mut per_device: BTreeMap<u32, BTreeMap<(SwitchId, String), Vec<String>>> =
            BTreeMap::new();
        for (port, endpoint) in &self.endpoints {
            if !endpoint.is_attached {
                continue;
            }
            let Some(vd) = port_to_virtual_device(*port) else {
                debug!("No virtual device for port {port}");
                continue;
            };
            let port_name = self
                .port_names
                .get(port)
                .cloned()
                .unwrap_or_else(|| port.to_string());
            per_device
                .entry(vd)
                .or_default()
                .entry((
                    endpoint.switch_id,
                    endpoint.switch_name.clone().unwrap_or_default(),
                ))
                .or_default()
                .push(port_name);
        }

        per_device
            .into_iter()
            .map(|(vd, remotes)| {
                let mut groups = RemoteConnectionGroups::new();
                for ((switch_id, switch_name), connecting_ports) in remotes {
                    groups
                        .entry(connecting_ports.len())
                        .or_default()
                        .insert(RemoteEndpoint {
                            switch_id,
                            switch_name,
                            connecting_ports,
                        });
                }
                (vd, groups)
            })
            .collect()
    }

    /// Number of virtual devices whose remote switches are not all reached over the same
    /// number of links
    #[must_use]
    pub fn virtual_devices_with_asymmetric_connectivity(
        groups: &BTreeMap<u32, RemoteConnectionGroups>,
    ) -> usize {
        groups
            .iter()
            .filter(|(vd, remote)| {
                let asymmetric = remote.len() > 1;
                if asymmetric {
                    debug!("Asymmetric topology on virtual device {vd}");
                    for (links, endpoints) in *remote {
                        for endpoint in endpoints {
                            debug!("  {links} links: {endpoint}");
                        }
                    }
                }
                asymmetric
            })
            .count()
    }

    fn update_ports(&mut self, delta: &StateDelta) {
        for entry in delta.ports_delta() {
            match entry {
                DeltaEntry::Added(port) | DeltaEntry::Changed { new: port, .. } => {
                    self.add_or_update_port(port);
                }
                DeltaEntry::Removed(port) => self.remove_port(port),
            }
        }
    }

    fn update_dsf_nodes(&mut self, delta: &StateDelta) {
        let nodes = delta.dsf_nodes_delta();
        for entry in nodes {
            match entry {
                DeltaEntry::Changed { old, new } => {
                    self.remove_dsf_node(old);
                    self.add_dsf_node(new);
                }
                DeltaEntry::Added(new) => self.add_dsf_node(new),
                DeltaEntry::Removed(old) => self.remove_dsf_node(old),
            }
        }
        // the name to id tables changed, expectations may resolve differently
        if !nodes.is_empty() {
            let ports: Vec<PortId> = self.endpoints.keys().copied().collect();
            for port in ports {
                self.update_expected(port);
            }
        }
    }
}

impl StateObserver for FabricConnectivityManager {
    fn name(&self) -> &str {
        "fabric connectivity"
    }

    fn state_updated(&mut self, delta: &StateDelta) {
        self.update_ports(delta);
        self.update_dsf_nodes(delta);
    }
}
