// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The configuration of a switch as a whole

use crate::dsf::DsfNodeConfig;
use crate::interface::InterfaceConfig;
use crate::platform::FabricPlatformConfig;
use crate::port::{PortConfig, VlanConfig};
use crate::routes::StaticRouteConfig;
use crate::tracecfg::TracingConfig;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use state::{AsicType, NeighborTableLocation, SwitchId, SwitchType};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, info};

/// A switching ASIC managed by the agent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchIdConfig {
    pub id: SwitchId,
    #[serde(rename = "type")]
    pub switch_type: SwitchType,
    pub asic: AsicType,
    #[serde(default)]
    pub index: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    pub hostname: String,
    pub neighbor_tables: NeighborTableLocation,
    pub switches: Vec<SwitchIdConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchConfig {
    pub settings: SettingsConfig,
    pub ports: Vec<PortConfig>,
    pub vlans: Vec<VlanConfig>,
    pub interfaces: Vec<InterfaceConfig>,
    pub dsf_nodes: Vec<DsfNodeConfig>,
    pub static_routes: Vec<StaticRouteConfig>,
    pub fabric_platforms: Vec<FabricPlatformConfig>,
    pub tracing: Option<TracingConfig>,
}

fn check_unique<K: Ord + Display>(
    what: &'static str,
    keys: impl Iterator<Item = K>,
) -> ConfigResult {
    let mut seen = BTreeSet::new();
    for key in keys {
        if seen.contains(&key) {
            return Err(ConfigError::DuplicateId(what, key.to_string()));
        }
        seen.insert(key);
    }
    Ok(())
}

fn check_unique_names<'a>(
    what: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> ConfigResult {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName(what, name.to_owned()));
        }
    }
    Ok(())
}

impl SwitchConfig {
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}..", path.display());
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        Self::from_yaml(&contents)
    }

    fn validate_settings(&self) -> ConfigResult {
        check_unique("switch", self.settings.switches.iter().map(|s| s.id))?;
        check_unique(
            "switch index",
            self.settings.switches.iter().map(|s| s.index),
        )
    }

    fn validate_ports_and_vlans(&self) -> ConfigResult {
        check_unique("vlan", self.vlans.iter().map(|v| v.id))?;
        check_unique_names("vlan", self.vlans.iter().map(|v| v.name.as_str()))?;
        check_unique("port", self.ports.iter().map(|p| p.id))?;
        check_unique_names("port", self.ports.iter().map(|p| p.name.as_str()))?;

        let vlans: BTreeSet<_> = self.vlans.iter().map(|v| v.id).collect();
        for port in &self.ports {
            port.validate()?;
            if let Some(missing) = port.vlans.iter().find(|v| !vlans.contains(v)) {
                return Err(ConfigError::NoSuchVlan(port.name.clone(), missing.0));
            }
        }
        Ok(())
    }

    fn validate_interfaces(&self) -> ConfigResult {
        check_unique("interface", self.interfaces.iter().map(|i| i.id))?;
        check_unique_names("interface", self.interfaces.iter().map(|i| i.name.as_str()))?;
        for interface in &self.interfaces {
            interface.validate()?;
            if let Some(vlan) = interface.vlan
                && !self.vlans.iter().any(|v| v.id == vlan)
            {
                return Err(ConfigError::NoSuchVlan(interface.name.clone(), vlan.0));
            }
        }
        Ok(())
    }

    fn validate_dsf_nodes(&self) -> ConfigResult {
        check_unique("DSF node", self.dsf_nodes.iter().map(|n| n.switch_id))?;
        check_unique_names("DSF node", self.dsf_nodes.iter().map(|n| n.name.as_str()))?;
        for node in &self.dsf_nodes {
            node.validate()?;
        }
        let voq = self
            .settings
            .switches
            .iter()
            .filter(|s| s.switch_type == SwitchType::Voq);
        for switch in voq {
            if !self.dsf_nodes.iter().any(|n| n.switch_id == switch.id) {
                return Err(ConfigError::NoDsfNodeForSwitch(switch.id.0));
            }
        }
        Ok(())
    }

    /// Validate the configuration as a whole. A valid configuration can be turned into a
    /// switch state without further checks.
    pub fn validate(&self) -> ConfigResult {
        debug!("Validating switch configuration..");
        self.validate_settings()?;
        self.validate_ports_and_vlans()?;
        self.validate_interfaces()?;
        self.validate_dsf_nodes()?;
        for route in &self.static_routes {
            route.validate()?;
        }
        check_unique(
            "fabric platform",
            self.fabric_platforms.iter().map(|p| p.asic),
        )?;
        for platform in &self.fabric_platforms {
            platform.validate()?;
        }
        if let Some(tracing) = &self.tracing {
            tracing.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_voq(&self) -> bool {
        self.settings
            .switches
            .iter()
            .any(|s| s.switch_type == SwitchType::Voq)
    }

    /// The DSF node describing a local switch
    #[must_use]
    pub fn dsf_node(&self, switch_id: SwitchId) -> Option<&DsfNodeConfig> {
        self.dsf_nodes.iter().find(|n| n.switch_id == switch_id)
    }
}
