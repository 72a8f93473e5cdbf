// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of front panel ports, fabric ports and VLANs

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use state::{ExpectedNeighbor, PortId, PortType, VlanId};
use tracing::debug;

fn enabled() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortConfig {
    pub id: PortId,
    pub name: String,
    #[serde(default, rename = "type")]
    pub port_type: PortType,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub speed_mbps: u32,
    #[serde(default)]
    pub vlans: Vec<VlanId>,
    /// Who the port should be cabled to. Only meaningful for fabric ports.
    #[serde(default)]
    pub expected_neighbors: Vec<ExpectedNeighbor>,
}

impl PortConfig {
    #[must_use]
    pub fn new(id: PortId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            port_type: PortType::default(),
            enabled: true,
            speed_mbps: 0,
            vlans: vec![],
            expected_neighbors: vec![],
        }
    }

    #[must_use]
    pub fn fabric(id: PortId, name: &str) -> Self {
        Self {
            port_type: PortType::Fabric,
            ..Self::new(id, name)
        }
    }

    #[must_use]
    pub fn with_expected_neighbor(mut self, remote_system: &str, remote_port: &str) -> Self {
        self.expected_neighbors.push(ExpectedNeighbor {
            remote_system: remote_system.to_owned(),
            remote_port: remote_port.to_owned(),
        });
        self
    }

    pub fn validate(&self) -> ConfigResult {
        debug!("Validating port {} ({})..", self.name, self.id);
        if self.name.is_empty() {
            return Err(ConfigError::MissingParameter("port name"));
        }
        if self.port_type == PortType::Fabric && self.expected_neighbors.len() > 1 {
            return Err(ConfigError::TooManyExpectedNeighbors(
                self.name.clone(),
                self.expected_neighbors.len(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VlanConfig {
    pub id: VlanId,
    pub name: String,
}

impl VlanConfig {
    #[must_use]
    pub fn new(id: VlanId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
        }
    }
}
