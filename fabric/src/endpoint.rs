// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! What sits at the far end of a fabric link

use serde::{Deserialize, Serialize};
use state::{PortId, SwitchId, SwitchType};
use std::fmt::Display;

/// The link partner of a local fabric port: what the hardware reports (`switch_id`, `port_id`,
/// `is_attached`), the names derived from it, and what configuration expects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricEndpoint {
    pub is_attached: bool,
    pub switch_id: SwitchId,
    pub port_id: PortId,
    pub switch_type: Option<SwitchType>,
    pub switch_name: Option<String>,
    pub port_name: Option<String>,
    pub expected_switch_id: Option<SwitchId>,
    pub expected_port_id: Option<PortId>,
    pub expected_switch_name: Option<String>,
    pub expected_port_name: Option<String>,
}

impl FabricEndpoint {
    /// An endpoint as sampled from hardware
    #[must_use]
    pub fn sample(switch_id: SwitchId, port_id: PortId, is_attached: bool) -> Self {
        Self {
            is_attached,
            switch_id,
            port_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_switch_type(mut self, switch_type: SwitchType) -> Self {
        self.switch_type = Some(switch_type);
        self
    }

    /// Attached to some link partner other than the expected one
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        if !self.is_attached {
            // usually a down port, nothing to compare
            return false;
        }
        if self.expected_switch_id.is_some_and(|id| id != self.switch_id) {
            return true;
        }
        if self.expected_port_id.is_some_and(|id| id != self.port_id) {
            return true;
        }
        self.switch_name != self.expected_switch_name || self.port_name != self.expected_port_name
    }

    /// Either side of the link information is incomplete
    #[must_use]
    pub fn is_missing(&self) -> bool {
        if !self.is_attached {
            // down ports with no expectations are just noise
            return self.expected_switch_id.is_some() || self.expected_port_id.is_some();
        }
        self.expected_switch_id.is_none()
            || self.expected_port_id.is_none()
            || self.switch_name.is_none()
            || self.expected_switch_name.is_none()
            || self.port_name.is_none()
            || self.expected_port_name.is_none()
    }
}

fn opt<T: Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".to_owned(), ToString::to_string)
}

impl Display for FabricEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "attached:{} switch:{} ({}) port:{} ({}) expected switch:{} ({}) port:{} ({})",
            self.is_attached,
            self.switch_id,
            opt(self.switch_name.as_ref()),
            self.port_id,
            opt(self.port_name.as_ref()),
            opt(self.expected_switch_id.as_ref()),
            opt(self.expected_switch_name.as_ref()),
            opt(self.expected_port_id.as_ref()),
            opt(self.expected_port_name.as_ref()),
        )
    }
}

/// Change of the endpoint of one port
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricConnectivityDelta {
    pub port: PortId,
    pub old: Option<FabricEndpoint>,
    pub new: Option<FabricEndpoint>,
}

impl Display for FabricConnectivityDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port {}: old endpoint: ", self.port)?;
        match &self.old {
            Some(old) => write!(f, "{old}")?,
            None => write!(f, "none")?,
        }
        write!(f, " new endpoint: ")?;
        match &self.new {
            Some(new) => write!(f, "{new}"),
            None => write!(f, "none"),
        }
    }
}

/// A remote switch and the local ports connecting to it
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub switch_id: SwitchId,
    pub switch_name: String,
    pub connecting_ports: Vec<String>,
}

impl Display for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) via {}",
            self.switch_name,
            self.switch_id,
            self.connecting_ports.join(",")
        )
    }
}
