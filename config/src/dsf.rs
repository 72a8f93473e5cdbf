// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of the members of a distributed switch fabric

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use state::{AsicType, DsfNode, DsfNodeType, SwitchId, SystemPortRange};
use std::net::IpAddr;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DsfNodeConfig {
    pub switch_id: SwitchId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: DsfNodeType,
    pub asic: AsicType,
    #[serde(default)]
    pub platform: String,
    /// Addresses the remote state service of the node listens on
    #[serde(default)]
    pub loopbacks: Vec<IpAddr>,
    #[serde(default)]
    pub system_port_range: Option<SystemPortRange>,
}

impl DsfNodeConfig {
    pub fn validate(&self) -> ConfigResult {
        debug!("Validating DSF node {} ({})..", self.name, self.switch_id);
        if self.name.is_empty() {
            return Err(ConfigError::MissingParameter("DSF node name"));
        }
        if let Some(range) = self.system_port_range
            && range.min > range.max
        {
            return Err(ConfigError::Parse(format!(
                "system port range of {} is inverted: [{}, {}]",
                self.name, range.min, range.max
            )));
        }
        if self.node_type == DsfNodeType::Interface && self.system_port_range.is_none() {
            return Err(ConfigError::MissingParameter(
                "system port range of interface node",
            ));
        }
        Ok(())
    }
}

impl From<&DsfNodeConfig> for DsfNode {
    fn from(config: &DsfNodeConfig) -> Self {
        let mut node = DsfNode::new(config.switch_id, &config.name, config.node_type, config.asic)
            .with_loopbacks(&config.loopbacks);
        node.platform.clone_from(&config.platform);
        node.system_port_range = config.system_port_range;
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use state::SystemPortId;

    fn interface_node() -> DsfNodeConfig {
        DsfNodeConfig {
            switch_id: SwitchId(4),
            name: "rdsw001".to_owned(),
            node_type: DsfNodeType::Interface,
            asic: AsicType::Jericho2,
            platform: "meru400biu".to_owned(),
            loopbacks: vec!["2401::1".parse().unwrap()],
            system_port_range: Some(SystemPortRange {
                min: SystemPortId(100),
                max: SystemPortId(199),
            }),
        }
    }

    #[test]
    fn test_validate() {
        let mut config = interface_node();
        assert_eq!(config.validate(), Ok(()));
        config.system_port_range = None;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingParameter(
                "system port range of interface node"
            ))
        );
        config.node_type = DsfNodeType::Fabric;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_to_state_node() {
        let node = DsfNode::from(&interface_node());
        assert_eq!(node.switch_id, SwitchId(4));
        assert_eq!(node.platform, "meru400biu");
        assert_eq!(node.loopback_ips.len(), 1);
        assert!(node.is_interface_node());
    }
}
