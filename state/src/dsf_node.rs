// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Members of a distributed switch fabric

use crate::ids::{SwitchId, SystemPortId};
use crate::node::{Node, NodeMap, PublishFlag, Publishable};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsicType {
    Jericho2,
    Jericho3,
    Ramon,
    Ramon3,
    Tomahawk4,
    Fake,
}

impl Display for AsicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AsicType::Jericho2 => "jericho2",
            AsicType::Jericho3 => "jericho3",
            AsicType::Ramon => "ramon",
            AsicType::Ramon3 => "ramon3",
            AsicType::Tomahawk4 => "tomahawk4",
            AsicType::Fake => "fake",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DsfNodeType {
    /// Carries front panel ports and system ports
    Interface,
    /// Interconnects interface nodes
    Fabric,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPortRange {
    pub min: SystemPortId,
    pub max: SystemPortId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DsfNode {
    pub switch_id: SwitchId,
    pub name: String,
    pub node_type: DsfNodeType,
    pub asic: AsicType,
    pub platform: String,
    pub loopback_ips: Vec<IpAddr>,
    pub system_port_range: Option<SystemPortRange>,
    flag: PublishFlag,
}

impl DsfNode {
    #[must_use]
    pub fn new(switch_id: SwitchId, name: &str, node_type: DsfNodeType, asic: AsicType) -> Self {
        Self {
            switch_id,
            name: name.to_owned(),
            node_type,
            asic,
            platform: String::new(),
            loopback_ips: vec![],
            system_port_range: None,
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn with_loopbacks(mut self, ips: &[IpAddr]) -> Self {
        self.loopback_ips = ips.to_vec();
        self
    }

    #[must_use]
    pub fn is_interface_node(&self) -> bool {
        self.node_type == DsfNodeType::Interface
    }
}

impl Publishable for DsfNode {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl Node for DsfNode {
    type Key = SwitchId;
    const KIND: &'static str = "dsf node";

    fn key(&self) -> SwitchId {
        self.switch_id
    }
}

pub type DsfNodeMap = NodeMap<DsfNode>;
