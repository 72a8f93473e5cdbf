// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ports

use crate::ids::{PortId, VlanId};
use crate::node::{Node, NodeMap, PublishFlag, Publishable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    #[default]
    Interface,
    Fabric,
    Recycle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    #[default]
    Disabled,
    Enabled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperState {
    #[default]
    Down,
    Up,
}

/// The neighbor a port is expected to be cabled to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedNeighbor {
    pub remote_system: String,
    pub remote_port: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub port_type: PortType,
    pub admin_state: AdminState,
    pub oper_state: OperState,
    pub speed_mbps: u32,
    pub vlans: BTreeSet<VlanId>,
    pub expected_neighbors: Vec<ExpectedNeighbor>,
    flag: PublishFlag,
}

impl Port {
    #[must_use]
    pub fn new(id: PortId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            port_type: PortType::default(),
            admin_state: AdminState::default(),
            oper_state: OperState::default(),
            speed_mbps: 0,
            vlans: BTreeSet::new(),
            expected_neighbors: vec![],
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, port_type: PortType) -> Self {
        self.port_type = port_type;
        self
    }

    #[must_use]
    pub fn with_expected_neighbor(mut self, remote_system: &str, remote_port: &str) -> Self {
        self.expected_neighbors.push(ExpectedNeighbor {
            remote_system: remote_system.to_owned(),
            remote_port: remote_port.to_owned(),
        });
        self
    }

    #[must_use]
    pub fn is_fabric(&self) -> bool {
        self.port_type == PortType::Fabric
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.admin_state == AdminState::Enabled && self.oper_state == OperState::Up
    }
}

impl Publishable for Port {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl Node for Port {
    type Key = PortId;
    const KIND: &'static str = "port";

    fn key(&self) -> PortId {
        self.id
    }
}

pub type PortMap = NodeMap<Port>;
