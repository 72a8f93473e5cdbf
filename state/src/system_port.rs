// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! System ports, local and learnt from remote fabric nodes

use crate::ids::{PortId, SwitchId, SystemPortId};
use crate::node::{Node, NodeMap, PublishFlag, Publishable};
use serde::{Deserialize, Serialize};

/// How a remote entry came to be in the local state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEntryType {
    /// From local configuration
    Static,
    /// Learnt over a remote state subscription
    Dynamic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessStatus {
    Live,
    /// The remote node went away and its entries are kept until it comes back
    Stale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAttrs {
    pub kind: RemoteEntryType,
    pub liveness: LivenessStatus,
}

impl RemoteAttrs {
    #[must_use]
    pub fn dynamic_live() -> Self {
        Self {
            kind: RemoteEntryType::Dynamic,
            liveness: LivenessStatus::Live,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SystemPort {
    pub id: SystemPortId,
    pub switch_id: SwitchId,
    pub name: String,
    pub core_index: u32,
    pub port: Option<PortId>,
    pub speed_mbps: u32,
    pub num_voqs: u8,
    pub remote: Option<RemoteAttrs>,
    flag: PublishFlag,
}

impl SystemPort {
    #[must_use]
    pub fn new(id: SystemPortId, switch_id: SwitchId, name: &str) -> Self {
        Self {
            id,
            switch_id,
            name: name.to_owned(),
            core_index: 0,
            port: None,
            speed_mbps: 0,
            num_voqs: 8,
            remote: None,
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.remote
            .is_some_and(|r| r.liveness == LivenessStatus::Stale)
    }
}

impl Publishable for SystemPort {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl Node for SystemPort {
    type Key = SystemPortId;
    const KIND: &'static str = "system port";

    fn key(&self) -> SystemPortId {
        self.id
    }
}

pub type SystemPortMap = NodeMap<SystemPort>;
