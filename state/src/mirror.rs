// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Traffic mirrors

use crate::ids::PortId;
use crate::node::{Node, NodeMap, PublishFlag, Publishable};
use std::net::IpAddr;

#[derive(Clone, Debug, PartialEq)]
pub struct Mirror {
    pub name: String,
    pub egress_port: Option<PortId>,
    /// Tunnel destination for remote mirrors
    pub destination: Option<IpAddr>,
    flag: PublishFlag,
}

impl Mirror {
    #[must_use]
    pub fn new(name: &str, egress_port: Option<PortId>, destination: Option<IpAddr>) -> Self {
        Self {
            name: name.to_owned(),
            egress_port,
            destination,
            flag: PublishFlag::new(),
        }
    }
}

impl Publishable for Mirror {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl Node for Mirror {
    type Key = String;
    const KIND: &'static str = "mirror";

    fn key(&self) -> String {
        self.name.clone()
    }
}

pub type MirrorMap = NodeMap<Mirror>;
