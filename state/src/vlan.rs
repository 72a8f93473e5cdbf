// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VLANs and their neighbor tables

use crate::ids::{InterfaceId, PortId, VlanId};
use crate::neighbor::{ArpTable, NdpTable};
use crate::node::{Node, NodeMap, PublishFlag, Publishable, cow};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct Vlan {
    pub id: VlanId,
    pub name: String,
    pub interface: Option<InterfaceId>,
    pub ports: BTreeSet<PortId>,
    arp_table: Arc<ArpTable>,
    ndp_table: Arc<NdpTable>,
    flag: PublishFlag,
}

impl Vlan {
    #[must_use]
    pub fn new(id: VlanId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            interface: None,
            ports: BTreeSet::new(),
            arp_table: Arc::default(),
            ndp_table: Arc::default(),
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn arp_table(&self) -> &ArpTable {
        &self.arp_table
    }
    #[must_use]
    pub fn ndp_table(&self) -> &NdpTable {
        &self.ndp_table
    }
    pub fn arp_table_mut(&mut self) -> &mut ArpTable {
        self.flag.assert_mutable(Self::KIND);
        cow(&mut self.arp_table)
    }
    pub fn ndp_table_mut(&mut self) -> &mut NdpTable {
        self.flag.assert_mutable(Self::KIND);
        cow(&mut self.ndp_table)
    }
}

impl Publishable for Vlan {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
    fn publish(&self) {
        self.arp_table.publish();
        self.ndp_table.publish();
        self.flag.publish();
    }
}

impl Node for Vlan {
    type Key = VlanId;
    const KIND: &'static str = "vlan";

    fn key(&self) -> VlanId {
        self.id
    }
}

pub type VlanMap = NodeMap<Vlan>;
