// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! L3 interfaces

use crate::ids::{InterfaceId, RouterId, SwitchId, SystemPortId, VlanId};
use crate::neighbor::{ArpTable, NdpTable};
use crate::node::{Node, NodeMap, PublishFlag, Publishable, cow};
use crate::system_port::{LivenessStatus, RemoteAttrs};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    #[default]
    Vlan,
    SystemPort,
    Port,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interface {
    pub id: InterfaceId,
    pub router_id: RouterId,
    pub name: String,
    pub intf_type: InterfaceType,
    pub vlan: Option<VlanId>,
    pub system_port: Option<SystemPortId>,
    pub switch_id: SwitchId,
    pub mac: MacAddress,
    pub mtu: u32,
    /// Addresses configured on the interface and their mask length
    pub addresses: BTreeMap<IpAddr, u8>,
    pub remote: Option<RemoteAttrs>,
    arp_table: Arc<ArpTable>,
    ndp_table: Arc<NdpTable>,
    flag: PublishFlag,
}

impl Interface {
    pub const DEFAULT_MTU: u32 = 9000;

    #[must_use]
    pub fn new(id: InterfaceId, router_id: RouterId, name: &str, mac: MacAddress) -> Self {
        Self {
            id,
            router_id,
            name: name.to_owned(),
            intf_type: InterfaceType::default(),
            vlan: None,
            system_port: None,
            switch_id: SwitchId::default(),
            mac,
            mtu: Self::DEFAULT_MTU,
            addresses: BTreeMap::new(),
            remote: None,
            arp_table: Arc::default(),
            ndp_table: Arc::default(),
            flag: PublishFlag::new(),
        }
    }

    #[must_use]
    pub fn with_address(mut self, addr: IpAddr, len: u8) -> Self {
        self.addresses.insert(addr, len);
        self
    }

    /// Tell if `addr` is one of the addresses of this interface
    #[must_use]
    pub fn has_address(&self, addr: &IpAddr) -> bool {
        self.addresses.contains_key(addr)
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.remote
            .is_some_and(|r| r.liveness == LivenessStatus::Stale)
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
    pub fn set_arp_table(&mut self, table: ArpTable) {
        self.flag.assert_mutable(Self::KIND);
        self.arp_table = Arc::new(table);
    }
    pub fn set_ndp_table(&mut self, table: NdpTable) {
        self.flag.assert_mutable(Self::KIND);
        self.ndp_table = Arc::new(table);
    }
}

impl Publishable for Interface {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
    fn publish(&self) {
        self.arp_table.publish();
        self.ndp_table.publish();
        self.flag.publish();
    }
}

impl Node for Interface {
    type Key = InterfaceId;
    const KIND: &'static str = "interface";

    fn key(&self) -> InterfaceId {
        self.id
    }
}

pub type InterfaceMap = NodeMap<Interface>;
