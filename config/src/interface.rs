// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of L3 interfaces

use crate::{ConfigError, ConfigResult};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use state::{InterfaceId, InterfaceType, RouterId, SystemPortId, VlanId};
use std::net::IpAddr;
use std::str::FromStr;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    pub id: InterfaceId,
    #[serde(default)]
    pub vrf: RouterId,
    pub name: String,
    #[serde(default, rename = "type")]
    pub intf_type: InterfaceType,
    #[serde(default)]
    pub vlan: Option<VlanId>,
    #[serde(default)]
    pub system_port: Option<SystemPortId>,
    /// MAC address, as `xx:xx:xx:xx:xx:xx`
    pub mac: String,
    #[serde(default)]
    pub mtu: Option<u32>,
    /// Addresses, as `address/length`
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Parse an interface address of the form `address/length`. The address is kept as is: it is
/// the address of the interface, not the network.
pub fn parse_address(input: &str) -> Result<(IpAddr, u8), ConfigError> {
    let (addr, len) = input
        .split_once('/')
        .ok_or_else(|| ConfigError::InvalidFormat(input.to_owned()))?;
    let addr =
        IpAddr::from_str(addr.trim()).map_err(|_| ConfigError::InvalidIpAddress(input.to_owned()))?;
    let len: u8 = len
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidMaskLength(input.to_owned()))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if len > max {
        return Err(ConfigError::InvalidMaskLength(input.to_owned()));
    }
    Ok((addr, len))
}

impl InterfaceConfig {
    pub const MIN_MTU: u32 = 68;
    pub const MAX_MTU: u32 = 65535;

    #[must_use]
    pub fn new(id: InterfaceId, name: &str, mac: &str) -> Self {
        Self {
            id,
            vrf: RouterId::DEFAULT,
            name: name.to_owned(),
            intf_type: InterfaceType::default(),
            vlan: None,
            system_port: None,
            mac: mac.to_owned(),
            mtu: None,
            addresses: vec![],
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: &str) -> Self {
        self.addresses.push(address.to_owned());
        self
    }

    pub fn mac(&self) -> Result<MacAddress, ConfigError> {
        MacAddress::from_str(&self.mac).map_err(|_| ConfigError::InvalidMac(self.mac.clone()))
    }

    pub fn addresses(&self) -> Result<Vec<(IpAddr, u8)>, ConfigError> {
        self.addresses.iter().map(|a| parse_address(a)).collect()
    }

    pub fn validate(&self) -> ConfigResult {
        debug!("Validating interface {} ({})..", self.name, self.id);
        if self.name.is_empty() {
            return Err(ConfigError::MissingParameter("interface name"));
        }
        if let Some(mtu) = self.mtu
            && !(Self::MIN_MTU..=Self::MAX_MTU).contains(&mtu)
        {
            return Err(ConfigError::BadMtu(mtu));
        }
        self.mac()?;
        self.addresses()?;
        match self.intf_type {
            InterfaceType::Vlan if self.vlan.is_none() => {
                Err(ConfigError::MissingParameter("vlan of vlan interface"))
            }
            InterfaceType::SystemPort if self.system_port.is_none() => Err(
                ConfigError::MissingParameter("system port of system port interface"),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address("10.0.0.1/24"),
            Ok((IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 24))
        );
        assert_eq!(
            parse_address("2001:db8::1/64").map(|(_, len)| len),
            Ok(64)
        );
        assert_eq!(
            parse_address("10.0.0.1"),
            Err(ConfigError::InvalidFormat("10.0.0.1".to_owned()))
        );
        assert_eq!(
            parse_address("10.0.0.300/24"),
            Err(ConfigError::InvalidIpAddress("10.0.0.300/24".to_owned()))
        );
        assert_eq!(
            parse_address("10.0.0.1/33"),
            Err(ConfigError::InvalidMaskLength("10.0.0.1/33".to_owned()))
        );
    }

    #[test]
    fn test_validate() {
        let mut intf = InterfaceConfig::new(InterfaceId(10), "vlan10", "02:00:00:00:00:01")
            .with_address("10.0.0.1/24");
        assert_eq!(
            intf.validate(),
            Err(ConfigError::MissingParameter("vlan of vlan interface"))
        );
        intf.vlan = Some(VlanId(10));
        assert_eq!(intf.validate(), Ok(()));

        intf.mtu = Some(20);
        assert_eq!(intf.validate(), Err(ConfigError::BadMtu(20)));
        intf.mtu = None;

        intf.mac = "not-a-mac".to_owned();
        assert_eq!(
            intf.validate(),
            Err(ConfigError::InvalidMac("not-a-mac".to_owned()))
        );
    }
}
