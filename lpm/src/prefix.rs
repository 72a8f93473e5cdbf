// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Route prefixes, generic over the address family

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use num_traits::{CheckedShr, PrimInt, Unsigned, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PrefixError {
    #[error("Invalid prefix: {0}")]
    Invalid(String),
    #[error("Invalid prefix length {0}")]
    InvalidLength(u8),
    #[error("Address family mismatch: {0}")]
    FamilyMismatch(String),
}

/// An IP address type that prefixes and route tables can be built on.
/// Implemented for [`Ipv4Addr`] and [`Ipv6Addr`] only.
pub trait IpAddress:
    Copy
    + Debug
    + Display
    + Eq
    + Ord
    + Hash
    + FromStr
    + Send
    + Sync
    + Into<IpAddr>
    + 'static
{
    type Bits: Unsigned + PrimInt + Zero + CheckedShr + Debug;
    const MAX_LEN: u8;
    const FAMILY: &'static str;

    fn to_bits(self) -> Self::Bits;
    fn from_bits(bits: Self::Bits) -> Self;
    fn from_ip(addr: IpAddr) -> Option<Self>;
    fn is_link_local(&self) -> bool;
}

impl IpAddress for Ipv4Addr {
    type Bits = u32;
    const MAX_LEN: u8 = 32;
    const FAMILY: &'static str = "ipv4";

    fn to_bits(self) -> u32 {
        u32::from(self)
    }
    fn from_bits(bits: u32) -> Self {
        Ipv4Addr::from(bits)
    }
    fn from_ip(addr: IpAddr) -> Option<Self> {
        match addr {
            IpAddr::V4(a) => Some(a),
            IpAddr::V6(_) => None,
        }
    }
    fn is_link_local(&self) -> bool {
        Ipv4Addr::is_link_local(self)
    }
}

impl IpAddress for Ipv6Addr {
    type Bits = u128;
    const MAX_LEN: u8 = 128;
    const FAMILY: &'static str = "ipv6";

    fn to_bits(self) -> u128 {
        u128::from(self)
    }
    fn from_bits(bits: u128) -> Self {
        Ipv6Addr::from(bits)
    }
    fn from_ip(addr: IpAddr) -> Option<Self> {
        match addr {
            IpAddr::V6(a) => Some(a),
            IpAddr::V4(_) => None,
        }
    }
    fn is_link_local(&self) -> bool {
        Ipv6Addr::is_unicast_link_local(self)
    }
}

/// A route key: a network address and a mask length, host bits always cleared.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoutePrefix<A: IpAddress> {
    network: A,
    len: u8,
}

impl<A: IpAddress> RoutePrefix<A> {
    fn mask(len: u8) -> A::Bits {
        if len == 0 {
            A::Bits::zero()
        } else {
            !A::Bits::zero() << usize::from(A::MAX_LEN - len)
        }
    }

    /// Build a prefix. Fails if the length exceeds the family width or if host bits are set.
    ///
    /// # Errors
    /// Returns [`PrefixError`] on an invalid length or a non-canonical network address.
    pub fn new(network: A, len: u8) -> Result<Self, PrefixError> {
        if len > A::MAX_LEN {
            return Err(PrefixError::InvalidLength(len));
        }
        if network.to_bits() & !Self::mask(len) != A::Bits::zero() {
            return Err(PrefixError::Invalid(format!(
                "{network}/{len} has host bits set"
            )));
        }
        Ok(Self { network, len })
    }

    /// Build a prefix from any address in it, clearing the host bits.
    ///
    /// # Errors
    /// Returns [`PrefixError::InvalidLength`] if the length exceeds the family width.
    pub fn masked(addr: A, len: u8) -> Result<Self, PrefixError> {
        if len > A::MAX_LEN {
            return Err(PrefixError::InvalidLength(len));
        }
        let network = A::from_bits(addr.to_bits() & Self::mask(len));
        Ok(Self { network, len })
    }

    /// The host prefix of an address
    #[must_use]
    pub fn host(addr: A) -> Self {
        Self {
            network: addr,
            len: A::MAX_LEN,
        }
    }

    /// The default route prefix
    #[must_use]
    pub fn root() -> Self {
        Self {
            network: A::from_bits(A::Bits::zero()),
            len: 0,
        }
    }

    #[must_use]
    pub fn network(&self) -> A {
        self.network
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.len
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.len == A::MAX_LEN
    }

    #[must_use]
    pub fn contains(&self, addr: &A) -> bool {
        addr.to_bits() & Self::mask(self.len) == self.network.to_bits()
    }

    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.len <= other.len && self.contains(&other.network)
    }
}

impl<A: IpAddress> Display for RoutePrefix<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}

impl<A: IpAddress> Debug for RoutePrefix<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl<A: IpAddress> FromStr for RoutePrefix<A> {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net = IpNet::from_str(s).map_err(|e| PrefixError::Invalid(format!("{s}: {e}")))?;
        Self::try_from(net)
    }
}

impl<A: IpAddress> TryFrom<IpNet> for RoutePrefix<A> {
    type Error = PrefixError;

    fn try_from(net: IpNet) -> Result<Self, Self::Error> {
        let addr = A::from_ip(net.addr())
            .ok_or_else(|| PrefixError::FamilyMismatch(format!("{net} is not {}", A::FAMILY)))?;
        Self::new(addr, net.prefix_len())
    }
}

impl From<Ipv4Net> for RoutePrefix<Ipv4Addr> {
    fn from(net: Ipv4Net) -> Self {
        let net = net.trunc();
        Self {
            network: net.network(),
            len: net.prefix_len(),
        }
    }
}

impl From<Ipv6Net> for RoutePrefix<Ipv6Addr> {
    fn from(net: Ipv6Net) -> Self {
        let net = net.trunc();
        Self {
            network: net.network(),
            len: net.prefix_len(),
        }
    }
}

impl<A: IpAddress> TryFrom<(&str, u8)> for RoutePrefix<A> {
    type Error = PrefixError;

    fn try_from((addr, len): (&str, u8)) -> Result<Self, Self::Error> {
        let addr = A::from_str(addr).map_err(|_| PrefixError::Invalid(addr.to_string()))?;
        Self::new(addr, len)
    }
}

impl<A: IpAddress> Serialize for RoutePrefix<A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, A: IpAddress> Deserialize<'de> for RoutePrefix<A> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A prefix of either family, for places that carry both (configuration, logs)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnyPrefix {
    V4(RoutePrefix<Ipv4Addr>),
    V6(RoutePrefix<Ipv6Addr>),
}

impl AnyPrefix {
    /// Build a prefix from an address of either family, clearing host bits.
    ///
    /// # Errors
    /// Returns [`PrefixError::InvalidLength`] if the length exceeds the family width.
    pub fn masked(addr: IpAddr, len: u8) -> Result<Self, PrefixError> {
        match addr {
            IpAddr::V4(a) => Ok(Self::V4(RoutePrefix::masked(a, len)?)),
            IpAddr::V6(a) => Ok(Self::V6(RoutePrefix::masked(a, len)?)),
        }
    }

    #[must_use]
    pub fn network(&self) -> IpAddr {
        match self {
            Self::V4(p) => p.network().into(),
            Self::V6(p) => p.network().into(),
        }
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        match self {
            Self::V4(p) => p.len(),
            Self::V6(p) => p.len(),
        }
    }

    #[must_use]
    pub fn is_ipv4(&self) -> bool {
        matches!(self, Self::V4(_))
    }

    #[must_use]
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self, addr) {
            (Self::V4(p), IpAddr::V4(a)) => p.contains(a),
            (Self::V6(p), IpAddr::V6(a)) => p.contains(a),
            _ => false,
        }
    }

    #[cfg(any(test, feature = "testing"))]
    #[allow(clippy::missing_panics_doc)]
    pub fn expect_from<T>(val: T) -> Self
    where
        T: TryInto<AnyPrefix>,
        T::Error: Debug,
    {
        val.try_into().expect("Invalid prefix")
    }
}

impl From<RoutePrefix<Ipv4Addr>> for AnyPrefix {
    fn from(p: RoutePrefix<Ipv4Addr>) -> Self {
        Self::V4(p)
    }
}

impl From<RoutePrefix<Ipv6Addr>> for AnyPrefix {
    fn from(p: RoutePrefix<Ipv6Addr>) -> Self {
        Self::V6(p)
    }
}

impl Display for AnyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4(p) => write!(f, "{p}"),
            Self::V6(p) => write!(f, "{p}"),
        }
    }
}

impl Debug for AnyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for AnyPrefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match IpNet::from_str(s).map_err(|e| PrefixError::Invalid(format!("{s}: {e}")))? {
            IpNet::V4(n) => Ok(Self::V4(RoutePrefix::try_from(IpNet::V4(n))?)),
            IpNet::V6(n) => Ok(Self::V6(RoutePrefix::try_from(IpNet::V6(n))?)),
        }
    }
}

impl TryFrom<(&str, u8)> for AnyPrefix {
    type Error = PrefixError;

    fn try_from((addr, len): (&str, u8)) -> Result<Self, Self::Error> {
        match IpAddr::from_str(addr).map_err(|_| PrefixError::Invalid(addr.to_string()))? {
            IpAddr::V4(a) => Ok(Self::V4(RoutePrefix::new(a, len)?)),
            IpAddr::V6(a) => Ok(Self::V6(RoutePrefix::new(a, len)?)),
        }
    }
}

impl TryFrom<&str> for AnyPrefix {
    type Error = PrefixError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::from_str(s)
    }
}

impl Serialize for AnyPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AnyPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prefix_new_rejects_host_bits() {
        let ok = RoutePrefix::new(Ipv4Addr::new(10, 0, 0, 0), 24);
        assert!(ok.is_ok());
        let bad = RoutePrefix::new(Ipv4Addr::new(10, 0, 0, 1), 24);
        assert!(matches!(bad, Err(PrefixError::Invalid(_))));
        let bad = RoutePrefix::new(Ipv4Addr::new(10, 0, 0, 0), 33);
        assert_eq!(bad, Err(PrefixError::InvalidLength(33)));
    }

    #[test]
    fn test_prefix_masked() {
        let p = RoutePrefix::masked(Ipv4Addr::new(10, 1, 2, 3), 16).unwrap();
        assert_eq!(p.to_string(), "10.1.0.0/16");
        let p = RoutePrefix::masked("fe80::1:2".parse::<Ipv6Addr>().unwrap(), 64).unwrap();
        assert_eq!(p.to_string(), "fe80::/64");
        let p = RoutePrefix::masked(Ipv4Addr::new(1, 2, 3, 4), 0).unwrap();
        assert_eq!(p, RoutePrefix::root());
    }

    #[test]
    fn test_prefix_contains() {
        let p: RoutePrefix<Ipv4Addr> = "10.0.0.0/8".parse().unwrap();
        assert!(p.contains(&Ipv4Addr::new(10, 200, 1, 1)));
        assert!(!p.contains(&Ipv4Addr::new(11, 0, 0, 1)));
        assert!(RoutePrefix::<Ipv4Addr>::root().contains(&Ipv4Addr::new(11, 0, 0, 1)));
        let q: RoutePrefix<Ipv4Addr> = "10.1.0.0/16".parse().unwrap();
        assert!(p.covers(&q));
        assert!(!q.covers(&p));
    }

    #[test]
    fn test_prefix_family_mismatch() {
        let r = "2001:db8::/32".parse::<RoutePrefix<Ipv4Addr>>();
        assert!(matches!(r, Err(PrefixError::FamilyMismatch(_))));
    }

    #[test]
    fn test_any_prefix_try_from() {
        let p1 = AnyPrefix::expect_from(("1.2.3.0", 24));
        let p2 = AnyPrefix::expect_from("1.2.3.0/24");
        let p3: AnyPrefix = RoutePrefix::from(Ipv4Net::from_str("1.2.3.0/24").unwrap()).into();
        assert_eq!(p1, p2);
        assert_eq!(p1, p3);
        assert!(p1.is_ipv4());
        assert_eq!(p1.len(), 24);
        let p6 = AnyPrefix::expect_from("2001:db8::/32");
        assert!(!p6.is_ipv4());
        assert!(p6.contains(&"2001:db8::5".parse().unwrap()));
        assert!(!p6.contains(&"1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn test_prefix_serde() {
        let p = AnyPrefix::expect_from("10.0.0.0/24");
        let yaml = serde_yaml_ng::to_string(&p).unwrap();
        assert_eq!(yaml.trim(), "10.0.0.0/24");
        let back: AnyPrefix = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(back, p);
        let bad: Result<AnyPrefix, _> = serde_yaml_ng::from_str("10.0.0.1/24");
        assert!(bad.is_err());
    }

    #[test]
    fn test_prefix_contains_matches_mask() {
        bolero::check!()
            .with_type::<(u32, u8, u32)>()
            .cloned()
            .for_each(|(addr, len, probe)| {
                let len = len % 33;
                let p = RoutePrefix::masked(Ipv4Addr::from(addr), len).unwrap();
                assert!(p.contains(&Ipv4Addr::from(addr)));
                let shift = 32 - u32::from(len);
                let same = u64::from(addr) >> shift == u64::from(probe) >> shift;
                assert_eq!(p.contains(&Ipv4Addr::from(probe)), same);
            });
    }
}
