// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Prefix-keyed map with exact and longest-prefix-match lookups, backed by [`prefix_trie`].

use crate::prefix::{IpAddress, RoutePrefix};
use prefix_trie::PrefixMap;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PrefixKey<A: IpAddress>(RoutePrefix<A>);

impl<A: IpAddress> prefix_trie::Prefix for PrefixKey<A> {
    type R = A::Bits;

    fn repr(&self) -> Self::R {
        self.0.network().to_bits()
    }

    fn prefix_len(&self) -> u8 {
        self.0.len()
    }

    fn from_repr_len(repr: Self::R, len: u8) -> Self {
        // the trie only hands back lengths it was given, clamp anyway
        let len = len.min(A::MAX_LEN);
        match RoutePrefix::masked(A::from_bits(repr), len) {
            Ok(p) => PrefixKey(p),
            Err(_) => PrefixKey(RoutePrefix::root()),
        }
    }
}

/// Map from prefixes of one address family to values.
/// IPv4 and IPv6 maps are distinct types and never share a prefix-length space.
#[derive(Clone)]
pub struct NetworkToRouteMap<A: IpAddress, V>(PrefixMap<PrefixKey<A>, V>);

impl<A: IpAddress, V> Default for NetworkToRouteMap<A, V> {
    fn default() -> Self {
        Self(PrefixMap::new())
    }
}

impl<A: IpAddress, V> NetworkToRouteMap<A, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// Insert a value, returning the previous one for the same prefix
    pub fn insert(&mut self, prefix: RoutePrefix<A>, value: V) -> Option<V> {
        self.0.insert(PrefixKey(prefix), value)
    }

    pub fn remove(&mut self, prefix: &RoutePrefix<A>) -> Option<V> {
        self.0.remove(&PrefixKey(*prefix))
    }

    /// Exact match, no LPM
    #[must_use]
    pub fn get(&self, prefix: &RoutePrefix<A>) -> Option<&V> {
        self.0.get(&PrefixKey(*prefix))
    }

    /// Exact match, no LPM
    pub fn get_mut(&mut self, prefix: &RoutePrefix<A>) -> Option<&mut V> {
        self.0.get_mut(&PrefixKey(*prefix))
    }

    #[must_use]
    pub fn contains(&self, prefix: &RoutePrefix<A>) -> bool {
        self.get(prefix).is_some()
    }

    /// Longest prefix match of an address
    #[must_use]
    pub fn longest_match(&self, addr: A) -> Option<(&RoutePrefix<A>, &V)> {
        self.0
            .get_lpm(&PrefixKey(RoutePrefix::host(addr)))
            .map(|(k, v)| (&k.0, v))
    }

    /// Longest prefix match restricted to entries accepted by `filter`
    pub fn longest_match_by<F>(&self, addr: A, mut filter: F) -> Option<(&RoutePrefix<A>, &V)>
    where
        F: FnMut(&V) -> bool,
    {
        self.0
            .iter()
            .filter(|(k, v)| k.0.contains(&addr) && filter(v))
            .max_by_key(|(k, _)| k.0.len())
            .map(|(k, v)| (&k.0, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoutePrefix<A>, &V)> {
        self.0.iter().map(|(k, v)| (&k.0, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&RoutePrefix<A>, &mut V)> {
        self.0.iter_mut().map(|(k, v)| (&k.0, v))
    }

    pub fn prefixes(&self) -> impl Iterator<Item = RoutePrefix<A>> + '_ {
        self.0.iter().map(|(k, _)| k.0)
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RoutePrefix<A>, &V) -> bool,
    {
        let doomed: Vec<RoutePrefix<A>> = self
            .iter()
            .filter(|(p, v)| !keep(p, v))
            .map(|(p, _)| *p)
            .collect();
        for prefix in doomed {
            self.0.remove(&PrefixKey(prefix));
        }
    }
}

impl<A: IpAddress, V: Debug> Debug for NetworkToRouteMap<A, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<A: IpAddress, V: PartialEq> PartialEq for NetworkToRouteMap<A, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(p, v)| other.get(p) == Some(v))
    }
}

impl<A: IpAddress, V> FromIterator<(RoutePrefix<A>, V)> for NetworkToRouteMap<A, V> {
    fn from_iter<I: IntoIterator<Item = (RoutePrefix<A>, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (p, v) in iter {
            map.insert(p, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn p4(s: &str) -> RoutePrefix<Ipv4Addr> {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_and_lpm() {
        let mut map = NetworkToRouteMap::new();
        map.insert(p4("0.0.0.0/0"), "default");
        map.insert(p4("10.0.0.0/8"), "ten");
        map.insert(p4("10.1.0.0/16"), "ten-one");
        assert_eq!(map.len(), 3);

        assert_eq!(map.get(&p4("10.0.0.0/8")), Some(&"ten"));
        assert_eq!(map.get(&p4("10.0.0.0/9")), None);

        let (p, v) = map.longest_match(Ipv4Addr::new(10, 1, 2, 3)).unwrap();
        assert_eq!((*p, *v), (p4("10.1.0.0/16"), "ten-one"));
        let (p, v) = map.longest_match(Ipv4Addr::new(10, 2, 2, 3)).unwrap();
        assert_eq!((*p, *v), (p4("10.0.0.0/8"), "ten"));
        let (_, v) = map.longest_match(Ipv4Addr::new(192, 168, 0, 1)).unwrap();
        assert_eq!(*v, "default");

        assert_eq!(map.remove(&p4("0.0.0.0/0")), Some("default"));
        assert!(map.longest_match(Ipv4Addr::new(192, 168, 0, 1)).is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = NetworkToRouteMap::new();
        assert_eq!(map.insert(p4("10.0.0.0/24"), 1), None);
        assert_eq!(map.insert(p4("10.0.0.0/24"), 2), Some(1));
        assert_eq!(map.len(), 1);
        *map.get_mut(&p4("10.0.0.0/24")).unwrap() += 1;
        assert_eq!(map.get(&p4("10.0.0.0/24")), Some(&3));
    }

    #[test]
    fn test_lpm_by_filter() {
        let map: NetworkToRouteMap<Ipv4Addr, bool> =
            [(p4("10.0.0.0/8"), true), (p4("10.1.0.0/16"), false)]
                .into_iter()
                .collect();
        let (p, _) = map
            .longest_match_by(Ipv4Addr::new(10, 1, 1, 1), |usable| *usable)
            .unwrap();
        assert_eq!(*p, p4("10.0.0.0/8"));
    }

    #[test]
    fn test_retain_and_eq() {
        let mut map: NetworkToRouteMap<Ipv6Addr, u32> = [
            ("2001:db8::/32".parse().unwrap(), 1),
            ("2001:db8:1::/48".parse().unwrap(), 2),
            ("fe80::/64".parse().unwrap(), 3),
        ]
        .into_iter()
        .collect();
        map.retain(|p, _| !p.network().is_unicast_link_local());
        assert_eq!(map.len(), 2);
        let other: NetworkToRouteMap<Ipv6Addr, u32> = [
            ("2001:db8:1::/48".parse().unwrap(), 2),
            ("2001:db8::/32".parse().unwrap(), 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(map, other);
    }

    #[test]
    fn test_lpm_agrees_with_linear_scan() {
        bolero::check!()
            .with_type::<(Vec<(u32, u8)>, u32)>()
            .for_each(|(entries, probe)| {
                let map: NetworkToRouteMap<Ipv4Addr, usize> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, (a, l))| (RoutePrefix::masked(Ipv4Addr::from(*a), l % 33).unwrap(), i))
                    .collect();
                let addr = Ipv4Addr::from(*probe);
                let expected = map
                    .iter()
                    .filter(|(p, _)| p.contains(&addr))
                    .max_by_key(|(p, _)| p.len())
                    .map(|(p, _)| *p);
                assert_eq!(map.longest_match(addr).map(|(p, _)| *p), expected);
            });
    }
}
