// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RIB routes: the entries of every client for one prefix, and the forwarding
//! information resolved from the best of them.

use crate::client::ClientId;
use crate::errors::RouteError;
use crate::nexthop::{RouteForwardAction, RouteNextHopEntry};
use bitflags::bitflags;
use lpm::{IpAddress, RoutePrefix};
use std::collections::BTreeMap;

/// Entries of all the clients that announced a prefix
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteNextHopsMulti {
    entries: BTreeMap<ClientId, RouteNextHopEntry>,
}

impl RouteNextHopsMulti {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry of a client, replacing its previous one
    pub fn update(&mut self, client: ClientId, entry: RouteNextHopEntry) {
        self.entries.insert(client, entry);
    }

    pub fn delete(&mut self, client: ClientId) -> Option<RouteNextHopEntry> {
        self.entries.remove(&client)
    }

    #[must_use]
    pub fn get(&self, client: ClientId) -> Option<&RouteNextHopEntry> {
        self.entries.get(&client)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &RouteNextHopEntry)> {
        self.entries.iter()
    }

    /// The preferred entry: lowest admin distance, lowest client id on ties.
    ///
    /// # Errors
    /// Fails if no client has an entry.
    pub fn best_entry(&self) -> Result<(ClientId, &RouteNextHopEntry), RouteError> {
        self.entries
            .iter()
            .min_by_key(|(client, entry)| (entry.admin_distance(), **client))
            .map(|(client, entry)| (*client, entry))
            .ok_or_else(|| RouteError::NoEntry("no client entry".to_owned()))
    }
}

bitflags! {
    /// Resolution status of a route
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RouteFlags: u8 {
        const RESOLVED = 0b0001;
        const UNRESOLVABLE = 0b0010;
        const CONNECTED = 0b0100;
        const PROCESSING = 0b1000;
    }
}

/// A prefix in the RIB
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route<A: IpAddress> {
    prefix: RoutePrefix<A>,
    multi: RouteNextHopsMulti,
    fwd: Option<RouteNextHopEntry>,
    flags: RouteFlags,
}

impl<A: IpAddress> Route<A> {
    #[must_use]
    pub fn new(prefix: RoutePrefix<A>, client: ClientId, entry: RouteNextHopEntry) -> Self {
        let mut multi = RouteNextHopsMulti::new();
        multi.update(client, entry);
        Self {
            prefix,
            multi,
            fwd: None,
            flags: RouteFlags::empty(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> RoutePrefix<A> {
        self.prefix
    }

    #[must_use]
    pub fn entries(&self) -> &RouteNextHopsMulti {
        &self.multi
    }

    /// True if `client` already announced exactly `entry`
    #[must_use]
    pub fn has(&self, client: ClientId, entry: &RouteNextHopEntry) -> bool {
        self.multi.get(client) == Some(entry)
    }

    pub fn update(&mut self, client: ClientId, entry: RouteNextHopEntry) {
        self.multi.update(client, entry);
    }

    pub fn del_entry_for_client(&mut self, client: ClientId) -> Option<RouteNextHopEntry> {
        self.multi.delete(client)
    }

    #[must_use]
    pub fn has_no_entry(&self) -> bool {
        self.multi.is_empty()
    }

    /// # Errors
    /// Fails if no client has an entry for this route.
    pub fn best_entry(&self) -> Result<(ClientId, &RouteNextHopEntry), RouteError> {
        self.multi
            .best_entry()
            .map_err(|_| RouteError::NoEntry(self.prefix.to_string()))
    }

    /// Forwarding information, once resolved
    #[must_use]
    pub fn fwd(&self) -> Option<&RouteNextHopEntry> {
        self.fwd.as_ref()
    }

    #[must_use]
    pub fn flags(&self) -> RouteFlags {
        self.flags
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.flags.contains(RouteFlags::RESOLVED)
    }
    #[must_use]
    pub fn is_unresolvable(&self) -> bool {
        self.flags.contains(RouteFlags::UNRESOLVABLE)
    }
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.flags.contains(RouteFlags::CONNECTED)
    }
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.flags.contains(RouteFlags::PROCESSING)
    }
    /// A route being resolved is not resolved again: a resolution loop ends there.
    #[must_use]
    pub fn need_resolve(&self) -> bool {
        !self.flags.intersects(
            RouteFlags::RESOLVED | RouteFlags::UNRESOLVABLE | RouteFlags::PROCESSING,
        )
    }

    #[must_use]
    pub fn is_drop(&self) -> bool {
        self.is_resolved()
            && self
                .fwd
                .as_ref()
                .is_some_and(|f| f.action() == RouteForwardAction::Drop)
    }

    #[must_use]
    pub fn is_to_cpu(&self) -> bool {
        self.is_resolved()
            && self
                .fwd
                .as_ref()
                .is_some_and(|f| f.action() == RouteForwardAction::ToCpu)
    }

    pub fn set_processing(&mut self) {
        self.flags.insert(RouteFlags::PROCESSING);
    }

    pub fn set_resolved(&mut self, fwd: RouteNextHopEntry) {
        self.fwd = Some(fwd);
        self.flags.remove(RouteFlags::PROCESSING | RouteFlags::UNRESOLVABLE);
        self.flags.insert(RouteFlags::RESOLVED);
    }

    pub fn set_unresolvable(&mut self) {
        self.fwd = None;
        self.flags.remove(RouteFlags::PROCESSING | RouteFlags::RESOLVED);
        self.flags.insert(RouteFlags::UNRESOLVABLE);
    }

    pub fn set_connected(&mut self) {
        self.flags.insert(RouteFlags::CONNECTED);
    }

    /// Forget the result of the last resolution
    pub fn clear_forward(&mut self) {
        self.fwd = None;
        self.flags = RouteFlags::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AdminDistance;
    use crate::nexthop::{NextHop, RouteNextHopSet};
    use bolero::check;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn nh_entry(ad: AdminDistance) -> RouteNextHopEntry {
        RouteNextHopEntry::from_nexthops(
            RouteNextHopSet::from([NextHop::unresolved("1.1.1.1".parse().unwrap(), 0)]),
            ad,
        )
        .unwrap()
    }

    #[test]
    fn test_best_entry_by_admin_distance() {
        let mut multi = RouteNextHopsMulti::new();
        multi.update(ClientId(20), RouteNextHopEntry::drop(AdminDistance::EBGP));
        multi.update(ClientId(1), nh_entry(AdminDistance::STATIC_ROUTE));
        multi.update(ClientId(30), RouteNextHopEntry::to_cpu(AdminDistance::MAX));
        assert_eq!(multi.best_entry().unwrap().0, ClientId(1));

        multi.update(
            ClientId(10),
            RouteNextHopEntry::drop(AdminDistance::DIRECTLY_CONNECTED),
        );
        assert_eq!(multi.best_entry().unwrap().0, ClientId(10));

        multi.delete(ClientId(10));
        assert_eq!(multi.best_entry().unwrap().0, ClientId(1));
    }

    #[test]
    fn test_best_entry_tie_lowest_client() {
        let mut multi = RouteNextHopsMulti::new();
        multi.update(ClientId(9), nh_entry(AdminDistance::EBGP));
        multi.update(ClientId(4), RouteNextHopEntry::drop(AdminDistance::EBGP));
        let (client, entry) = multi.best_entry().unwrap();
        assert_eq!(client, ClientId(4));
        assert!(entry.is_drop());
    }

    #[test]
    fn test_best_entry_empty() {
        assert!(RouteNextHopsMulti::new().best_entry().is_err());
    }

    // the winner never depends on the order in which clients announced
    #[test]
    fn test_best_entry_deterministic() {
        check!()
            .with_type::<Vec<(u32, u8)>>()
            .for_each(|announcements: &Vec<(u32, u8)>| {
                if announcements.is_empty() {
                    return;
                }
                let mut forward = RouteNextHopsMulti::new();
                let mut backward = RouteNextHopsMulti::new();
                for (c, ad) in announcements {
                    forward.update(ClientId(*c), RouteNextHopEntry::drop(AdminDistance(*ad)));
                }
                for (c, ad) in announcements.iter().rev() {
                    // keep the last announcement of each client, as `forward` does
                    if backward.get(ClientId(*c)).is_none() {
                        backward.update(ClientId(*c), RouteNextHopEntry::drop(AdminDistance(*ad)));
                    }
                }
                assert_eq!(forward, backward);
                let (client, entry) = forward.best_entry().unwrap();
                for (c, e) in forward.iter() {
                    assert!((entry.admin_distance(), client) <= (e.admin_distance(), *c));
                }
            });
    }

    #[test]
    fn test_route_flags() {
        let prefix = RoutePrefix::<Ipv4Addr>::masked("10.0.0.0".parse().unwrap(), 24).unwrap();
        let mut route = Route::new(prefix, ClientId::BGPD, nh_entry(AdminDistance::EBGP));
        assert!(route.need_resolve());
        route.set_processing();
        assert!(route.is_processing() && !route.need_resolve());
        route.set_resolved(RouteNextHopEntry::drop(AdminDistance::MAX));
        assert!(route.is_resolved() && route.is_drop() && !route.is_processing());
        assert!(!route.need_resolve());
        route.clear_forward();
        assert!(route.need_resolve() && route.fwd().is_none());
        route.set_unresolvable();
        assert!(!route.need_resolve() && !route.is_resolved());
        assert!(route.has(ClientId::BGPD, &nh_entry(AdminDistance::EBGP)));
        assert!(route.del_entry_for_client(ClientId::BGPD).is_some());
        assert!(route.has_no_entry());
    }
}
