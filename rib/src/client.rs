// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Routing clients and admin distances

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identity of a source of routes. Lower ids win admin distance ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u32);

impl ClientId {
    pub const BGPD: ClientId = ClientId(0);
    pub const STATIC_ROUTE: ClientId = ClientId(1);
    pub const INTERFACE_ROUTE: ClientId = ClientId(2);
    pub const LINKLOCAL_ROUTE: ClientId = ClientId(3);
    pub const REMOTE_INTERFACE_ROUTE: ClientId = ClientId(4);
    pub const STATIC_INTERNAL: ClientId = ClientId(700);
    pub const OPENR: ClientId = ClientId(786);

    /// Routes of these clients are resolved on an interface by construction
    #[must_use]
    pub fn is_interface_client(&self) -> bool {
        *self == Self::INTERFACE_ROUTE || *self == Self::REMOTE_INTERFACE_ROUTE
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::BGPD => write!(f, "bgpd"),
            Self::STATIC_ROUTE => write!(f, "static"),
            Self::INTERFACE_ROUTE => write!(f, "interface"),
            Self::LINKLOCAL_ROUTE => write!(f, "link-local"),
            Self::REMOTE_INTERFACE_ROUTE => write!(f, "remote-interface"),
            Self::STATIC_INTERNAL => write!(f, "static-internal"),
            Self::OPENR => write!(f, "openr"),
            ClientId(other) => write!(f, "client-{other}"),
        }
    }
}

/// Preference of a route source. Lower is preferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminDistance(pub u8);

impl AdminDistance {
    pub const DIRECTLY_CONNECTED: AdminDistance = AdminDistance(0);
    pub const STATIC_ROUTE: AdminDistance = AdminDistance(1);
    pub const EBGP: AdminDistance = AdminDistance(20);
    pub const IBGP: AdminDistance = AdminDistance(200);
    pub const MAX: AdminDistance = AdminDistance(255);
}

impl Display for AdminDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
