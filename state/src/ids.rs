// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Typed identifiers of the state entities

use serde::{Deserialize, Serialize};
use std::fmt::Display;

macro_rules! state_id {
    ($(#[$meta:meta])* $name:ident, $repr:ty) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl $name {
            #[must_use]
            pub const fn new(raw: $repr) -> Self {
                Self(raw)
            }
            #[must_use]
            pub const fn as_raw(&self) -> $repr {
                self.0
            }
        }
        impl From<$repr> for $name {
            fn from(raw: $repr) -> Self {
                Self(raw)
            }
        }
        impl From<$name> for $repr {
            fn from(id: $name) -> Self {
                id.0
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

state_id!(
    /// Front panel or fabric port
    PortId,
    u32
);
state_id!(VlanId, u16);
state_id!(
    /// L3 interface. On VOQ switches this matches the id of the backing system port.
    InterfaceId,
    u32
);
state_id!(
    /// Identity of a switching ASIC in the fabric. A multi-core device owns several consecutive ids.
    SwitchId,
    u64
);
state_id!(SystemPortId, u64);
state_id!(
    /// Virtual routing domain
    RouterId,
    u32
);

impl RouterId {
    pub const DEFAULT: RouterId = RouterId(0);
}
