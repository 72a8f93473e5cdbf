// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Behavior toggles handed to the components that need them

use serde::{Deserialize, Serialize};

/// Where neighbor entries are kept
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborTableLocation {
    #[default]
    Vlan,
    Interface,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateContext {
    pub neighbor_tables: NeighborTableLocation,
}

impl StateContext {
    #[must_use]
    pub fn new(neighbor_tables: NeighborTableLocation) -> Self {
        Self { neighbor_tables }
    }

    #[must_use]
    pub fn intf_neighbor_tables(&self) -> bool {
        self.neighbor_tables == NeighborTableLocation::Interface
    }
}
