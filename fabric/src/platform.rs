// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fabric port names of the remote platforms.
//!
//! Cabling expectations name the remote port ("fab1/2/4") while the hardware reports port ids.
//! A [`PlatformMapping`] translates between the two for one ASIC type.

use crate::errors::FabricError;
use serde::{Deserialize, Serialize};
use state::{AsicType, PortId};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricPortInfo {
    pub port_id: PortId,
    pub virtual_device: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformMapping {
    by_name: BTreeMap<String, FabricPortInfo>,
    by_id: BTreeMap<PortId, String>,
}

impl PlatformMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_port(
        &mut self,
        name: &str,
        port_id: PortId,
        virtual_device: u32,
    ) -> Result<(), FabricError> {
        if self.by_name.contains_key(name) {
            return Err(FabricError::DuplicatePortName(name.to_owned()));
        }
        if self.by_id.contains_key(&port_id) {
            return Err(FabricError::DuplicatePortId(port_id));
        }
        self.by_name.insert(
            name.to_owned(),
            FabricPortInfo {
                port_id,
                virtual_device,
            },
        );
        self.by_id.insert(port_id, name.to_owned());
        Ok(())
    }

    /// Builder flavor of [`PlatformMapping::add_port`] for fixed tables. Duplicates replace.
    #[must_use]
    pub fn with_port(mut self, name: &str, port_id: u32, virtual_device: u32) -> Self {
        if let Some(old) = self.by_name.remove(name) {
            self.by_id.remove(&old.port_id);
        }
        self.by_id.insert(PortId(port_id), name.to_owned());
        self.by_name.insert(
            name.to_owned(),
            FabricPortInfo {
                port_id: PortId(port_id),
                virtual_device,
            },
        );
        self
    }

    #[must_use]
    pub fn port(&self, name: &str) -> Option<&FabricPortInfo> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn port_id(&self, name: &str) -> Option<PortId> {
        self.port(name).map(|p| p.port_id)
    }

    #[must_use]
    pub fn virtual_device(&self, name: &str) -> Option<u32> {
        self.port(name).map(|p| p.virtual_device)
    }

    #[must_use]
    pub fn port_name(&self, port_id: PortId) -> Option<&str> {
        self.by_id.get(&port_id).map(String::as_str)
    }

    /// Virtual device of a port given by id
    #[must_use]
    pub fn virtual_device_of(&self, port_id: PortId) -> Option<u32> {
        self.port_name(port_id).and_then(|n| self.virtual_device(n))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Platform mappings of all the ASIC types in the fabric
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformMappings(BTreeMap<AsicType, PlatformMapping>);

impl PlatformMappings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asic: AsicType, mapping: PlatformMapping) -> Option<PlatformMapping> {
        self.0.insert(asic, mapping)
    }

    #[must_use]
    pub fn with(mut self, asic: AsicType, mapping: PlatformMapping) -> Self {
        self.0.insert(asic, mapping);
        self
    }

    pub fn get(&self, asic: AsicType) -> Result<&PlatformMapping, FabricError> {
        self.0
            .get(&asic)
            .ok_or(FabricError::NoPlatformMapping(asic))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AsicType, &PlatformMapping)> {
        self.0.iter()
    }
}
