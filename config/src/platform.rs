// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fabric port to virtual device mappings of a platform

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use state::AsicType;
use std::collections::BTreeSet;
use tracing::debug;

/// A fabric port of a platform and the virtual device it belongs to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FabricPortConfig {
    pub name: String,
    pub id: u32,
    pub virtual_device: u32,
}

/// The fabric port mapping of all platforms built around one ASIC
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FabricPlatformConfig {
    pub asic: AsicType,
    #[serde(default)]
    pub ports: Vec<FabricPortConfig>,
}

impl FabricPlatformConfig {
    pub fn validate(&self) -> ConfigResult {
        debug!("Validating fabric platform mapping of {}..", self.asic);
        let mut names = BTreeSet::new();
        for port in &self.ports {
            if !names.insert(port.name.as_str()) {
                return Err(ConfigError::DuplicateName(
                    "platform fabric port",
                    port.name.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Look up a fabric port by name
    #[must_use]
    pub fn port(&self, name: &str) -> Option<&FabricPortConfig> {
        self.ports.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_and_lookup() {
        let mut platform = FabricPlatformConfig {
            asic: AsicType::Ramon,
            ports: vec![
                FabricPortConfig {
                    name: "fab1/1/1".to_owned(),
                    id: 1,
                    virtual_device: 0,
                },
                FabricPortConfig {
                    name: "fab1/1/2".to_owned(),
                    id: 2,
                    virtual_device: 1,
                },
            ],
        };
        assert_eq!(platform.validate(), Ok(()));
        assert_eq!(platform.port("fab1/1/2").map(|p| p.virtual_device), Some(1));
        assert!(platform.port("fab9/9/9").is_none());

        platform.ports[1].name = "fab1/1/1".to_owned();
        assert_eq!(
            platform.validate(),
            Err(ConfigError::DuplicateName(
                "platform fabric port",
                "fab1/1/1".to_owned()
            ))
        );
    }
}
