// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch-wide settings

use crate::dsf_node::AsicType;
use crate::ids::SwitchId;
use crate::node::{PublishFlag, Publishable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    Npu,
    Voq,
    Fabric,
}

/// A switching ASIC owned by this node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchInfo {
    pub switch_type: SwitchType,
    pub asic: AsicType,
    pub switch_index: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwitchSettings {
    pub hostname: String,
    pub switch_ids: BTreeMap<SwitchId, SwitchInfo>,
    flag: PublishFlag,
}

impl SwitchSettings {
    #[must_use]
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_switch(mut self, id: SwitchId, info: SwitchInfo) -> Self {
        self.switch_ids.insert(id, info);
        self
    }

    #[must_use]
    pub fn is_local_switch(&self, id: SwitchId) -> bool {
        self.switch_ids.contains_key(&id)
    }

    pub fn switch_ids_of_type(&self, switch_type: SwitchType) -> impl Iterator<Item = SwitchId> + '_ {
        self.switch_ids
            .iter()
            .filter(move |(_, info)| info.switch_type == switch_type)
            .map(|(id, _)| *id)
    }

    #[must_use]
    pub fn has_voq_switches(&self) -> bool {
        self.switch_ids_of_type(SwitchType::Voq).next().is_some()
    }

    #[must_use]
    pub fn has_fabric_switches(&self) -> bool {
        self.switch_ids_of_type(SwitchType::Fabric).next().is_some()
    }
}

impl Publishable for SwitchSettings {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}
