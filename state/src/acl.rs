// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Access control entries

use crate::node::{Node, NodeMap, PublishFlag, Publishable};
use lpm::AnyPrefix;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    #[default]
    Permit,
    Deny,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Acl {
    pub name: String,
    pub priority: u32,
    pub src: Option<AnyPrefix>,
    pub dst: Option<AnyPrefix>,
    pub proto: Option<u8>,
    pub action: AclAction,
    flag: PublishFlag,
}

impl Acl {
    #[must_use]
    pub fn new(name: &str, priority: u32, action: AclAction) -> Self {
        Self {
            name: name.to_owned(),
            priority,
            src: None,
            dst: None,
            proto: None,
            action,
            flag: PublishFlag::new(),
        }
    }
}

impl Publishable for Acl {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
}

impl Node for Acl {
    type Key = String;
    const KIND: &'static str = "acl";

    fn key(&self) -> String {
        self.name.clone()
    }
}

pub type AclMap = NodeMap<Acl>;
