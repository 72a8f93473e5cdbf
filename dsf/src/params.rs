// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tunables of the fabric state exchange

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DsfParams {
    /// Name this node is known by in the fabric
    pub local_node_name: String,
    /// Upper bound on the parallel sessions to one remote interface node
    pub sessions_per_node: usize,
    /// Port of the remote state service
    pub service_port: u16,
    /// Seconds the entries of a vanished remote node are kept before being marked stale
    pub gr_hold_time: u32,
}

impl DsfParams {
    pub const DEFAULT_SERVICE_PORT: u16 = 5908;
}

impl Default for DsfParams {
    fn default() -> Self {
        Self {
            local_node_name: "localhost".to_owned(),
            sessions_per_node: 4,
            service_port: Self::DEFAULT_SERVICE_PORT,
            gr_hold_time: 120,
        }
    }
}
