// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parameters of an agent instance

use derive_builder::Builder;
use dsf::DsfParams;
use fabric::PlatformMappings;
use state::StateContext;
use std::fmt::Display;

/// Parameters of a [`crate::SwSwitch`]. N.B. we derive a builder type `AgentParamsBuilder`
/// and provide defaults for each field.
#[derive(Builder, Clone, Debug)]
pub struct AgentParams {
    #[builder(setter(into), default = "agent".to_string())]
    pub name: String,

    /// Behavior toggles of the state
    #[builder(default)]
    pub context: StateContext,

    #[builder(default)]
    pub dsf: DsfParams,

    /// Fabric port tables of the platforms of the fabric, by ASIC
    #[builder(default)]
    pub platforms: PlatformMappings,
}

impl Display for AgentParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Agent parameters")?;
        writeln!(f, "  name           : {}", self.name)?;
        writeln!(f, "  neighbor tables: {:?}", self.context.neighbor_tables)?;
        writeln!(f, "  DSF node name  : {}", self.dsf.local_node_name)?;
        writeln!(f, "  DSF sessions   : {}", self.dsf.sessions_per_node)?;
        writeln!(f, "  DSF port       : {}", self.dsf.service_port)?;
        writeln!(f, "  platforms      : {}", self.platforms.iter().count())
    }
}
