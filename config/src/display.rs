// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display of configuration objects

use crate::dsf::DsfNodeConfig;
use crate::routes::{RouteAction, StaticRouteConfig};
use crate::switch::SwitchConfig;
use std::fmt::Display;

const SEP: &str = "    ";

impl Display for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteAction::NextHops => write!(f, "forward"),
            RouteAction::Drop => write!(f, "drop"),
            RouteAction::ToCpu => write!(f, "to-cpu"),
        }
    }
}

impl Display for StaticRouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (vrf {}) {}", self.prefix, self.vrf, self.action)?;
        if !self.nexthops.is_empty() {
            write!(f, " via")?;
            for nh in &self.nexthops {
                write!(f, " {nh}")?;
            }
        }
        Ok(())
    }
}

impl Display for DsfNodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (switch {}, {:?}, {})",
            self.name, self.switch_id, self.node_type, self.asic
        )?;
        if let Some(range) = &self.system_port_range {
            write!(f, " system ports [{}, {}]", range.min, range.max)?;
        }
        Ok(())
    }
}

impl Display for SwitchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " ■ switch {}:", self.settings.hostname)?;
        for switch in &self.settings.switches {
            writeln!(
                f,
                "{SEP}switch {} index {}: {:?} {}",
                switch.id, switch.index, switch.switch_type, switch.asic
            )?;
        }
        writeln!(
            f,
            "{SEP}{} ports, {} vlans, {} interfaces",
            self.ports.len(),
            self.vlans.len(),
            self.interfaces.len()
        )?;
        if !self.dsf_nodes.is_empty() {
            writeln!(f, "{SEP}DSF nodes:")?;
            for node in &self.dsf_nodes {
                writeln!(f, "{SEP}{SEP}{node}")?;
            }
        }
        if !self.static_routes.is_empty() {
            writeln!(f, "{SEP}static routes:")?;
            for route in &self.static_routes {
                writeln!(f, "{SEP}{SEP}{route}")?;
            }
        }
        Ok(())
    }
}
