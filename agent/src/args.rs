// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub(crate) use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "Switch agent")]
#[command(version = "0.1")]
#[command(about = "Switch state agent for disaggregated fabrics", long_about = None)]
pub(crate) struct CmdArgs {
    #[arg(long, value_name = "path of the switch configuration")]
    config: PathBuf,

    #[arg(long, value_name = "name of this node in the fabric")]
    node_name: Option<String>,

    #[arg(long, value_name = "max sessions to one remote node", default_value_t = 4)]
    dsf_sessions: usize,

    #[arg(long, value_name = "remote state service port", default_value_t = 5908)]
    dsf_port: u16,

    #[arg(long, value_name = "tracing configuration string")]
    tracing: Option<String>,

    #[arg(long, default_value_t = false)]
    show_tracing_tags: bool,

    #[arg(long, default_value_t = false)]
    show_tracing_targets: bool,
}

impl CmdArgs {
    pub fn config(&self) -> &Path {
        &self.config
    }
    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }
    pub fn dsf_sessions(&self) -> usize {
        self.dsf_sessions
    }
    pub fn dsf_port(&self) -> u16 {
        self.dsf_port
    }
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
    pub fn show_tracing_tags(&self) -> bool {
        self.show_tracing_tags
    }
    pub fn show_tracing_targets(&self) -> bool {
        self.show_tracing_targets
    }
}
