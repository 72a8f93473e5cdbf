// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration model of the switch agent. A [`SwitchConfig`] is read from YAML and validated
//! here. Building the switch state out of it is left to the agent.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::doc_markdown)]

pub mod display;
pub mod dsf;
pub mod errors;
pub mod interface;
pub mod platform;
pub mod port;
pub mod routes;
pub mod switch;
pub mod tracecfg;

pub use dsf::DsfNodeConfig; // re-export
pub use errors::{ConfigError, ConfigResult, stringify}; // re-export
pub use interface::InterfaceConfig; // re-export
pub use platform::{FabricPlatformConfig, FabricPortConfig}; // re-export
pub use port::{PortConfig, VlanConfig}; // re-export
pub use routes::{RouteAction, StaticRouteConfig}; // re-export
pub use switch::{SettingsConfig, SwitchConfig, SwitchIdConfig}; // re-export
pub use tracecfg::TracingConfig; // re-export

use tracectl::trace_target;
trace_target!("config", LevelFilter::DEBUG, &["config"]);
