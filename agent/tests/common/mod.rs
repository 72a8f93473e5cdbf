// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(dead_code)]

use agent::apply::platform_mappings;
use agent::{AgentParams, AgentParamsBuilder, SwitchStateReader};
use config::SwitchConfig;
use dsf::DsfParams;
use state::{RouterId, StateContext, SwitchState};
use std::sync::Arc;
use std::time::Duration;

pub const RDSW001: &str = r#"
settings:
  hostname: rdsw001
  neighbor_tables: interface
  switches:
    - { id: 4, type: voq, asic: jericho2, index: 0 }
ports:
  - { id: 1, name: eth1/1/1, speed_mbps: 400000 }
  - { id: 2, name: eth1/2/1, speed_mbps: 400000 }
  - id: 101
    name: fab1/1/1
    type: fabric
    expected_neighbors:
      - { remote_system: fdsw001, remote_port: fab1/3/1 }
interfaces:
  - id: 101
    name: eth1/1/1
    type: systemport
    system_port: 101
    mac: "02:00:00:00:00:04"
    addresses: ["10.0.1.1/24", "2401:db00::1/64"]
  - id: 102
    name: eth1/2/1
    type: systemport
    system_port: 102
    mac: "02:00:00:00:00:04"
    addresses: ["10.0.2.1/24"]
dsf_nodes:
  - switch_id: 4
    name: rdsw001
    type: interface
    asic: jericho2
    loopbacks: ["2401::4"]
    system_port_range: { min: 100, max: 199 }
  - switch_id: 8
    name: rdsw002
    type: interface
    asic: jericho2
    loopbacks: ["2401::8"]
    system_port_range: { min: 200, max: 299 }
  - switch_id: 200
    name: fdsw001
    type: fabric
    asic: ramon
static_routes:
  - prefix: 0.0.0.0/0
    nexthops: ["10.0.1.2", "10.0.2.2"]
  - prefix: 192.0.2.0/24
    action: drop
fabric_platforms:
  - asic: ramon
    ports:
      - { name: fab1/3/1, id: 3, virtual_device: 0 }
      - { name: fab1/3/2, id: 4, virtual_device: 0 }
"#;

pub const RDSW002: &str = r#"
settings:
  hostname: rdsw002
  neighbor_tables: interface
  switches:
    - { id: 8, type: voq, asic: jericho2, index: 0 }
ports:
  - { id: 1, name: eth1/1/1, speed_mbps: 400000 }
interfaces:
  - id: 201
    name: eth1/1/1
    type: systemport
    system_port: 201
    mac: "02:00:00:00:00:08"
    addresses: ["10.0.3.1/24"]
dsf_nodes:
  - switch_id: 4
    name: rdsw001
    type: interface
    asic: jericho2
    loopbacks: ["2401::4"]
    system_port_range: { min: 100, max: 199 }
  - switch_id: 8
    name: rdsw002
    type: interface
    asic: jericho2
    loopbacks: ["2401::8"]
    system_port_range: { min: 200, max: 299 }
"#;

pub fn load(yaml: &str) -> SwitchConfig {
    SwitchConfig::from_yaml(yaml).unwrap()
}

pub fn params(config: &SwitchConfig) -> AgentParams {
    AgentParamsBuilder::default()
        .name(config.settings.hostname.as_str())
        .context(StateContext::new(config.settings.neighbor_tables))
        .dsf(DsfParams {
            local_node_name: config.settings.hostname.clone(),
            ..DsfParams::default()
        })
        .platforms(platform_mappings(config).unwrap())
        .build()
        .unwrap()
}

/// The IPv4 prefixes in the FIB of the default VRF
pub fn fib_v4(state: &SwitchState) -> Vec<String> {
    state
        .fibs()
        .get(&RouterId::DEFAULT)
        .map(|fib| fib.v4().keys().map(ToString::to_string).collect())
        .unwrap_or_default()
}

/// Poll the state until `cond` holds
pub async fn wait_for<F>(reader: &SwitchStateReader, cond: F) -> Arc<SwitchState>
where
    F: Fn(&SwitchState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let state = reader.current();
            if cond(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap()
}
