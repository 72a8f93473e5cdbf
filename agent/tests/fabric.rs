// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

mod common;

use agent::SwSwitch;
use common::{RDSW001, load, params};
use fabric::FabricEndpoint;
use pretty_assertions::assert_eq;
use state::{PortId, SwitchId};
use tokio::runtime::Handle;

#[tokio::test(flavor = "multi_thread")]
async fn test_fabric_connectivity() {
    let config = load(RDSW001);
    let agent = SwSwitch::start(params(&config), None, Handle::current()).unwrap();
    let ctl = agent.ctl();
    ctl.apply_config(config).await.unwrap();

    // expected, but nothing seen yet
    let status = ctl.fabric_status().await.unwrap();
    assert_eq!(status.missing, vec![PortId(101)]);
    assert!(status.mismatched.is_empty());
    let endpoint = &status.endpoints[&PortId(101)];
    assert_eq!(endpoint.expected_switch_id, Some(SwitchId(200)));
    assert_eq!(endpoint.expected_port_id, Some(PortId(3)));

    // cabled as expected
    let deltas = ctl
        .fabric_samples(vec![(
            PortId(101),
            FabricEndpoint::sample(SwitchId(200), PortId(3), true),
        )])
        .await
        .unwrap();
    assert_eq!(deltas.len(), 1);
    let status = ctl.fabric_status().await.unwrap();
    assert!(status.missing.is_empty());
    assert!(status.mismatched.is_empty());
    let endpoint = &status.endpoints[&PortId(101)];
    assert_eq!(endpoint.switch_name.as_deref(), Some("fdsw001"));
    assert_eq!(endpoint.port_name.as_deref(), Some("fab1/3/1"));
    // interface nodes are only reachable over links to them
    assert!(status.unreachable.contains(&(SwitchId(8), "rdsw002".to_owned())));

    // the same sample again changes nothing
    let deltas = ctl
        .fabric_samples(vec![(
            PortId(101),
            FabricEndpoint::sample(SwitchId(200), PortId(3), true),
        )])
        .await
        .unwrap();
    assert!(deltas.is_empty());

    // miscabled to the next port of the same switch
    ctl.fabric_samples(vec![(
        PortId(101),
        FabricEndpoint::sample(SwitchId(200), PortId(4), true),
    )])
    .await
    .unwrap();
    let status = ctl.fabric_status().await.unwrap();
    assert_eq!(status.mismatched, vec![PortId(101)]);
    let endpoint = &status.endpoints[&PortId(101)];
    assert_eq!(endpoint.port_name.as_deref(), Some("fab1/3/2"));
}
