// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Immutable, versioned switch state.
//!
//! A [`SwitchState`] is a tree of reference-counted nodes. Once published it is never mutated:
//! [`SwitchState::modify`] clones the root, and the `*_mut` accessors clone every node on the way
//! down to the one being changed, so that all untouched subtrees stay shared with the previous
//! version. [`StateDelta`] computes the differences between two versions.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::missing_errors_doc)]

pub mod acl;
pub mod context;
pub mod delta;
pub mod dsf_node;
pub mod errors;
pub mod fib;
pub mod ids;
pub mod interface;
pub mod mirror;
pub mod neighbor;
pub mod node;
pub mod port;
pub mod settings;
pub mod switch_state;
pub mod system_port;
pub mod update;
pub mod vlan;

pub use acl::{Acl, AclAction, AclMap};
pub use context::{NeighborTableLocation, StateContext};
pub use delta::{DeltaEntry, DeltaValue, MapDelta, StateDelta, for_each_changed, try_for_each_changed};
pub use dsf_node::{AsicType, DsfNode, DsfNodeMap, DsfNodeType, SystemPortRange};
pub use errors::StateError;
pub use fib::{
    FibAction, FibNextHop, FibRoute, FibRouteMapV4, FibRouteMapV6, ForwardingInfoBase,
    ForwardingInfoBaseMap,
};
pub use ids::{InterfaceId, PortId, RouterId, SwitchId, SystemPortId, VlanId};
pub use interface::{Interface, InterfaceMap, InterfaceType};
pub use mirror::{Mirror, MirrorMap};
pub use neighbor::{ArpEntry, ArpTable, NdpEntry, NdpTable, NeighborEntry, NeighborPort, NeighborState};
pub use node::{Node, NodeMap, PublishFlag, Publishable};
pub use port::{AdminState, ExpectedNeighbor, OperState, Port, PortMap, PortType};
pub use settings::{SwitchInfo, SwitchSettings, SwitchType};
pub use switch_state::SwitchState;
pub use system_port::{LivenessStatus, RemoteAttrs, RemoteEntryType, SystemPort, SystemPortMap};
pub use update::{StateObserver, StateUpdate, UpdateFn, UpdateScheduler};
pub use vlan::{Vlan, VlanMap};

use tracectl::trace_target;
trace_target!("state", tracectl::LevelFilter::INFO, &["state"]);
