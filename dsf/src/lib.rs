// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Distributed switch fabric state exchange.
//!
//! Every interface node of the fabric publishes its system ports and interfaces. The
//! [`DsfSubscriber`] subscribes to the publications of every remote interface node and merges
//! what it receives into the local state as remote system ports and remote interfaces. The
//! subscriptions run as tokio tasks: they never touch the state, they queue state updates on the
//! single writer.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::missing_errors_doc)]

pub mod errors;
pub mod merge;
pub mod params;
pub mod publisher;
pub mod session;
pub mod subscriber;
pub mod subscription;
pub mod transport;

#[cfg(test)]
mod testutils;

pub use errors::DsfError;
pub use merge::{RemoteUpdate, mark_remote_node_stale, merge_remote_state};
pub use params::DsfParams;
pub use publisher::{PublishedState, StatePublisher};
pub use session::{DsfSession, DsfSessionState, DsfSessions, SubscriptionState};
pub use subscriber::DsfSubscriber;
pub use subscription::Subscription;
pub use transport::{
    INTERFACES_PATH, InProcessTransport, PathUpdate, Payload, StateTransport, SYSTEM_PORTS_PATH,
    SubscriptionEvent, SubscriptionRequest, subscriptions_path,
};

use tracectl::trace_target;
trace_target!("dsf", tracectl::LevelFilter::INFO, &["dsf"]);
