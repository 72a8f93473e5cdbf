// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bookkeeping of the sessions to the remote interface nodes.
//!
//! A session is up when both directions are: our subscription to the remote node, and the
//! subscription of the remote node to us, as reported by the remote node itself.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info};

/// State of one direction of a session, as seen by the transport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    #[default]
    Disconnected,
    Connected,
    /// Disconnected for longer than the graceful restart hold time
    GrHoldExpired,
}

impl SubscriptionState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == SubscriptionState::Connected
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsfSessionState {
    #[default]
    Idle,
    /// Our subscription is not connected
    Connect,
    /// Our subscription is connected, the one of the remote node is not
    WaitForRemote,
    Established,
    RemoteDisconnected,
}

impl Display for DsfSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DsfSessionState::Idle => "IDLE",
            DsfSessionState::Connect => "CONNECT",
            DsfSessionState::WaitForRemote => "WAIT_FOR_REMOTE",
            DsfSessionState::Established => "ESTABLISHED",
            DsfSessionState::RemoteDisconnected => "REMOTE_DISCONNECTED",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsfSession {
    /// "node::ip" of the remote end
    pub remote_endpoint: String,
    pub local_state: SubscriptionState,
    pub remote_state: SubscriptionState,
    pub state: DsfSessionState,
    pub last_established_at: Option<DateTime<Utc>>,
    pub last_disconnected_at: Option<DateTime<Utc>>,
}

impl DsfSession {
    #[must_use]
    pub fn new(remote_endpoint: &str) -> Self {
        Self {
            remote_endpoint: remote_endpoint.to_owned(),
            local_state: SubscriptionState::Disconnected,
            remote_state: SubscriptionState::Disconnected,
            state: DsfSessionState::Idle,
            last_established_at: None,
            last_disconnected_at: None,
        }
    }

    fn recompute(&mut self) {
        let next = match (self.local_state.is_connected(), self.remote_state.is_connected()) {
            (true, true) => DsfSessionState::Established,
            (true, false) if self.state == DsfSessionState::Established => {
                DsfSessionState::RemoteDisconnected
            }
            (true, false) => DsfSessionState::WaitForRemote,
            (false, _) => DsfSessionState::Connect,
        };
        if next == self.state {
            return;
        }
        if next == DsfSessionState::Established {
            self.last_established_at = Some(Utc::now());
        } else if self.state == DsfSessionState::Established {
            self.last_disconnected_at = Some(Utc::now());
        }
        info!(
            "DSF session {} state changed {} -> {next}",
            self.remote_endpoint, self.state
        );
        self.state = next;
    }

    pub fn local_state_changed(&mut self, state: SubscriptionState) {
        self.local_state = state;
        self.recompute();
    }

    pub fn remote_state_changed(&mut self, state: SubscriptionState) {
        self.remote_state = state;
        self.recompute();
    }
}

/// Sessions by remote endpoint. Written by the subscriptions, read by anyone.
#[derive(Clone, Debug, Default)]
pub struct DsfSessions(Arc<RwLock<BTreeMap<String, DsfSession>>>);

impl DsfSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, remote_endpoint: &str) {
        self.0
            .write()
            .entry(remote_endpoint.to_owned())
            .or_insert_with(|| DsfSession::new(remote_endpoint));
    }

    pub(crate) fn remove(&self, remote_endpoint: &str) {
        if self.0.write().remove(remote_endpoint).is_some() {
            debug!("Removed DSF session {remote_endpoint}");
        }
    }

    pub(crate) fn update<F: FnOnce(&mut DsfSession)>(&self, remote_endpoint: &str, f: F) {
        if let Some(session) = self.0.write().get_mut(remote_endpoint) {
            f(session);
        }
    }

    #[must_use]
    pub fn get(&self, remote_endpoint: &str) -> Option<DsfSession> {
        self.0.read().get(remote_endpoint).cloned()
    }

    /// Copy of all the sessions
    #[must_use]
    pub fn snapshot(&self) -> Vec<DsfSession> {
        self.0.read().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}
