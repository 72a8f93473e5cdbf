// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Subscriptions to the remote interface nodes of the fabric, kept in line with the DSF nodes
//! of the state

use crate::errors::DsfError;
use crate::params::DsfParams;
use crate::session::DsfSessions;
use crate::subscription::Subscription;
use crate::transport::{INTERFACES_PATH, SYSTEM_PORTS_PATH, StateTransport, SubscriptionRequest};
use state::{StateDelta, StateObserver, SwitchId, SwitchState, UpdateScheduler};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Pair local and remote loopbacks, in order, for at most `max` sessions
pub(crate) fn session_pairs(
    local: &BTreeSet<IpAddr>,
    remote: &BTreeSet<IpAddr>,
    max: usize,
) -> Vec<(IpAddr, IpAddr)> {
    local
        .iter()
        .zip(remote.iter())
        .take(max)
        .map(|(l, r)| (*l, *r))
        .collect()
}

#[derive(Debug, Default)]
struct RemoteNode {
    switch_ids: BTreeSet<SwitchId>,
    loopbacks: BTreeSet<IpAddr>,
}

fn local_loopbacks(state: &SwitchState) -> BTreeSet<IpAddr> {
    state
        .dsf_nodes()
        .values()
        .filter(|n| state.is_local_switch_id(n.switch_id))
        .flat_map(|n| n.loopback_ips.iter().copied())
        .collect()
}

/// Remote interface nodes by name. A node none of whose switches is local.
fn remote_nodes(state: &SwitchState) -> BTreeMap<String, RemoteNode> {
    let mut nodes: BTreeMap<String, RemoteNode> = BTreeMap::new();
    let mut local_names = BTreeSet::new();
    for node in state.dsf_nodes().values() {
        if state.is_local_switch_id(node.switch_id) {
            local_names.insert(node.name.clone());
            continue;
        }
        if !node.is_interface_node() {
            continue;
        }
        let remote = nodes.entry(node.name.clone()).or_default();
        remote.switch_ids.insert(node.switch_id);
        remote.loopbacks.extend(node.loopback_ips.iter().copied());
    }
    nodes.retain(|name, _| !local_names.contains(name));
    nodes
}

/// Keeps one subscription per session to every remote interface node
pub struct DsfSubscriber {
    params: DsfParams,
    transport: Arc<dyn StateTransport>,
    scheduler: Arc<dyn UpdateScheduler>,
    runtime: Handle,
    sessions: DsfSessions,
    subscriptions: BTreeMap<String, Subscription>,
    /// Set once the state had VOQ switches
    voq: bool,
}

impl DsfSubscriber {
    #[must_use]
    pub fn new(
        params: DsfParams,
        transport: Arc<dyn StateTransport>,
        scheduler: Arc<dyn UpdateScheduler>,
        runtime: Handle,
    ) -> Self {
        Self {
            params,
            transport,
            scheduler,
            runtime,
            sessions: DsfSessions::new(),
            subscriptions: BTreeMap::new(),
            voq: false,
        }
    }

    /// Handle to the session table, for readers outside of the update serializer
    #[must_use]
    pub fn sessions(&self) -> DsfSessions {
        self.sessions.clone()
    }

    /// Remote endpoints ("node::ip") subscribed to
    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn num_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// The subscriptions the state calls for, by remote endpoint
    fn wanted(
        &self,
        state: &SwitchState,
    ) -> BTreeMap<String, (SubscriptionRequest, BTreeSet<SwitchId>)> {
        let mut wanted = BTreeMap::new();
        let remotes = remote_nodes(state);
        if remotes.is_empty() {
            return wanted;
        }
        let local = local_loopbacks(state);
        if local.is_empty() {
            warn!("{}", DsfError::NoLocalLoopback);
            return wanted;
        }
        for (name, node) in remotes {
            if node.loopbacks.is_empty() {
                warn!("Remote node {name} has no loopback address, not subscribing");
                continue;
            }
            for (local_ip, remote_ip) in
                session_pairs(&local, &node.loopbacks, self.params.sessions_per_node)
            {
                let request = SubscriptionRequest {
                    local_node: self.params.local_node_name.clone(),
                    remote_node: name.clone(),
                    local_ip,
                    remote_ip,
                    port: self.params.service_port,
                    paths: vec![SYSTEM_PORTS_PATH.to_owned(), INTERFACES_PATH.to_owned()],
                    gr_hold_time: Duration::from_secs(u64::from(self.params.gr_hold_time)),
                };
                wanted.insert(request.remote_endpoint(), (request, node.switch_ids.clone()));
            }
        }
        wanted
    }

    fn reconcile(&mut self, state: &SwitchState) {
        let mut wanted = self.wanted(state);

        let obsolete: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|(endpoint, sub)| {
                wanted
                    .get(*endpoint)
                    .is_none_or(|(request, _)| request != sub.request())
            })
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        for endpoint in obsolete {
            if let Some(sub) = self.subscriptions.remove(&endpoint) {
                sub.stop();
            }
        }

        wanted.retain(|endpoint, _| !self.subscriptions.contains_key(endpoint));
        for (endpoint, (request, switch_ids)) in wanted {
            match Subscription::start(
                request,
                switch_ids,
                self.transport.as_ref(),
                self.scheduler.clone(),
                self.sessions.clone(),
                &self.runtime,
            ) {
                Ok(sub) => {
                    self.subscriptions.insert(endpoint, sub);
                }
                Err(e) => error!("Could not subscribe to {endpoint}: {e}"),
            }
        }
        debug!("{} DSF subscriptions", self.subscriptions.len());
    }
}

impl StateObserver for DsfSubscriber {
    fn name(&self) -> &str {
        "dsf subscriber"
    }

    /// # Panics
    /// If the switch had VOQ switches and no longer has any
    fn state_updated(&mut self, delta: &StateDelta) {
        let state = delta.new_state();
        let voq = state.settings().has_voq_switches();
        if self.voq && !voq {
            error!("Transition from VOQ to non-VOQ switch type is not supported");
            panic!("Transition from VOQ to non-VOQ switch type is not supported");
        }
        if !voq {
            return;
        }
        if !self.voq {
            info!("VOQ switches present, tracking remote interface nodes");
            self.voq = true;
        } else if !delta.settings_delta().is_changed() && delta.dsf_nodes_delta().is_empty() {
            return;
        }
        self.reconcile(state);
    }
}
