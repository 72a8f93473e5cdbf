// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! One subscription to a remote node

use crate::errors::DsfError;
use crate::merge::{RemoteUpdate, mark_remote_node_stale, merge_remote_state};
use crate::session::{DsfSessions, SubscriptionState};
use crate::transport::{
    INTERFACES_PATH, PathUpdate, Payload, SYSTEM_PORTS_PATH, StateTransport, SubscriptionEvent,
    SubscriptionRequest, subscriptions_path,
};
use parking_lot::Mutex;
use state::{StateUpdate, SwitchId, UpdateScheduler};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A running subscription. Stopping it, or dropping it, is synchronous: once done, no update
/// from this subscription is applied to the state anymore, even if already queued.
#[derive(Debug)]
pub struct Subscription {
    request: SubscriptionRequest,
    alive: Arc<AtomicBool>,
    sessions: DsfSessions,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Subscribe to the remote node and start handling what it sends
    pub(crate) fn start(
        request: SubscriptionRequest,
        switch_ids: BTreeSet<SwitchId>,
        transport: &dyn StateTransport,
        scheduler: Arc<dyn UpdateScheduler>,
        sessions: DsfSessions,
        runtime: &Handle,
    ) -> Result<Self, DsfError> {
        let events = transport.subscribe(request.clone())?;
        let alive = Arc::new(AtomicBool::new(true));
        sessions.add(&request.remote_endpoint());
        let task = SubscriptionTask {
            node: request.remote_node.clone(),
            endpoint: request.remote_endpoint(),
            session_path: subscriptions_path(&request.subscriber_id()),
            switch_ids,
            alive: alive.clone(),
            scheduler,
            sessions: sessions.clone(),
            pending: Arc::default(),
            latest: RemoteUpdate::new(&request.remote_node),
        };
        let task = runtime.spawn(task.run(events));
        info!("Subscribed to {}", request.remote_endpoint());
        Ok(Self {
            request,
            alive,
            sessions,
            task,
        })
    }

    #[must_use]
    pub fn request(&self) -> &SubscriptionRequest {
        &self.request
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.task.abort();
        self.sessions.remove(&self.request.remote_endpoint());
        info!("Unsubscribed from {}", self.request.remote_endpoint());
    }
}

struct SubscriptionTask {
    node: String,
    endpoint: String,
    session_path: String,
    switch_ids: BTreeSet<SwitchId>,
    alive: Arc<AtomicBool>,
    scheduler: Arc<dyn UpdateScheduler>,
    sessions: DsfSessions,
    /// Next merge to apply. A merge is only queued when the slot is empty, later updates
    /// replace the content of the slot.
    pending: Arc<Mutex<Option<RemoteUpdate>>>,
    latest: RemoteUpdate,
}

impl SubscriptionTask {
    async fn run(mut self, mut events: mpsc::Receiver<SubscriptionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SubscriptionEvent::StateChanged { old, new } => self.state_changed(old, new),
                SubscriptionEvent::Update(updates) => self.handle_updates(updates),
            }
        }
        debug!("Event stream of {} closed", self.endpoint);
    }

    fn state_changed(&mut self, old: SubscriptionState, new: SubscriptionState) {
        info!("Subscription to {}: {old:?} -> {new:?}", self.endpoint);
        self.sessions
            .update(&self.endpoint, |s| s.local_state_changed(new));
        if new == SubscriptionState::GrHoldExpired {
            self.latest = RemoteUpdate::new(&self.node);
            self.schedule_stale();
        }
    }

    fn handle_updates(&mut self, updates: Vec<PathUpdate>) {
        let mut merge = false;
        for update in updates {
            match (update.path.as_str(), update.payload) {
                (SYSTEM_PORTS_PATH, Payload::SystemPorts(ports)) => {
                    self.latest.system_ports = ports;
                    merge = true;
                }
                (INTERFACES_PATH, Payload::Interfaces(intfs)) => {
                    self.latest.interfaces = intfs;
                    merge = true;
                }
                (path, Payload::SessionState(state)) if path == self.session_path => {
                    self.sessions
                        .update(&self.endpoint, |s| s.remote_state_changed(state));
                }
                (path, _) => {
                    let err = DsfError::UnexpectedPath {
                        node: self.node.clone(),
                        path: path.to_owned(),
                    };
                    error!("{err}");
                }
            }
        }
        if merge {
            self.schedule_merge();
        }
    }

    fn schedule(&self, update: StateUpdate) -> bool {
        match self.scheduler.schedule(update) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not queue update from {}: {e}", self.endpoint);
                false
            }
        }
    }

    fn schedule_merge(&self) {
        {
            let mut slot = self.pending.lock();
            let queued = slot.is_some();
            *slot = Some(self.latest.clone());
            if queued {
                return;
            }
        }
        let alive = self.alive.clone();
        let pending = self.pending.clone();
        let endpoint = self.endpoint.clone();
        let queued = self.schedule(StateUpdate::new(
            &format!("dsf update from {}", self.endpoint),
            move |state| {
                if !alive.load(Ordering::Acquire) {
                    debug!("Dropping update from {endpoint}: unsubscribed");
                    return Ok(None);
                }
                let Some(update) = pending.lock().take() else {
                    return Ok(None);
                };
                Ok(merge_remote_state(state, &update))
            },
        ));
        // nothing will consume the slot: the next merge must queue again
        if !queued {
            self.pending.lock().take();
        }
    }

    fn schedule_stale(&self) {
        let alive = self.alive.clone();
        let node = self.node.clone();
        let switch_ids = self.switch_ids.clone();
        self.schedule(StateUpdate::new(
            &format!("dsf gr expiry of {}", self.endpoint),
            move |state| {
                if !alive.load(Ordering::Acquire) {
                    return Ok(None);
                }
                Ok(mark_remote_node_stale(state, &node, &switch_ids))
            },
        ));
    }
}
