// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The remote state service: subscriptions to the state published by remote nodes

use crate::errors::DsfError;
use crate::publisher::PublishedState;
use crate::session::SubscriptionState;
use parking_lot::RwLock;
use state::{InterfaceMap, SwitchId, SystemPortMap};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub const SYSTEM_PORTS_PATH: &str = "/systemPorts";
pub const INTERFACES_PATH: &str = "/interfaces";

/// Path where a node reports the state of its subscription from `endpoint`
#[must_use]
pub fn subscriptions_path(endpoint: &str) -> String {
    format!("/dsfSubscriptions/{endpoint}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub local_node: String,
    pub remote_node: String,
    pub local_ip: IpAddr,
    pub remote_ip: IpAddr,
    pub port: u16,
    pub paths: Vec<String>,
    pub gr_hold_time: Duration,
}

impl SubscriptionRequest {
    /// How the remote node knows this subscription
    #[must_use]
    pub fn subscriber_id(&self) -> String {
        format!("{}::{}", self.local_node, self.local_ip)
    }

    #[must_use]
    pub fn remote_endpoint(&self) -> String {
        format!("{}::{}", self.remote_node, self.remote_ip)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    SystemPorts(BTreeMap<SwitchId, SystemPortMap>),
    Interfaces(BTreeMap<SwitchId, InterfaceMap>),
    SessionState(SubscriptionState),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathUpdate {
    pub path: String,
    pub payload: Payload,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionEvent {
    StateChanged {
        old: SubscriptionState,
        new: SubscriptionState,
    },
    Update(Vec<PathUpdate>),
}

/// A client of the remote state service. Subscribing never blocks: the transport reports the
/// connection state and the updates of the subscribed paths on the returned channel, and
/// reconnects on its own. Dropping the receiver ends the subscription.
pub trait StateTransport: Send + Sync {
    fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<mpsc::Receiver<SubscriptionEvent>, DsfError>;
}

type Publishers = Arc<RwLock<BTreeMap<(IpAddr, u16), watch::Receiver<PublishedState>>>>;

/// Transport between nodes living in the same process. Publishers register the feed of a
/// [`crate::StatePublisher`] under the address they serve on.
#[derive(Clone)]
pub struct InProcessTransport {
    runtime: Handle,
    publishers: Publishers,
    retry_interval: Duration,
}

impl InProcessTransport {
    const CHANNEL_DEPTH: usize = 64;

    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            publishers: Arc::default(),
            retry_interval: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn register(&self, ip: IpAddr, port: u16, feed: watch::Receiver<PublishedState>) {
        info!("Serving state on {ip}:{port}");
        self.publishers.write().insert((ip, port), feed);
    }

    pub fn unregister(&self, ip: IpAddr, port: u16) {
        if self.publishers.write().remove(&(ip, port)).is_some() {
            info!("No longer serving state on {ip}:{port}");
        }
    }

    fn lookup(
        publishers: &Publishers,
        ip: IpAddr,
        port: u16,
    ) -> Option<watch::Receiver<PublishedState>> {
        publishers.read().get(&(ip, port)).cloned()
    }
}

fn path_updates(request: &SubscriptionRequest, published: &PublishedState) -> Vec<PathUpdate> {
    let mut updates = vec![];
    for path in &request.paths {
        let payload = match path.as_str() {
            SYSTEM_PORTS_PATH => Payload::SystemPorts(published.system_ports.clone()),
            INTERFACES_PATH => Payload::Interfaces(published.interfaces.clone()),
            _ => continue,
        };
        updates.push(PathUpdate {
            path: path.clone(),
            payload,
        });
    }
    updates
}

/// Feed one subscription until the subscriber goes away
async fn forward(
    request: SubscriptionRequest,
    publishers: Publishers,
    retry_interval: Duration,
    tx: mpsc::Sender<SubscriptionEvent>,
) {
    let endpoint = request.remote_endpoint();
    let mut state = SubscriptionState::Disconnected;
    loop {
        let mut feed = loop {
            if let Some(feed) =
                InProcessTransport::lookup(&publishers, request.remote_ip, request.port)
            {
                break feed;
            }
            tokio::select! {
                () = tokio::time::sleep(retry_interval) => {}
                () = tx.closed() => return,
            }
        };

        let connected = SubscriptionEvent::StateChanged {
            old: state,
            new: SubscriptionState::Connected,
        };
        state = SubscriptionState::Connected;
        debug!("Subscription {} -> {endpoint} connected", request.subscriber_id());
        let mut updates = path_updates(&request, &feed.borrow_and_update());
        // in process, the remote node sees us as soon as we see it
        updates.push(PathUpdate {
            path: subscriptions_path(&request.subscriber_id()),
            payload: Payload::SessionState(SubscriptionState::Connected),
        });
        if tx.send(connected).await.is_err()
            || tx.send(SubscriptionEvent::Update(updates)).await.is_err()
        {
            return;
        }

        while feed.changed().await.is_ok() {
            let updates = path_updates(&request, &feed.borrow_and_update());
            if tx.send(SubscriptionEvent::Update(updates)).await.is_err() {
                return;
            }
        }

        warn!("Publisher of {endpoint} went away");
        if tx
            .send(SubscriptionEvent::StateChanged {
                old: state,
                new: SubscriptionState::Disconnected,
            })
            .await
            .is_err()
        {
            return;
        }
        state = SubscriptionState::Disconnected;

        tokio::select! {
            () = tokio::time::sleep(request.gr_hold_time) => {}
            () = tx.closed() => return,
        }
        if InProcessTransport::lookup(&publishers, request.remote_ip, request.port).is_none() {
            if tx
                .send(SubscriptionEvent::StateChanged {
                    old: state,
                    new: SubscriptionState::GrHoldExpired,
                })
                .await
                .is_err()
            {
                return;
            }
            state = SubscriptionState::GrHoldExpired;
        }
    }
}

impl StateTransport for InProcessTransport {
    fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<mpsc::Receiver<SubscriptionEvent>, DsfError> {
        if request.paths.is_empty() {
            return Err(DsfError::Transport(format!(
                "no paths to subscribe to at {}",
                request.remote_endpoint()
            )));
        }
        let (tx, rx) = mpsc::channel(Self::CHANNEL_DEPTH);
        self.runtime.spawn(forward(
            request,
            self.publishers.clone(),
            self.retry_interval,
            tx,
        ));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use state::SystemPort;
    use state::SystemPortId;
    use std::net::Ipv6Addr;

    fn request(remote_ip: IpAddr) -> SubscriptionRequest {
        SubscriptionRequest {
            local_node: "rdswB".to_owned(),
            remote_node: "rdswA".to_owned(),
            local_ip: IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 2)),
            remote_ip,
            port: 5908,
            paths: vec![SYSTEM_PORTS_PATH.to_owned(), INTERFACES_PATH.to_owned()],
            gr_hold_time: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_names() {
        let req = request(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)));
        assert_eq!(req.subscriber_id(), "rdswB::2001:db8::2");
        assert_eq!(req.remote_endpoint(), "rdswA::2001:db8::1");
        assert_eq!(
            subscriptions_path(&req.subscriber_id()),
            "/dsfSubscriptions/rdswB::2001:db8::2"
        );
    }

    #[tokio::test]
    async fn test_in_process_subscription() {
        let remote_ip = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let transport = InProcessTransport::new(Handle::current())
            .with_retry_interval(Duration::from_millis(5));
        let mut events = transport.subscribe(request(remote_ip)).unwrap();

        // nobody serves yet, register late
        let mut published = PublishedState::default();
        published.system_ports.insert(
            SwitchId(20),
            [SystemPort::new(SystemPortId(100), SwitchId(20), "rdswA:eth1")]
                .into_iter()
                .collect(),
        );
        let (tx, rx) = watch::channel(published);
        transport.register(remote_ip, 5908, rx);

        assert_eq!(
            events.recv().await,
            Some(SubscriptionEvent::StateChanged {
                old: SubscriptionState::Disconnected,
                new: SubscriptionState::Connected,
            })
        );
        let Some(SubscriptionEvent::Update(updates)) = events.recv().await else {
            panic!("expected the initial snapshot");
        };
        let paths: Vec<_> = updates.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                SYSTEM_PORTS_PATH,
                INTERFACES_PATH,
                "/dsfSubscriptions/rdswB::2001:db8::2"
            ]
        );
        let Payload::SystemPorts(ports) = &updates[0].payload else {
            panic!("expected system ports");
        };
        assert_eq!(ports.get(&SwitchId(20)).map(|m| m.len()), Some(1));

        // publisher goes away for good
        transport.unregister(remote_ip, 5908);
        drop(tx);
        assert_eq!(
            events.recv().await,
            Some(SubscriptionEvent::StateChanged {
                old: SubscriptionState::Connected,
                new: SubscriptionState::Disconnected,
            })
        );
        assert_eq!(
            events.recv().await,
            Some(SubscriptionEvent::StateChanged {
                old: SubscriptionState::Disconnected,
                new: SubscriptionState::GrHoldExpired,
            })
        );
    }

    #[test]
    fn test_subscribe_needs_paths() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let transport = InProcessTransport::new(runtime.handle().clone());
        let mut req = request(IpAddr::V6(Ipv6Addr::LOCALHOST));
        req.paths.clear();
        assert!(matches!(
            transport.subscribe(req),
            Err(DsfError::Transport(_))
        ));
    }
}
