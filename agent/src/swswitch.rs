// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The switch agent: a single writer thread serializing every change to the state, the
//! observers it notifies, and the control channel other contexts talk to it through.

use crate::apply::{build_state, rib_config};
use crate::errors::AgentError;
use crate::events::{NeighborEvent, flush_neighbor, learn_neighbor, set_port_oper_state};
use crate::hwprog::{HwCallCounters, LoggingHwProgrammer};
use crate::params::AgentParams;

use arc_swap::ArcSwap;
use config::SwitchConfig;
use dsf::{DsfSessions, DsfSubscriber, PublishedState, StatePublisher, StateTransport};
use fabric::{
    FabricConnectivityDelta, FabricConnectivityManager, FabricEndpoint,
    FabricReachabilityManager, PlatformMappings, ReachabilityChange,
};
use rib::{InterfaceRoute, RibError, RoutingInformationBase};
use state::{
    InterfaceId, OperState, PortId, Publishable, RouterId, StateContext, StateDelta, StateError,
    StateObserver, StateUpdate, SwitchId, SwitchState, UpdateScheduler,
};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::{oneshot, watch};
#[allow(unused)]
use tracing::{debug, error, info, warn};

pub type Reply<T> = oneshot::Sender<Result<T, AgentError>>;

/// Requests to the update serializer
pub enum UpdateMsg {
    Update(StateUpdate, Option<Reply<bool>>),
    ApplyConfig(Box<SwitchConfig>, Reply<bool>),
    FabricSamples(
        Vec<(PortId, FabricEndpoint)>,
        Reply<Vec<FabricConnectivityDelta>>,
    ),
    FabricStatus(Reply<FabricStatus>),
    AddObserver(Box<dyn StateObserver>),
    Finish,
}

/// Lock-free access to the last committed state
#[derive(Clone)]
pub struct SwitchStateReader(Arc<ArcSwap<SwitchState>>);

impl SwitchStateReader {
    #[must_use]
    pub fn current(&self) -> Arc<SwitchState> {
        self.0.load_full()
    }
}

/// Summary of the fabric as seen by this switch
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FabricStatus {
    pub endpoints: BTreeMap<PortId, FabricEndpoint>,
    pub mismatched: Vec<PortId>,
    pub missing: Vec<PortId>,
    pub unreachable: Vec<(SwitchId, String)>,
    pub asymmetric_virtual_devices: usize,
}

/// Routes to the subnets of the remote interfaces that are not stale, by VRF
fn remote_interface_routes(state: &SwitchState) -> BTreeMap<RouterId, Vec<InterfaceRoute>> {
    let mut routes: BTreeMap<RouterId, Vec<InterfaceRoute>> = BTreeMap::new();
    for intf in state.remote_interfaces().values().filter(|i| !i.is_stale()) {
        let vrf_routes = routes.entry(intf.router_id).or_default();
        for (addr, len) in &intf.addresses {
            vrf_routes.push(InterfaceRoute {
                interface: intf.id,
                addr: *addr,
                len: *len,
            });
        }
    }
    routes
}

fn sync_remote_interface_routes(
    rib: &mut RoutingInformationBase,
    state: &SwitchState,
) -> Result<(), RibError> {
    let routes = remote_interface_routes(state);
    for vrf in routes.keys().filter(|vrf| rib.table(**vrf).is_none()) {
        warn!("Ignoring remote interfaces in unknown VRF {vrf}");
    }
    let vrfs: Vec<RouterId> = rib.vrfs().collect();
    for vrf in vrfs {
        let vrf_routes = routes.get(&vrf).map_or(&[][..], Vec::as_slice);
        rib.update_remote_interface_routes(vrf, vrf_routes)?;
    }
    Ok(())
}

fn reply<T: std::fmt::Debug>(what: &str, reply_to: Reply<T>, result: Result<T, AgentError>) {
    if let Err(e) = reply_to.send(result) {
        error!("Fatal: could not reply to {what} request: {e:?}");
    }
}

/// The single writer of the state. It owns the routing and fabric state derived from it.
struct Serializer {
    state: Arc<SwitchState>,
    reader: SwitchStateReader,
    rib: RoutingInformationBase,
    connectivity: FabricConnectivityManager,
    reachability: FabricReachabilityManager,
    platforms: PlatformMappings,
    observers: Vec<Box<dyn StateObserver>>,
    rx: UnboundedReceiver<UpdateMsg>,
    run: bool,
}

impl Serializer {
    /// Make `next` the current state and tell everybody about it
    fn commit(&mut self, next: Arc<SwitchState>) {
        next.publish();
        let delta = StateDelta::new(self.state.clone(), next.clone());
        self.state = next.clone();
        self.reader.0.store(next);
        debug!("Committed state generation {}", self.state.generation());

        self.connectivity.state_updated(&delta);
        self.reachability.state_updated(&delta);
        self.recompute_reachability();
        for observer in &mut self.observers {
            debug!("Notifying {}", observer.name());
            observer.state_updated(&delta);
        }
    }

    fn recompute_reachability(&mut self) {
        for change in self.reachability.recompute(self.connectivity.connectivity()) {
            match change {
                ReachabilityChange::Reachable { switch_id, ports } => {
                    info!("Switch {switch_id} reachable over {} ports", ports.len());
                }
                ReachabilityChange::Unreachable(switch_id) => {
                    warn!("Switch {switch_id} is no longer reachable");
                }
            }
        }
    }

    fn run_update(&mut self, update: StateUpdate) -> Result<bool, AgentError> {
        let name = update.name().to_owned();
        let rejected = |reason: String| AgentError::Rejected {
            name: name.clone(),
            reason,
        };
        let next = update.apply(&self.state).map_err(|e| rejected(e.to_string()))?;
        let Some(mut next) = next.filter(|n| !Arc::ptr_eq(n, &self.state)) else {
            debug!("Update '{name}' changed nothing");
            return Ok(false);
        };

        if !std::ptr::eq(next.remote_interfaces(), self.state.remote_interfaces()) {
            let mut rib = self.rib.clone();
            sync_remote_interface_routes(&mut rib, &next).map_err(|e| rejected(e.to_string()))?;
            rib.sync_fib(&mut next);
            self.rib = rib;
        }
        debug!("Applied update '{name}'");
        self.commit(next);
        Ok(true)
    }

    fn apply_config(&mut self, config: &SwitchConfig) -> Result<bool, AgentError> {
        config.validate()?;
        let mut next = build_state(&self.state, config)?;
        let (interface_routes, static_routes) = rib_config(config)?;

        let mut rib = self.rib.clone();
        rib.reconfigure(&interface_routes, &static_routes)?;
        sync_remote_interface_routes(&mut rib, &next)?;
        rib.sync_fib(&mut next);
        if let Some(tracing) = &config.tracing {
            tracing.apply()?;
        }
        self.rib = rib;

        if Arc::ptr_eq(&next, &self.state) {
            info!("Configuration brings no change");
            return Ok(false);
        }
        info!("Applying configuration of {}", config.settings.hostname);
        self.commit(next);
        Ok(true)
    }

    fn fabric_samples(
        &mut self,
        samples: Vec<(PortId, FabricEndpoint)>,
    ) -> Vec<FabricConnectivityDelta> {
        let deltas: Vec<_> = samples
            .into_iter()
            .filter_map(|(port, endpoint)| {
                self.connectivity
                    .process_connectivity_info_for_port(port, &endpoint)
            })
            .collect();
        for delta in &deltas {
            debug!("Fabric connectivity change: {delta}");
        }
        if !deltas.is_empty() {
            self.recompute_reachability();
        }
        deltas
    }

    fn fabric_status(&self) -> FabricStatus {
        let endpoints = self.connectivity.connectivity().clone();
        let ports: Vec<PortId> = endpoints.keys().copied().collect();
        let mapping = self
            .state
            .settings()
            .switch_ids
            .values()
            .next()
            .and_then(|info| self.platforms.get(info.asic).ok());
        let groups = self
            .connectivity
            .virtual_device_to_remote_connection_groups(|port| {
                mapping.and_then(|m| m.virtual_device_of(port))
            });
        FabricStatus {
            mismatched: ports
                .iter()
                .copied()
                .filter(|p| self.connectivity.is_connectivity_info_mismatch(*p))
                .collect(),
            missing: ports
                .iter()
                .copied()
                .filter(|p| self.connectivity.is_connectivity_info_missing(*p))
                .collect(),
            unreachable: self
                .reachability
                .unreachable_nodes()
                .into_iter()
                .map(|(id, name)| (id, name.to_owned()))
                .collect(),
            asymmetric_virtual_devices:
                FabricConnectivityManager::virtual_devices_with_asymmetric_connectivity(&groups),
            endpoints,
        }
    }

    fn handle(&mut self, msg: UpdateMsg) {
        match msg {
            UpdateMsg::Update(update, reply_to) => {
                let name = update.name().to_owned();
                let result = self.run_update(update);
                match reply_to {
                    Some(reply_to) => reply("update", reply_to, result),
                    None => {
                        if let Err(e) = result {
                            warn!("Update '{name}' failed: {e}");
                        }
                    }
                }
            }
            UpdateMsg::ApplyConfig(config, reply_to) => {
                let result = self.apply_config(&config);
                if let Err(e) = &result {
                    error!("Configuration rejected: {e}");
                }
                reply("configure", reply_to, result);
            }
            UpdateMsg::FabricSamples(samples, reply_to) => {
                let deltas = self.fabric_samples(samples);
                reply("fabric samples", reply_to, Ok(deltas));
            }
            UpdateMsg::FabricStatus(reply_to) => {
                reply("fabric status", reply_to, Ok(self.fabric_status()));
            }
            UpdateMsg::AddObserver(observer) => {
                debug!("Registering state observer {}", observer.name());
                self.observers.push(observer);
            }
            UpdateMsg::Finish => {
                info!("Got request to shutdown. Au revoir ...");
                self.run = false;
            }
        }
    }

    fn run(mut self) {
        info!("Update serializer started");
        while self.run {
            match self.rx.blocking_recv() {
                Some(msg) => self.handle(msg),
                None => {
                    warn!("Control channel closed");
                    self.run = false;
                }
            }
        }
        info!("Update serializer stopped");
    }
}

/// Update scheduler for the contexts that must not block on the serializer
#[derive(Clone)]
pub struct UpdateQueue(UnboundedSender<UpdateMsg>);

impl UpdateScheduler for UpdateQueue {
    fn schedule(&self, update: StateUpdate) -> Result<(), StateError> {
        let name = update.name().to_owned();
        self.0
            .send(UpdateMsg::Update(update, None))
            .map_err(|_| StateError::SchedulerGone(name))
    }
}

/// An object to send requests to the update serializer
#[derive(Clone)]
pub struct AgentCtlSender {
    tx: UnboundedSender<UpdateMsg>,
    ctx: StateContext,
}

impl AgentCtlSender {
    async fn request<T>(
        &self,
        msg: impl FnOnce(Reply<T>) -> UpdateMsg,
        recv_error: &'static str,
    ) -> Result<T, AgentError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(msg(reply_tx))
            .map_err(|_| AgentError::NotRunning)?;
        reply_rx
            .await
            .map_err(|_| AgentError::Internal(recv_error))?
    }

    /// Run a state update on the serializer. Returns whether the state changed.
    pub async fn update(&self, update: StateUpdate) -> Result<bool, AgentError> {
        debug!("Requesting update '{}'...", update.name());
        self.request(
            |tx| UpdateMsg::Update(update, Some(tx)),
            "Failed to receive update reply",
        )
        .await
    }

    pub async fn apply_config(&self, config: SwitchConfig) -> Result<bool, AgentError> {
        debug!("Requesting to apply config...");
        self.request(
            |tx| UpdateMsg::ApplyConfig(Box::new(config), tx),
            "Failed to receive configure reply",
        )
        .await
    }

    pub async fn learn_neighbor(&self, event: NeighborEvent) -> Result<bool, AgentError> {
        let ctx = self.ctx;
        self.update(StateUpdate::new("learn neighbor", move |state| {
            learn_neighbor(state, ctx, &event)
        }))
        .await
    }

    pub async fn flush_neighbor(
        &self,
        interface: InterfaceId,
        ip: IpAddr,
    ) -> Result<bool, AgentError> {
        let ctx = self.ctx;
        self.update(StateUpdate::new("flush neighbor", move |state| {
            flush_neighbor(state, ctx, interface, ip)
        }))
        .await
    }

    pub async fn set_port_oper_state(
        &self,
        port: PortId,
        oper_state: OperState,
    ) -> Result<bool, AgentError> {
        self.update(StateUpdate::new("port oper state", move |state| {
            set_port_oper_state(state, port, oper_state)
        }))
        .await
    }

    /// Feed the fabric link partners reported by the hardware
    pub async fn fabric_samples(
        &self,
        samples: Vec<(PortId, FabricEndpoint)>,
    ) -> Result<Vec<FabricConnectivityDelta>, AgentError> {
        self.request(
            |tx| UpdateMsg::FabricSamples(samples, tx),
            "Failed to receive fabric samples reply",
        )
        .await
    }

    pub async fn fabric_status(&self) -> Result<FabricStatus, AgentError> {
        self.request(UpdateMsg::FabricStatus, "Failed to receive fabric status reply")
            .await
    }

    pub fn add_observer(&self, observer: Box<dyn StateObserver>) -> Result<(), AgentError> {
        self.tx
            .send(UpdateMsg::AddObserver(observer))
            .map_err(|_| AgentError::NotRunning)
    }
}

pub struct SwSwitch {
    reader: SwitchStateReader,
    ctl: AgentCtlSender,
    dsf_sessions: Option<DsfSessions>,
    published: watch::Receiver<PublishedState>,
    hw_counters: Arc<HwCallCounters>,
    handle: Option<JoinHandle<()>>,
}

impl SwSwitch {
    /// Start the update serializer. Remote state is only subscribed to if a `transport` is given;
    /// the tasks of the subscriptions run on `runtime`.
    pub fn start(
        params: AgentParams,
        transport: Option<Arc<dyn StateTransport>>,
        runtime: Handle,
    ) -> Result<Self, AgentError> {
        info!("Starting switch agent\n{params}");
        let state = Arc::new(SwitchState::new());
        state.publish();
        let reader = SwitchStateReader(Arc::new(ArcSwap::new(state.clone())));
        let (tx, rx) = unbounded_channel();

        let hwprog = LoggingHwProgrammer::new();
        let hw_counters = hwprog.counters();
        let publisher = StatePublisher::new();
        let published = publisher.subscribe();
        let mut observers: Vec<Box<dyn StateObserver>> = vec![Box::new(hwprog)];
        let mut dsf_sessions = None;
        if let Some(transport) = transport {
            let scheduler: Arc<dyn UpdateScheduler> = Arc::new(UpdateQueue(tx.clone()));
            let subscriber = DsfSubscriber::new(params.dsf.clone(), transport, scheduler, runtime);
            dsf_sessions = Some(subscriber.sessions());
            observers.push(Box::new(subscriber));
        }
        observers.push(Box::new(publisher));

        let serializer = Serializer {
            state,
            reader: reader.clone(),
            rib: RoutingInformationBase::new(),
            connectivity: FabricConnectivityManager::new(params.platforms.clone()),
            reachability: FabricReachabilityManager::new(),
            platforms: params.platforms.clone(),
            observers,
            rx,
            run: true,
        };
        let handle = std::thread::Builder::new()
            .name(format!("{}-updates", params.name))
            .spawn(move || serializer.run())
            .map_err(|_| AgentError::Internal("Failed to spawn update serializer"))?;

        Ok(Self {
            reader,
            ctl: AgentCtlSender {
                tx,
                ctx: params.context,
            },
            dsf_sessions,
            published,
            hw_counters,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn reader(&self) -> SwitchStateReader {
        self.reader.clone()
    }

    #[must_use]
    pub fn ctl(&self) -> AgentCtlSender {
        self.ctl.clone()
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<dyn UpdateScheduler> {
        Arc::new(UpdateQueue(self.ctl.tx.clone()))
    }

    #[must_use]
    pub fn dsf_sessions(&self) -> Option<DsfSessions> {
        self.dsf_sessions.clone()
    }

    /// Feed of what this switch publishes to the other nodes of the fabric
    #[must_use]
    pub fn published(&self) -> watch::Receiver<PublishedState> {
        self.published.clone()
    }

    #[must_use]
    pub fn hw_counters(&self) -> Arc<HwCallCounters> {
        self.hw_counters.clone()
    }

    /// Stop the update serializer and wait for it to finish
    pub fn stop(&mut self) -> Result<(), AgentError> {
        let Some(handle) = self.handle.take() else {
            return Err(AgentError::NotRunning);
        };
        self.ctl
            .tx
            .send(UpdateMsg::Finish)
            .map_err(|_| AgentError::Internal("Failed to send finish request"))?;
        handle
            .join()
            .map_err(|_| AgentError::Internal("Failed to join update serializer"))
    }
}

impl Drop for SwSwitch {
    fn drop(&mut self) {
        if self.handle.is_some()
            && let Err(e) = self.stop()
        {
            error!("Failed to stop switch agent: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AgentParamsBuilder;
    use pretty_assertions::assert_eq;
    use state::{Interface, LivenessStatus, Port, RemoteAttrs, RemoteEntryType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver(Arc<AtomicUsize>);

    impl StateObserver for CountingObserver {
        fn name(&self) -> &str {
            "counter"
        }
        fn state_updated(&mut self, delta: &StateDelta) {
            let changes = delta.ports_delta().iter().count();
            self.0.fetch_add(changes, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_updates_are_serialized() {
        let params = AgentParamsBuilder::default().build().unwrap();
        let mut agent = SwSwitch::start(params, None, Handle::current()).unwrap();
        let ctl = agent.ctl();
        let seen = Arc::new(AtomicUsize::new(0));
        ctl.add_observer(Box::new(CountingObserver(seen.clone())))
            .unwrap();

        let add_port = |id: u32| {
            StateUpdate::new("add port", move |current| {
                let mut next = current.clone();
                SwitchState::modify(&mut next)
                    .ports_mut()
                    .add_node(Port::new(PortId(id), &format!("eth{id}")))?;
                Ok(Some(next))
            })
        };
        assert!(ctl.update(add_port(1)).await.unwrap());
        assert!(ctl.update(add_port(2)).await.unwrap());

        // rejected updates leave the state alone
        let err = ctl.update(add_port(1)).await.unwrap_err();
        assert!(matches!(err, AgentError::Rejected { .. }));

        let state = agent.reader().current();
        assert_eq!(state.generation(), 2);
        assert_eq!(state.ports().len(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(agent.hw_counters().snapshot().added >= 2);

        // no-op
        assert!(!ctl.update(StateUpdate::new("noop", |_| Ok(None))).await.unwrap());
        assert_eq!(agent.reader().current().generation(), 2);

        agent.stop().unwrap();
        assert_eq!(
            ctl.update(add_port(3)).await.unwrap_err(),
            AgentError::NotRunning
        );
    }

    #[test]
    fn test_remote_interface_routes_skip_stale() {
        let mac = mac_address::MacAddress::new([2, 0, 0, 0, 0, 1]);
        let mut state = Arc::new(SwitchState::new());
        {
            let remote = SwitchState::modify(&mut state).remote_interfaces_mut();
            let mut live = Interface::new(InterfaceId(101), RouterId::DEFAULT, "live", mac);
            live.addresses.insert("10.1.0.1".parse().unwrap(), 24);
            live.remote = Some(RemoteAttrs::dynamic_live());
            let mut stale = Interface::new(InterfaceId(102), RouterId::DEFAULT, "stale", mac);
            stale.addresses.insert("10.2.0.1".parse().unwrap(), 24);
            stale.remote = Some(RemoteAttrs {
                kind: RemoteEntryType::Dynamic,
                liveness: LivenessStatus::Stale,
            });
            remote.add_or_update_node(live);
            remote.add_or_update_node(stale);
        }
        let routes = remote_interface_routes(&state);
        assert_eq!(routes.len(), 1);
        assert_eq!(
            routes[&RouterId::DEFAULT],
            vec![InterfaceRoute {
                interface: InterfaceId(101),
                addr: "10.1.0.1".parse().unwrap(),
                len: 24,
            }]
        );
    }
}
