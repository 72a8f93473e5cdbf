// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Hardware programming stand-in. It walks every state delta the way an ASIC driver would and
//! logs the calls it would make.

use state::{
    DeltaEntry, ForwardingInfoBase, Interface, MapDelta, Node, StateDelta, StateObserver, Vlan,
    for_each_changed,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Number of hardware calls made so far
#[derive(Debug, Default)]
pub struct HwCallCounters {
    added: AtomicU64,
    changed: AtomicU64,
    removed: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HwCallCount {
    pub added: u64,
    pub changed: u64,
    pub removed: u64,
}

impl HwCallCounters {
    #[must_use]
    pub fn snapshot(&self) -> HwCallCount {
        HwCallCount {
            added: self.added.load(Ordering::Relaxed),
            changed: self.changed.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoggingHwProgrammer {
    counters: Arc<HwCallCounters>,
}

impl LoggingHwProgrammer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn counters(&self) -> Arc<HwCallCounters> {
        self.counters.clone()
    }

    fn program<N: Node>(&self, delta: MapDelta<'_, N>) {
        let counters = &self.counters;
        for_each_changed(
            &delta,
            |_, new| {
                trace!("hw: update {} {}", N::KIND, new.key());
                counters.changed.fetch_add(1, Ordering::Relaxed);
            },
            |new| {
                trace!("hw: create {} {}", N::KIND, new.key());
                counters.added.fetch_add(1, Ordering::Relaxed);
            },
            |old| {
                trace!("hw: delete {} {}", N::KIND, old.key());
                counters.removed.fetch_add(1, Ordering::Relaxed);
            },
        );
    }

    fn program_vlan(&self, entry: DeltaEntry<'_, Vlan>) {
        self.program(entry.nested(Vlan::arp_table));
        self.program(entry.nested(Vlan::ndp_table));
    }

    fn program_interface(&self, entry: DeltaEntry<'_, Interface>) {
        self.program(entry.nested(Interface::arp_table));
        self.program(entry.nested(Interface::ndp_table));
    }

    fn program_fib(&self, entry: DeltaEntry<'_, ForwardingInfoBase>) {
        self.program(entry.nested(ForwardingInfoBase::v4));
        self.program(entry.nested(ForwardingInfoBase::v6));
    }
}

impl StateObserver for LoggingHwProgrammer {
    fn name(&self) -> &str {
        "hw programmer"
    }

    fn state_updated(&mut self, delta: &StateDelta) {
        debug!(
            "Programming generation {} -> {}",
            delta.old_state().generation(),
            delta.new_state().generation()
        );
        if delta.settings_delta().is_changed() {
            debug!("hw: switch settings changed");
        }
        self.program(delta.ports_delta());
        self.program(delta.system_ports_delta());
        self.program(delta.remote_system_ports_delta());

        // neighbors are programmed after the interfaces they are resolved on
        let vlans = delta.vlans_delta();
        self.program(vlans);
        vlans.iter().for_each(|e| self.program_vlan(e));
        for intfs in [delta.interfaces_delta(), delta.remote_interfaces_delta()] {
            self.program(intfs);
            intfs.iter().for_each(|e| self.program_interface(e));
        }

        self.program(delta.dsf_nodes_delta());
        self.program(delta.acls_delta());
        self.program(delta.mirrors_delta());

        let fibs = delta.fibs_delta();
        self.program(fibs);
        fibs.iter().for_each(|e| self.program_fib(e));
    }
}
