// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Helpers shared by the tests of this crate

use state::{StateError, StateUpdate, UpdateScheduler};
use std::time::Duration;
use tokio::sync::mpsc;

/// Scheduler handing the queued updates to the test instead of applying them
pub(crate) struct QueueScheduler(pub(crate) mpsc::UnboundedSender<StateUpdate>);

impl UpdateScheduler for QueueScheduler {
    fn schedule(&self, update: StateUpdate) -> Result<(), StateError> {
        self.0
            .send(update)
            .map_err(|e| StateError::SchedulerGone(e.to_string()))
    }
}

pub(crate) async fn next_update(rx: &mut mpsc::UnboundedReceiver<StateUpdate>) -> StateUpdate {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
}
