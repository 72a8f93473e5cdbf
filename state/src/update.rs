// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! State update requests and the observers of state changes

use crate::delta::StateDelta;
use crate::errors::StateError;
use crate::switch_state::SwitchState;
use std::fmt::Debug;
use std::sync::Arc;

/// Function run by the update serializer. It receives the current (published) state and returns
/// a new one, or `None` if nothing needs to change.
pub type UpdateFn =
    Box<dyn FnOnce(&Arc<SwitchState>) -> Result<Option<Arc<SwitchState>>, StateError> + Send>;

/// A named state update
pub struct StateUpdate {
    name: String,
    func: UpdateFn,
}

impl StateUpdate {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: FnOnce(&Arc<SwitchState>) -> Result<Option<Arc<SwitchState>>, StateError>
            + Send
            + 'static,
    {
        Self {
            name: name.to_owned(),
            func: Box::new(func),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the update against `current`
    pub fn apply(self, current: &Arc<SwitchState>) -> Result<Option<Arc<SwitchState>>, StateError> {
        (self.func)(current)
    }
}

impl Debug for StateUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateUpdate").field("name", &self.name).finish()
    }
}

/// Queue of the single writer of the state. Other contexts never mutate the state, they hand
/// update functions to a scheduler.
pub trait UpdateScheduler: Send + Sync {
    fn schedule(&self, update: StateUpdate) -> Result<(), StateError>;
}

/// Consumer of state changes. Observers are called on the update serializer, after a new
/// state has been published, in registration order.
pub trait StateObserver: Send {
    fn name(&self) -> &str;
    fn state_updated(&mut self, delta: &StateDelta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PortId;
    use crate::node::Publishable;
    use crate::port::Port;

    #[test]
    fn test_state_update_apply() {
        let current = Arc::new(SwitchState::new());
        current.publish();
        let update = StateUpdate::new("add port", |state| {
            let mut next = state.clone();
            SwitchState::modify(&mut next)
                .ports_mut()
                .add_node(Port::new(PortId(1), "eth1"))?;
            Ok(Some(next))
        });
        assert_eq!(update.name(), "add port");
        let next = update.apply(&current).unwrap().unwrap();
        assert!(current.ports().is_empty());
        assert_eq!(next.ports().len(), 1);

        let noop = StateUpdate::new("noop", |_| Ok(None));
        assert!(noop.apply(&current).unwrap().is_none());
    }
}
