// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Keyed nodes and the ordered maps holding them

use crate::errors::StateError;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

/// Marks a node as immutable. The flag is not part of a node's value: it is ignored by
/// equality, and clones always start unpublished.
#[derive(Debug, Default)]
pub struct PublishFlag(AtomicBool);

impl PublishFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn publish(&self) {
        self.0.store(true, Ordering::Release);
    }
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mutating a published node is a contract violation and is fatal.
    ///
    /// # Panics
    /// If the flag is set.
    pub fn assert_mutable(&self, what: &str) {
        if self.is_published() {
            error!("Attempted to mutate published {what}");
            panic!("Attempted to mutate published {what}");
        }
    }
}

impl Clone for PublishFlag {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl PartialEq for PublishFlag {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Anything in the state tree that can be published
pub trait Publishable {
    fn publish_flag(&self) -> &PublishFlag;

    /// Publish this object and everything it owns
    fn publish(&self) {
        self.publish_flag().publish();
    }

    fn is_published(&self) -> bool {
        self.publish_flag().is_published()
    }
}

/// A keyed entry of a [`NodeMap`]
pub trait Node: Publishable + Clone + PartialEq + Debug + Send + Sync + 'static {
    type Key: Ord + Clone + Debug + Display + Send + Sync;
    const KIND: &'static str;

    fn key(&self) -> Self::Key;
}

/// Return a mutable reference to the object behind `child`, cloning it first if it is published
/// or shared with another tree.
pub(crate) fn cow<T: Publishable + Clone>(child: &mut Arc<T>) -> &mut T {
    if child.is_published() {
        *child = Arc::new(T::clone(child));
    }
    Arc::make_mut(child)
}

/// Ordered map of nodes. Nodes are shared by reference between versions of the state
/// until modified.
#[derive(Clone, PartialEq)]
pub struct NodeMap<N: Node> {
    nodes: BTreeMap<N::Key, Arc<N>>,
    flag: PublishFlag,
}

impl<N: Node> Default for NodeMap<N> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            flag: PublishFlag::new(),
        }
    }
}

impl<N: Node> Debug for NodeMap<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.nodes.iter()).finish()
    }
}

impl<N: Node> Publishable for NodeMap<N> {
    fn publish_flag(&self) -> &PublishFlag {
        &self.flag
    }
    fn publish(&self) {
        for node in self.nodes.values() {
            node.publish();
        }
        self.flag.publish();
    }
}

impl<N: Node> NodeMap<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &N::Key) -> Option<&Arc<N>> {
        self.nodes.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &N::Key) -> bool {
        self.nodes.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate in key order
    pub fn iter(&self) -> btree_map::Iter<'_, N::Key, Arc<N>> {
        self.nodes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &N::Key> {
        self.nodes.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<N>> {
        self.nodes.values()
    }

    /// Add a node whose key is not in the map yet
    pub fn add_node(&mut self, node: N) -> Result<(), StateError> {
        self.flag.assert_mutable(N::KIND);
        let key = node.key();
        match self.nodes.entry(key) {
            btree_map::Entry::Occupied(e) => Err(StateError::Duplicate {
                what: N::KIND,
                key: e.key().to_string(),
            }),
            btree_map::Entry::Vacant(e) => {
                e.insert(Arc::new(node));
                Ok(())
            }
        }
    }

    /// Replace an existing node
    pub fn update_node(&mut self, node: N) -> Result<Arc<N>, StateError> {
        self.flag.assert_mutable(N::KIND);
        let key = node.key();
        match self.nodes.get_mut(&key) {
            Some(slot) => Ok(std::mem::replace(slot, Arc::new(node))),
            None => Err(StateError::NotFound {
                what: N::KIND,
                key: key.to_string(),
            }),
        }
    }

    /// Insert or replace a node, returning the previous one
    pub fn add_or_update_node(&mut self, node: N) -> Option<Arc<N>> {
        self.flag.assert_mutable(N::KIND);
        self.nodes.insert(node.key(), Arc::new(node))
    }

    /// Insert an already shared node
    pub fn add_or_update_shared(&mut self, node: Arc<N>) -> Option<Arc<N>> {
        self.flag.assert_mutable(N::KIND);
        self.nodes.insert(node.key(), node)
    }

    pub fn remove_node(&mut self, key: &N::Key) -> Result<Arc<N>, StateError> {
        self.flag.assert_mutable(N::KIND);
        self.nodes.remove(key).ok_or_else(|| StateError::NotFound {
            what: N::KIND,
            key: key.to_string(),
        })
    }

    /// Get a mutable node, cloning it first if it is published or shared
    pub fn modify_node(&mut self, key: &N::Key) -> Option<&mut N> {
        self.flag.assert_mutable(N::KIND);
        self.nodes.get_mut(key).map(cow)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&N::Key, &Arc<N>) -> bool,
    {
        self.flag.assert_mutable(N::KIND);
        self.nodes.retain(|k, v| keep(k, v));
    }

    pub fn clear(&mut self) {
        self.flag.assert_mutable(N::KIND);
        self.nodes.clear();
    }
}

impl<N: Node> FromIterator<N> for NodeMap<N> {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().map(|n| (n.key(), Arc::new(n))).collect(),
            flag: PublishFlag::new(),
        }
    }
}

impl<'a, N: Node> IntoIterator for &'a NodeMap<N> {
    type Item = (&'a N::Key, &'a Arc<N>);
    type IntoIter = btree_map::Iter<'a, N::Key, Arc<N>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
