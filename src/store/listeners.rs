// ============================================================================
// central-state - Flat Listeners
// Insertion-ordered key-triggered callbacks, independent of the tree
// ============================================================================

use crate::core::config::EmptyTriggerPolicy;
use crate::core::keys::{subscribes_to, TriggerSet};
use crate::core::types::{same_listener, Listener};

/// A callback and the keys that fire it.
#[derive(Clone)]
pub struct ListenerEntry {
    pub callback: Listener,
    pub triggers: TriggerSet,
}

#[derive(Clone, Default)]
pub struct ListenerList {
    entries: Vec<ListenerEntry>,
}

impl ListenerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, callback: Listener, triggers: TriggerSet) {
        self.entries.push(ListenerEntry { callback, triggers });
    }

    /// Remove the first entry registered with `callback`. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, callback: &Listener) -> bool {
        match self
            .entries
            .iter()
            .position(|entry| same_listener(&entry.callback, callback))
        {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Callbacks subscribed to `triggered`, in registration order.
    ///
    /// Returned by value so the callbacks can run while the list itself is
    /// free to be modified.
    pub fn matching(&self, triggered: &TriggerSet, policy: EmptyTriggerPolicy) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|entry| subscribes_to(&entry.triggers, triggered, policy))
            .map(|entry| entry.callback.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Listener> {
        self.entries.iter().map(|entry| entry.callback.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
