// ============================================================================
// central-state - Central State with Hierarchical Change Propagation
// ============================================================================
//
// One mutable key/value store per descriptor, a tree of observers whose
// shape mirrors the live hierarchy of the host framework, and a dispatch
// pass that decides which subtree roots must refresh for a mutation.
//
// The host binding drives the tree through three calls per construction or
// refresh pass: `begin_construction`/`begin_update`, then
// `finish_construction` or `finish_update`.
// ============================================================================

mod macros;

pub mod core;
pub mod store;
pub mod tree;

pub use serde_json;
pub use serde_json::Value;

// Re-export core items at crate root for ergonomic access
pub use core::config::{EmptyTriggerPolicy, ReentrancyPolicy, StoreConfig};
pub use core::constants::{DEFAULT_DESCRIPTOR, SENTINEL_INDEX};
pub use core::error::{Result, StoreError};
pub use core::keys::{intersects, trigger_set, triggered_keys, TriggerSet};
pub use core::types::{same_listener, Listener, NodeId, Observer, Patch, State, UpdateDecision};

pub use store::{ListenerEntry, ListenerList, Registry, StateHandler, Store};
pub use tree::{UpdateStack, UpdateTree};

// =============================================================================
// TESTS
// =============================================================================
