// ============================================================================
// central-state - Core Module
// Fundamental types, key matching, errors, and configuration
// ============================================================================

pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod types;

// Re-export commonly used items
pub use config::{EmptyTriggerPolicy, ReentrancyPolicy, StoreConfig};
pub use constants::*;
pub use error::{Result, StoreError};
pub use keys::{intersects, trigger_set, triggered_keys, TriggerSet};
pub use types::{same_listener, Listener, NodeId, Observer, Patch, State, UpdateDecision};
