// ============================================================================
// central-state - Store Module
// Stores, their listeners, the descriptor registry, and plain handlers
// ============================================================================

pub mod handler;
pub mod listeners;
pub mod registry;
pub mod state_store;

pub use handler::StateHandler;
pub use listeners::{ListenerEntry, ListenerList};
pub use registry::Registry;
pub use state_store::Store;
