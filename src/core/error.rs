// ============================================================================
// central-state - Errors
// Programming-error conditions surfaced synchronously to the caller
// ============================================================================

use thiserror::Error;

use super::types::NodeId;

/// Errors returned by store and tree operations.
///
/// Every variant is a contract violation by the caller (usually the binding
/// layer). None of them is raised because of state *content*: any value is
/// accepted into the state map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `finish_construction`/`finish_update` for a node that is not on the
    /// construction stack above the root sentinel.
    #[error("node not on stack: {node} was finished without a matching begin")]
    NotOnStack { node: NodeId },

    /// The handle does not address a live node of this store.
    #[error("unknown node: {node} was released or never registered")]
    UnknownNode { node: NodeId },

    /// The node is between a begin and a finish call and cannot be released
    /// until its pass ends.
    #[error("node in progress: {node} is still on the construction stack")]
    InProgress { node: NodeId },

    /// The root sentinel cannot be detached, released or attached elsewhere.
    #[error("the root node cannot be used in `{operation}`")]
    RootNode { operation: &'static str },

    /// A mutation was issued while a dispatch pass was running and the store
    /// rejects re-entrant mutations.
    #[error("re-entrant mutation rejected: a dispatch pass is already running")]
    ReentrantMutation,

    /// A mutation was issued while the state map was lent out through
    /// `with_state`.
    #[error("state borrowed: the store cannot be mutated from inside `with_state`")]
    StateBorrowed,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
