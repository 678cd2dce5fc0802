// ============================================================================
// central-state - Type Definitions
// State map, node handles, and the observer capability interface
// ============================================================================

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

// =============================================================================
// STATE
// =============================================================================

/// The application state: string keys to arbitrary JSON values.
pub type State = Map<String, Value>;

/// A partial state merged into the store by `set_partial`.
///
/// Same shape as [`State`]; every key of the patch counts as triggered.
pub type Patch = State;

// =============================================================================
// NODE HANDLES
// =============================================================================

/// Stable handle to a node in a store's update tree.
///
/// Handles are generational: once a node is released its slot may be reused,
/// and the old handle is rejected instead of silently addressing the new
/// occupant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

// =============================================================================
// OBSERVER
// =============================================================================

/// Answer of an observer asked whether it wants to refresh for a mutation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum UpdateDecision {
    /// Let the refresh happen (the default when an observer has no opinion).
    #[default]
    Proceed,
    /// Veto the refresh; the walk continues into the node's children.
    Skip,
}

/// Capability interface the binding layer implements for every observer it
/// registers with a store.
///
/// Only [`refresh`](Observer::refresh) is mandatory. Callbacks run with no
/// store borrows held, so they may call back into the store (the binding's
/// `begin_update`/`finish_update` calls, reads, new listeners).
pub trait Observer {
    /// Re-derive this observer from the current state.
    fn refresh(&self);

    /// Veto hook consulted while marking. Receives the state as it was
    /// before the mutation being dispatched.
    fn should_update(&self, _prev_state: &State) -> UpdateDecision {
        UpdateDecision::Proceed
    }
}

impl<F> Observer for F
where
    F: Fn(),
{
    fn refresh(&self) {
        self()
    }
}

// =============================================================================
// LISTENERS
// =============================================================================

/// Flat, key-triggered callback. Receives the pre-mutation snapshot; the new
/// state is readable through the store.
pub type Listener = Rc<dyn Fn(&State)>;

/// Identity comparison for listeners (data pointer only, vtables ignored).
pub fn same_listener(a: &Listener, b: &Listener) -> bool {
    let a_ptr = Rc::as_ptr(a) as *const ();
    let b_ptr = Rc::as_ptr(b) as *const ();
    a_ptr == b_ptr
}

// =============================================================================
// TESTS
// =============================================================================
