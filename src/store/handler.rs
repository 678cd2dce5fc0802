// ============================================================================
// central-state - State Handler
// A participant that reads, writes and listens without joining the tree
// ============================================================================

use std::rc::Rc;

use crate::core::constants::DEFAULT_DESCRIPTOR;
use crate::core::error::Result;
use crate::core::types::{Listener, Patch, State};
use crate::store::registry::Registry;
use crate::store::state_store::Store;

/// Non-visual participant bound to one store: services, controllers,
/// anything that mutates state or reacts to it through flat listeners.
///
/// # Example
///
/// ```
/// use central_state::{patch, Registry, StateHandler};
///
/// let registry = Registry::new();
/// let handler = StateHandler::new(&registry);
///
/// handler.set_central_state(patch! { "user" => "ada" }).unwrap();
/// assert_eq!(handler.central_state()["user"], "ada");
/// ```
#[derive(Clone)]
pub struct StateHandler {
    store: Rc<Store>,
}

impl StateHandler {
    /// Bind to the default store of `registry`.
    pub fn new(registry: &Registry) -> Self {
        Self::with_descriptor(registry, DEFAULT_DESCRIPTOR)
    }

    /// Bind to the store named `descriptor`, declaring it if needed.
    pub fn with_descriptor(registry: &Registry, descriptor: &str) -> Self {
        Self {
            store: registry.declare(descriptor),
        }
    }

    pub fn store(&self) -> &Rc<Store> {
        &self.store
    }

    pub fn central_state(&self) -> State {
        self.store.state()
    }

    pub fn set_central_state(&self, patch: Patch) -> Result<()> {
        self.store.set_partial(patch)
    }

    pub fn add_central_state_listener<I, S>(
        &self,
        callback: impl Fn(&State) + 'static,
        triggers: I,
    ) -> Listener
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store.listen(callback, triggers)
    }

    pub fn remove_central_state_listener(&self, callback: &Listener) -> bool {
        self.store.remove_listener(callback)
    }

    pub fn reset_state(&self) -> Result<()> {
        self.store.reset()
    }
}

// =============================================================================
// TESTS
// =============================================================================
