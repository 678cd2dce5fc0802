// ============================================================================
// central-state - Store Registry
// Descriptor-keyed stores, created lazily on first declaration
// ============================================================================
//
// The registry is an explicit object owned by whoever assembles the
// application and handed to its participants. Stores are never removed: a
// declared store lives as long as the registry.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::core::config::StoreConfig;
use crate::core::constants::DEFAULT_DESCRIPTOR;
use crate::store::state_store::Store;

/// Maps descriptors to independent stores.
///
/// # Example
///
/// ```
/// use central_state::Registry;
/// use std::rc::Rc;
///
/// let registry = Registry::new();
/// assert!(registry.get("todos").is_none());
///
/// let a = registry.declare("todos");
/// let b = registry.declare("todos");
/// assert!(Rc::ptr_eq(&a, &b));
/// assert!(registry.get("todos").is_some());
/// ```
#[derive(Default)]
pub struct Registry {
    config: StoreConfig,
    stores: RefCell<HashMap<String, Rc<Store>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose stores are all created with `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            stores: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The store for `descriptor`, created on first use.
    pub fn declare(&self, descriptor: &str) -> Rc<Store> {
        if let Some(store) = self.get(descriptor) {
            return store;
        }
        debug!(descriptor, "declared store");
        let store = Rc::new(Store::with_config(self.config));
        self.stores
            .borrow_mut()
            .insert(descriptor.to_owned(), store.clone());
        store
    }

    /// The store for [`DEFAULT_DESCRIPTOR`], created on first use.
    pub fn default_store(&self) -> Rc<Store> {
        self.declare(DEFAULT_DESCRIPTOR)
    }

    /// The store for `descriptor`, if it was declared.
    pub fn get(&self, descriptor: &str) -> Option<Rc<Store>> {
        self.stores.borrow().get(descriptor).cloned()
    }

    /// Declared descriptors, sorted.
    pub fn descriptors(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.stores.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.borrow().is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
