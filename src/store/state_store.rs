// ============================================================================
// central-state - Store
// The state map, its observer tree, and the mutation dispatch pipeline
// ============================================================================
//
// Every mutation runs one dispatch pass, in this fixed order:
//
//   1. merge      - the patch is applied; the pre-merge snapshot is kept
//   2. mark       - the tree is walked, marking subtree roots pending
//   3. notify     - flat listeners subscribed to the keys get the snapshot
//   4. flush      - pending nodes are refreshed, depth-first
//
// `reset` runs the same pass with a cleared map, a forced mark and (by
// default) no notification step.
//
// Callbacks run re-entrantly with no store borrow held. A mutation issued
// from inside a pass is queued or rejected according to `ReentrancyPolicy`.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::config::{ReentrancyPolicy, StoreConfig};
use crate::core::error::{Result, StoreError};
use crate::core::keys::{trigger_set, triggered_keys, TriggerSet};
use crate::core::types::{Listener, NodeId, Observer, Patch, State};
use crate::store::listeners::ListenerList;
use crate::tree::{UpdateStack, UpdateTree};

enum Mutation {
    Merge(Patch),
    Reset,
}

/// Clears the dispatch flag when a pass ends, including by panic. Anything
/// still queued at that point belonged to the aborted pass and is dropped.
struct DispatchGuard<'a> {
    store: &'a Store,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.store.dispatching.set(false);
        self.store.queued.borrow_mut().clear();
    }
}

// =============================================================================
// STORE
// =============================================================================

/// A central key/value state with a tree of observers and a flat list of
/// key-triggered listeners.
///
/// # Example
///
/// ```
/// use central_state::{patch, Store};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let store = Store::new();
/// let seen = Rc::new(Cell::new(0));
///
/// let counter = seen.clone();
/// store.listen(move |_prev| counter.set(counter.get() + 1), ["todos"]);
///
/// store.set_partial(patch! { "todos" => ["write docs"] }).unwrap();
/// store.set_partial(patch! { "filter" => "all" }).unwrap();
///
/// assert_eq!(seen.get(), 1);
/// assert_eq!(store.get("filter"), Some(serde_json::json!("all")));
/// ```
pub struct Store {
    config: StoreConfig,
    state: RefCell<State>,
    tree: UpdateTree,
    stack: RefCell<UpdateStack>,
    listeners: RefCell<ListenerList>,
    dispatching: Cell<bool>,
    queued: RefCell<VecDeque<Mutation>>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let tree = UpdateTree::new();
        let stack = UpdateStack::new(tree.root());
        Self {
            config,
            state: RefCell::new(State::new()),
            tree,
            stack: RefCell::new(stack),
            listeners: RefCell::new(ListenerList::new()),
            dispatching: Cell::new(false),
            queued: RefCell::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Current value of `key` (cloned).
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.borrow().get(key).cloned()
    }

    /// Snapshot of the whole state.
    pub fn state(&self) -> State {
        self.state.borrow().clone()
    }

    /// Access the state without cloning.
    ///
    /// The state stays borrowed while `f` runs: a mutation issued from
    /// inside it fails with [`StoreError::StateBorrowed`].
    pub fn with_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Whether a dispatch pass is currently running.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Merge `patch` into the state (patch keys overwrite) and dispatch the
    /// change to the tree and to subscribed listeners.
    pub fn set_partial(&self, patch: Patch) -> Result<()> {
        self.submit(Mutation::Merge(patch))
    }

    /// Clear every key and force-refresh the tree. Listeners are only
    /// notified when `notify_on_reset` is configured.
    pub fn reset(&self) -> Result<()> {
        self.submit(Mutation::Reset)
    }

    fn submit(&self, mutation: Mutation) -> Result<()> {
        if self.dispatching.get() {
            return match self.config.reentrancy {
                ReentrancyPolicy::Queue => {
                    debug!(queued = self.queued.borrow().len() + 1, "queued re-entrant mutation");
                    self.queued.borrow_mut().push_back(mutation);
                    Ok(())
                }
                ReentrancyPolicy::Reject => {
                    warn!("rejected re-entrant mutation");
                    Err(StoreError::ReentrantMutation)
                }
            };
        }

        if self.state.try_borrow_mut().is_err() {
            warn!("mutation issued while the state is borrowed");
            return Err(StoreError::StateBorrowed);
        }

        self.dispatching.set(true);
        let _guard = DispatchGuard { store: self };

        self.apply(mutation);
        loop {
            let next = self.queued.borrow_mut().pop_front();
            match next {
                Some(mutation) => self.apply(mutation),
                None => break,
            }
        }
        Ok(())
    }

    fn apply(&self, mutation: Mutation) {
        match mutation {
            Mutation::Merge(patch) => self.apply_merge(patch),
            Mutation::Reset => self.apply_reset(),
        }
    }

    fn apply_merge(&self, patch: Patch) {
        let triggered = triggered_keys(&patch);
        let prev_state = self.state.borrow().clone();
        self.state.borrow_mut().extend(patch);

        let root = self.tree.root();
        let policy = self.config.empty_triggers;
        let marked = self
            .tree
            .prepare_update(root, &triggered, false, &prev_state, policy);

        let listeners = self.listeners.borrow().matching(&triggered, policy);
        let notified = listeners.len();
        for listener in listeners {
            listener(&prev_state);
        }

        let refreshed = self.tree.flush_update(root);
        debug!(keys = ?triggered, marked, notified, refreshed, "applied partial state");
    }

    fn apply_reset(&self) {
        let prev_state = std::mem::take(&mut *self.state.borrow_mut());

        let root = self.tree.root();
        let marked = self.tree.prepare_update(
            root,
            &TriggerSet::new(),
            true,
            &prev_state,
            self.config.empty_triggers,
        );

        let mut notified = 0;
        if self.config.notify_on_reset {
            let listeners = self.listeners.borrow().all();
            notified = listeners.len();
            for listener in listeners {
                listener(&prev_state);
            }
        }

        let refreshed = self.tree.flush_update(root);
        debug!(cleared = prev_state.len(), marked, notified, refreshed, "reset state");
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Register `callback` to be called with the pre-mutation snapshot
    /// whenever a mutation touches one of `triggers`.
    ///
    /// The same callback may be registered more than once.
    pub fn add_listener<I, S>(&self, callback: Listener, triggers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let triggers = trigger_set(triggers);
        trace!(keys = ?triggers, "listener added");
        self.listeners.borrow_mut().add(callback, triggers);
    }

    /// Wrap `f` as a [`Listener`], register it, and return the handle needed
    /// to remove it later.
    pub fn listen<I, S>(&self, f: impl Fn(&State) + 'static, triggers: I) -> Listener
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let listener: Listener = Rc::new(f);
        self.add_listener(listener.clone(), triggers);
        listener
    }

    /// Remove the first registration of `callback`. Unknown callbacks are
    /// ignored; returns whether anything was removed.
    pub fn remove_listener(&self, callback: &Listener) -> bool {
        self.listeners.borrow_mut().remove(callback)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    // =========================================================================
    // OBSERVER TREE
    // =========================================================================

    /// Allocate a detached node for `observer`. It joins the tree when its
    /// first construction pass finishes.
    pub fn register_component<I, S>(&self, observer: Rc<dyn Observer>, triggers: I) -> NodeId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let triggers = trigger_set(triggers);
        let node = self.tree.insert(observer, triggers);
        debug!(%node, "registered component");
        node
    }

    /// Detach `node` from its parent. The node stays allocated and can be
    /// attached again by a later construction pass.
    pub fn unregister_component(&self, node: NodeId) -> Result<()> {
        let parent = self.tree.detach(node)?;
        debug!(%node, parent = ?parent, "unregistered component");
        Ok(())
    }

    /// Detach and free `node`. Children still attached to it are detached;
    /// the handle is stale afterwards.
    ///
    /// A node still between a begin and a finish call is refused with
    /// [`StoreError::InProgress`]; finish its pass first.
    pub fn release_component(&self, node: NodeId) -> Result<()> {
        if self.is_in_progress(node) {
            warn!(%node, "release of a node still on the construction stack");
            return Err(StoreError::InProgress { node });
        }
        self.tree.release(node)?;
        debug!(%node, "released component");
        Ok(())
    }

    /// Alias of [`begin_update`](Self::begin_update) for a node's first pass.
    pub fn begin_construction(&self, node: NodeId) -> Result<()> {
        self.begin_update(node)
    }

    /// `node` is entering a construction or refresh pass: clear its pending
    /// mark and push it on the construction stack.
    pub fn begin_update(&self, node: NodeId) -> Result<()> {
        self.tree.on_update(node)?;
        self.stack.borrow_mut().push(node);
        trace!(%node, depth = self.stack_depth(), "begin update");
        Ok(())
    }

    /// `node` finished its first pass: attach it under the entry directly
    /// below it on the stack and pop it. If the attach fails the stack is
    /// left as it was.
    pub fn finish_construction(&self, node: NodeId) -> Result<()> {
        let below = self.stack.borrow().below(node);
        let parent = below
            .inspect_err(|err| warn!(%node, %err, "construction stack misuse"))?;
        self.tree.ensure_child(parent, node)?;
        self.pop(node, "finish_construction")?;
        trace!(%node, %parent, "finish construction");
        Ok(())
    }

    /// `node` finished a refresh pass: pop it. The tree shape is unchanged.
    pub fn finish_update(&self, node: NodeId) -> Result<()> {
        self.pop(node, "finish_update")?;
        trace!(%node, "finish update");
        Ok(())
    }

    fn pop(&self, node: NodeId, operation: &'static str) -> Result<NodeId> {
        let finished = self.stack.borrow_mut().finish(node);
        finished.inspect_err(|err| warn!(%node, operation, %err, "construction stack misuse"))
    }

    // =========================================================================
    // TREE ACCESSORS
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub(crate) fn tree(&self) -> &UpdateTree {
        &self.tree
    }

    /// The observer owning `node`; `None` for the root.
    pub fn observer(&self, node: NodeId) -> Result<Option<Rc<dyn Observer>>> {
        self.tree.observer(node)
    }

    pub fn triggers(&self, node: NodeId) -> Result<TriggerSet> {
        self.tree.triggers(node)
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.tree.parent(node)
    }

    pub fn child(&self, node: NodeId, index: usize) -> Result<Option<NodeId>> {
        self.tree.child(node, index)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.tree.children(node)
    }

    pub fn is_pending(&self, node: NodeId) -> Result<bool> {
        self.tree.is_pending(node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.tree.contains(node)
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Construction stack depth, root sentinel included.
    pub fn stack_depth(&self) -> usize {
        self.stack.borrow().depth()
    }

    /// Whether `node` is currently between a begin and a finish call.
    pub fn is_in_progress(&self, node: NodeId) -> bool {
        self.stack.borrow().contains(node)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EmptyTriggerPolicy;
    use crate::core::types::UpdateDecision;
    use crate::patch;
    use serde_json::json;

    /// Observer counting refreshes, optionally vetoing.
    #[derive(Default)]
    struct Counter {
        refreshes: Cell<usize>,
        veto: Cell<bool>,
        seen_prev: RefCell<Option<State>>,
    }

    impl Observer for Counter {
        fn refresh(&self) {
            self.refreshes.set(self.refreshes.get() + 1);
        }

        fn should_update(&self, prev_state: &State) -> UpdateDecision {
            *self.seen_prev.borrow_mut() = Some(prev_state.clone());
            if self.veto.get() {
                UpdateDecision::Skip
            } else {
                UpdateDecision::Proceed
            }
        }
    }

    /// Register and construct `observer` under `parent` (which must already
    /// be on the stack, or be the root).
    fn mount(store: &Store, observer: Rc<Counter>, keys: &[&str]) -> NodeId {
        let node = store.register_component(observer, keys.iter().copied());
        store.begin_construction(node).unwrap();
        store.finish_construction(node).unwrap();
        node
    }

    #[test]
    fn merge_keeps_existing_keys_and_last_write_wins() {
        let store = Store::new();
        store.set_partial(patch! { "a" => 1 }).unwrap();
        store.set_partial(patch! { "b" => 2 }).unwrap();
        assert_eq!(store.get("a"), Some(json!(1)));
        assert_eq!(store.get("b"), Some(json!(2)));

        store.set_partial(patch! { "a" => 3 }).unwrap();
        assert_eq!(store.get("a"), Some(json!(3)));
        assert_eq!(store.state().len(), 2);
    }

    #[test]
    fn matching_node_is_refreshed_once() {
        let store = Store::new();
        let counter = Rc::new(Counter::default());
        let node = mount(&store, counter.clone(), &["a"]);

        store.set_partial(patch! { "b" => 1 }).unwrap();
        assert_eq!(counter.refreshes.get(), 0);
        assert!(!store.is_pending(node).unwrap());

        store.set_partial(patch! { "a" => 1 }).unwrap();
        assert_eq!(counter.refreshes.get(), 1);
        assert!(!store.is_pending(node).unwrap());
    }

    #[test]
    fn closure_observer_is_not_refreshed_by_unrelated_keys() {
        let store = Store::new();
        let hits = Rc::new(Cell::new(0));
        let node = {
            let hits = hits.clone();
            store.register_component(Rc::new(move || hits.set(hits.get() + 1)), ["a"])
        };
        store.begin_construction(node).unwrap();
        store.finish_construction(node).unwrap();

        store.set_partial(patch! { "a" => 1 }).unwrap();
        store.set_partial(patch! { "b" => 1 }).unwrap();
        store.set_partial(patch! { "c" => 1 }).unwrap();

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn veto_receives_pre_merge_state() {
        let store = Store::new();
        store.set_partial(patch! { "a" => "old" }).unwrap();

        let counter = Rc::new(Counter::default());
        counter.veto.set(true);
        let node = mount(&store, counter.clone(), &["a"]);

        store.set_partial(patch! { "a" => "new" }).unwrap();
        assert_eq!(counter.refreshes.get(), 0);
        assert!(!store.is_pending(node).unwrap());

        let prev = counter.seen_prev.borrow().clone().unwrap();
        assert_eq!(prev.get("a"), Some(&json!("old")));
    }

    #[test]
    fn reset_clears_state_and_forces_marks() {
        let store = Store::new();
        let counter = Rc::new(Counter::default());
        let node = mount(&store, counter.clone(), &[]);
        store.set_partial(patch! { "a" => 1, "b" => 2 }).unwrap();
        assert_eq!(counter.refreshes.get(), 0);

        store.reset().unwrap();
        assert!(store.state().is_empty());
        assert!(!store.is_pending(node).unwrap());
        assert_eq!(counter.refreshes.get(), 1);

        let prev = counter.seen_prev.borrow().clone().unwrap();
        assert_eq!(prev.len(), 2);
    }

    #[test]
    fn empty_triggers_always_match_when_configured() {
        let store =
            Store::with_config(StoreConfig::new().with_empty_triggers(EmptyTriggerPolicy::AlwaysMatch));
        let counter = Rc::new(Counter::default());
        mount(&store, counter.clone(), &[]);

        store.set_partial(patch! { "anything" => true }).unwrap();
        assert_eq!(counter.refreshes.get(), 1);
    }

    #[test]
    fn begin_update_clears_pending() {
        let store = Store::new();
        let counter = Rc::new(Counter::default());
        let node = mount(&store, counter.clone(), &["a"]);

        // Mark without flushing, as a pass would before its flush step.
        store.tree().prepare_update(
            store.root(),
            &trigger_set(["a"]),
            false,
            &State::new(),
            EmptyTriggerPolicy::NeverMatch,
        );
        assert!(store.is_pending(node).unwrap());

        store.begin_update(node).unwrap();
        assert!(!store.is_pending(node).unwrap());
        assert!(store.is_in_progress(node));
        store.finish_update(node).unwrap();
        assert!(!store.is_in_progress(node));
        assert_eq!(store.parent(node).unwrap(), Some(store.root()));
    }

    #[test]
    fn release_of_in_progress_node_is_refused() {
        let store = Store::new();
        let node = store.register_component(Rc::new(Counter::default()), ["a"]);
        store.begin_construction(node).unwrap();

        assert_eq!(
            store.release_component(node),
            Err(StoreError::InProgress { node })
        );
        assert!(store.contains(node));
        assert!(store.is_in_progress(node));

        store.finish_construction(node).unwrap();
        assert_eq!(store.parent(node).unwrap(), Some(store.root()));
        store.release_component(node).unwrap();
        assert!(!store.contains(node));

        // The stack is back to the sentinel, so new components attach at
        // the top level.
        let counter = Rc::new(Counter::default());
        let next = mount(&store, counter.clone(), &["a"]);
        assert_eq!(store.parent(next).unwrap(), Some(store.root()));
        assert_eq!(store.children(store.root()).unwrap(), vec![next]);
        store.set_partial(patch! { "a" => 1 }).unwrap();
        assert_eq!(counter.refreshes.get(), 1);
    }

    #[test]
    fn failed_attach_leaves_stack_untouched() {
        let store = Store::new();
        let outer = store.register_component(Rc::new(Counter::default()), ["a"]);
        let inner = store.register_component(Rc::new(Counter::default()), ["a"]);
        store.begin_construction(outer).unwrap();
        store.begin_construction(inner).unwrap();

        // Free the parent behind the store's back.
        store.tree().release(outer).unwrap();

        assert_eq!(
            store.finish_construction(inner),
            Err(StoreError::UnknownNode { node: outer })
        );
        assert_eq!(store.stack_depth(), 3);
        assert!(store.is_in_progress(inner));
        assert_eq!(store.parent(inner).unwrap(), None);

        store.finish_update(inner).unwrap();
        store.finish_update(outer).unwrap();
        assert_eq!(store.stack_depth(), 1);
    }

    #[test]
    fn mutation_inside_with_state_is_refused() {
        let store = Store::new();
        store.set_partial(patch! { "a" => 1 }).unwrap();

        let result = store.with_state(|state| {
            assert_eq!(state.get("a"), Some(&json!(1)));
            store.set_partial(patch! { "b" => 2 })
        });
        assert_eq!(result, Err(StoreError::StateBorrowed));
        assert_eq!(store.get("b"), None);
        assert!(!store.is_dispatching());

        store.set_partial(patch! { "b" => 2 }).unwrap();
        assert_eq!(store.get("b"), Some(json!(2)));
    }

    #[test]
    fn node_count_tracks_registration_and_release() {
        let store = Store::new();
        assert_eq!(store.node_count(), 1);

        let node = mount(&store, Rc::new(Counter::default()), &["a"]);
        assert_eq!(store.node_count(), 2);

        store.unregister_component(node).unwrap();
        assert_eq!(store.node_count(), 2);
        store.release_component(node).unwrap();
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn finish_without_begin_is_misuse() {
        let store = Store::new();
        let counter = Rc::new(Counter::default());
        let node = store.register_component(counter, ["a"]);

        assert_eq!(
            store.finish_construction(node),
            Err(StoreError::NotOnStack { node })
        );
        assert_eq!(store.finish_update(node), Err(StoreError::NotOnStack { node }));
        assert_eq!(
            store.finish_update(store.root()),
            Err(StoreError::NotOnStack { node: store.root() })
        );
        assert_eq!(store.parent(node).unwrap(), None);
    }

    #[test]
    fn nested_construction_discovers_parent() {
        let store = Store::new();
        let outer = store.register_component(Rc::new(Counter::default()), ["x"]);
        let inner = store.register_component(Rc::new(Counter::default()), ["x"]);

        store.begin_construction(outer).unwrap();
        store.begin_construction(inner).unwrap();
        assert_eq!(store.stack_depth(), 3);
        store.finish_construction(inner).unwrap();
        store.finish_construction(outer).unwrap();
        assert_eq!(store.stack_depth(), 1);

        assert_eq!(store.parent(outer).unwrap(), Some(store.root()));
        assert_eq!(store.parent(inner).unwrap(), Some(outer));
        assert_eq!(store.child(outer, 0).unwrap(), Some(inner));
        assert_eq!(store.children(store.root()).unwrap(), vec![outer]);
    }

    #[test]
    fn unregister_detaches_but_keeps_node() {
        let store = Store::new();
        let counter = Rc::new(Counter::default());
        let node = mount(&store, counter.clone(), &["a"]);

        store.unregister_component(node).unwrap();
        assert_eq!(store.parent(node).unwrap(), None);
        assert!(store.children(store.root()).unwrap().is_empty());
        assert!(store.contains(node));

        store.set_partial(patch! { "a" => 1 }).unwrap();
        assert_eq!(counter.refreshes.get(), 0);

        // Unregistering a detached node is harmless.
        store.unregister_component(node).unwrap();
    }

    #[test]
    fn released_node_is_unknown() {
        let store = Store::new();
        let node = mount(&store, Rc::new(Counter::default()), &["a"]);

        store.release_component(node).unwrap();
        assert!(!store.contains(node));
        assert_eq!(
            store.begin_update(node),
            Err(StoreError::UnknownNode { node })
        );
        assert_eq!(
            store.unregister_component(node),
            Err(StoreError::UnknownNode { node })
        );
        assert!(store.observer(store.root()).unwrap().is_none());
    }

    #[test]
    fn listeners_fire_between_mark_and_flush() {
        let store = Rc::new(Store::new());
        let counter = Rc::new(Counter::default());
        let node = mount(&store, counter.clone(), &["a"]);
        let observed = Rc::new(RefCell::new(Vec::new()));

        let listener = {
            let handle = store.clone();
            let counter = counter.clone();
            let observed = observed.clone();
            store.listen(
                move |prev| {
                    observed.borrow_mut().push((
                        prev.get("a").cloned(),
                        handle.get("a"),
                        handle.is_pending(node).unwrap(),
                        counter.refreshes.get(),
                    ));
                },
                ["a"],
            )
        };

        store.set_partial(patch! { "a" => 1 }).unwrap();
        assert_eq!(
            *observed.borrow(),
            vec![(None, Some(json!(1)), true, 0)]
        );
        assert_eq!(counter.refreshes.get(), 1);

        assert!(store.remove_listener(&listener));
        assert!(!store.remove_listener(&listener));
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn reset_notifies_only_when_configured() {
        let quiet = Store::new();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            quiet.listen(move |_| hits.set(hits.get() + 1), ["a"]);
        }
        quiet.set_partial(patch! { "a" => 1 }).unwrap();
        quiet.reset().unwrap();
        assert_eq!(hits.get(), 1);

        let loud = Store::with_config(StoreConfig::new().with_notify_on_reset(true));
        let snapshot = Rc::new(RefCell::new(None));
        {
            let snapshot = snapshot.clone();
            loud.listen(move |prev| *snapshot.borrow_mut() = Some(prev.clone()), ["unrelated"]);
        }
        loud.set_partial(patch! { "a" => 1 }).unwrap();
        assert!(snapshot.borrow().is_none());
        loud.reset().unwrap();
        assert_eq!(
            snapshot.borrow().as_ref().and_then(|s| s.get("a").cloned()),
            Some(json!(1))
        );
    }

    #[test]
    fn dispatch_flag_is_cleared_after_panic() {
        let store = Rc::new(Store::new());
        store.listen(|_| panic!("listener failure"), ["boom"]);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.set_partial(patch! { "boom" => 1 });
        }));
        assert!(result.is_err());
        assert!(!store.is_dispatching());

        // The merge had already applied before the listener ran.
        assert_eq!(store.get("boom"), Some(json!(1)));
        store.set_partial(patch! { "other" => 1 }).unwrap();
    }
}
