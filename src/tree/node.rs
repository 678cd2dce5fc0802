// ============================================================================
// central-state - Update Tree
// Arena of observer nodes with parent/child links and dirty propagation
// ============================================================================
//
// Nodes live in a generational arena and refer to each other by `NodeId`,
// so the bidirectional parent/child links never form ownership cycles.
//
// Both walks (`prepare_update`, `flush_update`) are depth-first pre-order
// and stop descending at the first node that commits to refreshing. They are
// driven by an explicit work stack and only borrow the arena for the
// duration of a single node visit: veto hooks and refresh callbacks run with
// no borrow held, so an observer may re-enter the store (begin/finish its
// own update, register children, detach nodes) from inside a walk.
//
// A node that was detached or released by such a callback before the walk
// reaches it is skipped.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::core::config::EmptyTriggerPolicy;
use crate::core::error::{Result, StoreError};
use crate::core::keys::{subscribes_to, TriggerSet};
use crate::core::types::{NodeId, Observer, State, UpdateDecision};

// =============================================================================
// TREE NODE
// =============================================================================

/// One observer's position in the tree.
struct TreeNode {
    /// `None` only for the root sentinel.
    observer: Option<Rc<dyn Observer>>,
    triggers: TriggerSet,
    pending: bool,
    is_root: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    fn root() -> Self {
        Self {
            observer: None,
            triggers: TriggerSet::new(),
            pending: false,
            is_root: true,
            parent: None,
            children: Vec::new(),
        }
    }

    fn detached(observer: Rc<dyn Observer>, triggers: TriggerSet) -> Self {
        Self {
            observer: Some(observer),
            triggers,
            pending: false,
            is_root: false,
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<TreeNode>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&TreeNode> {
        self.get(id).ok_or(StoreError::UnknownNode { node: id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode> {
        self.get_mut(id).ok_or(StoreError::UnknownNode { node: id })
    }

    fn insert(&mut self, node: TreeNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    fn remove(&mut self, id: NodeId) -> Option<TreeNode> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        Some(node)
    }

    /// Unlink `child` from whatever parent it has. Returns the old parent.
    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.get_mut(child)?.parent.take()?;
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        Some(parent)
    }
}

// =============================================================================
// WALK STEPS
// =============================================================================

/// A queued visit. `via` is the parent the node was reached through; the
/// visit is dropped if the node no longer hangs off it.
#[derive(Clone, Copy)]
struct Visit {
    node: NodeId,
    via: Option<NodeId>,
}

enum Step {
    Skip,
    Candidate(Rc<dyn Observer>),
    Refresh(Rc<dyn Observer>),
    Descend(Vec<NodeId>),
}

fn push_children(work: &mut Vec<Visit>, parent: NodeId, children: &[NodeId]) {
    // Reversed so the first child is popped first.
    work.extend(children.iter().rev().map(|&node| Visit {
        node,
        via: Some(parent),
    }));
}

// =============================================================================
// UPDATE TREE
// =============================================================================

/// The tree of observer nodes owned by one store.
///
/// The root sentinel is created with the tree and lives as long as it does.
pub struct UpdateTree {
    arena: RefCell<Arena>,
    root: NodeId,
}

impl UpdateTree {
    pub fn new() -> Self {
        let mut arena = Arena::default();
        let root = arena.insert(TreeNode::root());
        Self {
            arena: RefCell::new(arena),
            root,
        }
    }

    /// The permanent root sentinel.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node for `observer`.
    pub fn insert(&self, observer: Rc<dyn Observer>, triggers: TriggerSet) -> NodeId {
        self.arena
            .borrow_mut()
            .insert(TreeNode::detached(observer, triggers))
    }

    /// Free a node's slot. The node is detached from its parent first and
    /// any children still attached to it become detached.
    pub fn release(&self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(StoreError::RootNode {
                operation: "release_component",
            });
        }
        let mut arena = self.arena.borrow_mut();
        arena.node(id)?;
        arena.unlink(id);
        if let Some(node) = arena.remove(id) {
            for child in node.children {
                if let Some(c) = arena.get_mut(child) {
                    c.parent = None;
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.borrow().get(id).is_some()
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.arena.borrow().slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn observer(&self, id: NodeId) -> Result<Option<Rc<dyn Observer>>> {
        Ok(self.arena.borrow().node(id)?.observer.clone())
    }

    pub fn triggers(&self, id: NodeId) -> Result<TriggerSet> {
        Ok(self.arena.borrow().node(id)?.triggers.clone())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.arena.borrow().node(id)?.parent)
    }

    /// Child at `index` in attachment order, `None` when out of range.
    pub fn child(&self, id: NodeId, index: usize) -> Result<Option<NodeId>> {
        Ok(self.arena.borrow().node(id)?.children.get(index).copied())
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.arena.borrow().node(id)?.children.clone())
    }

    pub fn is_pending(&self, id: NodeId) -> Result<bool> {
        Ok(self.arena.borrow().node(id)?.pending)
    }

    #[cfg(test)]
    pub(crate) fn is_root(&self, id: NodeId) -> Result<bool> {
        Ok(self.arena.borrow().node(id)?.is_root)
    }

    /// The node entered an update pass on its own: drop any stale mark.
    pub fn on_update(&self, id: NodeId) -> Result<()> {
        self.arena.borrow_mut().node_mut(id)?.pending = false;
        Ok(())
    }

    /// Attach `child` under `parent`, keeping attachment order.
    ///
    /// Idempotent: a child already under `parent` is left where it is. A
    /// child attached elsewhere is moved.
    pub fn ensure_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if child == self.root {
            return Err(StoreError::RootNode {
                operation: "ensure_child",
            });
        }
        let mut arena = self.arena.borrow_mut();
        arena.node(parent)?;
        let current = arena.node(child)?.parent;
        if current == Some(parent) {
            return Ok(());
        }
        arena.unlink(child);
        arena.node_mut(child)?.parent = Some(parent);
        let siblings = &mut arena.node_mut(parent)?.children;
        if !siblings.contains(&child) {
            siblings.push(child);
        }
        Ok(())
    }

    /// Remove `child` from `parent`'s children and clear its parent link.
    ///
    /// The link is cleared even if `child` was not under `parent`; if it
    /// hung off some other node it is unlinked from there as well.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        let mut arena = self.arena.borrow_mut();
        arena.node(child)?;
        arena.node_mut(parent)?.children.retain(|&c| c != child);
        arena.unlink(child);
        Ok(child)
    }

    /// Detach `id` from its parent, if it has one.
    pub fn detach(&self, id: NodeId) -> Result<Option<NodeId>> {
        let parent = self.parent(id)?;
        if let Some(parent) = parent {
            self.remove_child(parent, id)?;
        }
        Ok(parent)
    }

    // =========================================================================
    // DIRTY PROPAGATION
    // =========================================================================

    /// Mark the subtree roots under `from` that must refresh.
    ///
    /// A non-root node is marked pending when `force` is set or its triggers
    /// match `triggered`, unless its observer answers
    /// [`UpdateDecision::Skip`] for `prev_state`. A marked node's children are
    /// not visited; an unmatched or vetoed node's children are.
    ///
    /// Returns the number of nodes marked.
    pub fn prepare_update(
        &self,
        from: NodeId,
        triggered: &TriggerSet,
        force: bool,
        prev_state: &State,
        policy: EmptyTriggerPolicy,
    ) -> usize {
        let mut marked = 0;
        let mut work = vec![Visit {
            node: from,
            via: None,
        }];

        while let Some(visit) = work.pop() {
            let step = self.with_visit(visit, |node| {
                if !node.is_root && (force || subscribes_to(&node.triggers, triggered, policy)) {
                    match node.observer.clone() {
                        Some(observer) => Step::Candidate(observer),
                        None => Step::Descend(node.children.clone()),
                    }
                } else {
                    Step::Descend(node.children.clone())
                }
            });

            match step {
                Step::Candidate(observer) => {
                    if observer.should_update(prev_state) == UpdateDecision::Proceed {
                        if let Some(node) = self.arena.borrow_mut().get_mut(visit.node) {
                            node.pending = true;
                            marked += 1;
                            trace!(node = %visit.node, "marked pending");
                        }
                    } else {
                        trace!(node = %visit.node, "update vetoed");
                        if let Ok(children) = self.children(visit.node) {
                            push_children(&mut work, visit.node, &children);
                        }
                    }
                }
                Step::Descend(children) => push_children(&mut work, visit.node, &children),
                Step::Skip | Step::Refresh(_) => {}
            }
        }

        marked
    }

    /// Invoke `refresh` on every pending node under `from`, without
    /// descending below a refreshed node.
    ///
    /// A node's mark is cleared just before its `refresh` runs. A mark
    /// already cleared through [`on_update`](Self::on_update) since the
    /// marking walk makes the flush descend instead.
    ///
    /// Returns the number of refreshes invoked.
    pub fn flush_update(&self, from: NodeId) -> usize {
        let mut refreshed = 0;
        let mut work = vec![Visit {
            node: from,
            via: None,
        }];

        while let Some(visit) = work.pop() {
            let step = self.with_visit(visit, |node| match (&node.observer, node.pending) {
                (Some(observer), true) => Step::Refresh(observer.clone()),
                _ => Step::Descend(node.children.clone()),
            });

            match step {
                Step::Refresh(observer) => {
                    if let Some(node) = self.arena.borrow_mut().get_mut(visit.node) {
                        node.pending = false;
                    }
                    trace!(node = %visit.node, "refreshing");
                    observer.refresh();
                    refreshed += 1;
                }
                Step::Descend(children) => push_children(&mut work, visit.node, &children),
                Step::Skip | Step::Candidate(_) => {}
            }
        }

        refreshed
    }

    /// Run `f` on the visited node while it is still where the walk expects
    /// it. The arena borrow ends before the returned step is acted on.
    fn with_visit(&self, visit: Visit, f: impl FnOnce(&TreeNode) -> Step) -> Step {
        let arena = self.arena.borrow();
        match arena.get(visit.node) {
            Some(node) if visit.via.is_none() || node.parent == visit.via => f(node),
            _ => Step::Skip,
        }
    }
}

impl Default for UpdateTree {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
