// ============================================================================
// central-state - Construction Stack
// Mirror of the binding layer's nested construction/update calls
// ============================================================================
//
// The root sentinel sits at SENTINEL_INDEX for the lifetime of the stack.
// `begin_*` pushes a node; `finish_*` removes it again and reports the entry
// directly below it, which is the node's parent in the tree.
// ============================================================================

use crate::core::constants::SENTINEL_INDEX;
use crate::core::error::{Result, StoreError};
use crate::core::types::NodeId;

/// Ordered sequence of in-progress nodes, never empty.
#[derive(Debug, Clone)]
pub struct UpdateStack {
    entries: Vec<NodeId>,
}

impl UpdateStack {
    pub fn new(root: NodeId) -> Self {
        Self {
            entries: vec![root],
        }
    }

    pub fn push(&mut self, node: NodeId) {
        self.entries.push(node);
    }

    /// Remove `node` and return the entry that was directly below it.
    ///
    /// The innermost occurrence is removed when a node is on the stack more
    /// than once. Fails with [`StoreError::NotOnStack`] if the node is absent
    /// or is the sentinel.
    pub fn finish(&mut self, node: NodeId) -> Result<NodeId> {
        let index = self.position(node)?;
        self.entries.remove(index);
        Ok(self.entries[index - 1])
    }

    /// The entry directly below the innermost occurrence of `node`, without
    /// removing anything.
    pub fn below(&self, node: NodeId) -> Result<NodeId> {
        let index = self.position(node)?;
        Ok(self.entries[index - 1])
    }

    fn position(&self, node: NodeId) -> Result<usize> {
        match self.entries.iter().rposition(|&entry| entry == node) {
            Some(index) if index > SENTINEL_INDEX => Ok(index),
            _ => Err(StoreError::NotOnStack { node }),
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries[SENTINEL_INDEX + 1..].contains(&node)
    }

    /// Number of entries, sentinel included.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn top(&self) -> NodeId {
        self.entries[self.entries.len() - 1]
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[NodeId] {
        &self.entries
    }
}

// =============================================================================
// TESTS
// =============================================================================
