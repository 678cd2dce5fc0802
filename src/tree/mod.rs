// ============================================================================
// central-state - Tree Module
// The observer update tree and the construction stack that shapes it
// ============================================================================

pub mod node;
pub mod stack;

pub use node::UpdateTree;
pub use stack::UpdateStack;
