// ============================================================================
// central-state - Constants
// Well-known names and positions shared across the store
// ============================================================================

/// Descriptor used when a participant does not name a store explicitly.
pub const DEFAULT_DESCRIPTOR: &str = "default";

/// Position of the permanent root sentinel on the construction stack.
///
/// A node can only be finished from an index strictly above this one.
pub const SENTINEL_INDEX: usize = 0;

// =============================================================================
// TESTS
// =============================================================================
