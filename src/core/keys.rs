// ============================================================================
// central-state - Key Matching
// Trigger sets and the intersection test every dispatch decision rests on
// ============================================================================

use std::collections::BTreeSet;

use super::config::EmptyTriggerPolicy;
use super::types::State;

/// A set of state keys an observer or listener subscribes to.
pub type TriggerSet = BTreeSet<String>;

/// Build a [`TriggerSet`] from anything yielding string-like keys.
///
/// # Example
///
/// ```
/// use central_state::trigger_set;
///
/// let keys = trigger_set(["todos", "filter", "todos"]);
/// assert_eq!(keys.len(), 2);
/// ```
pub fn trigger_set<I, S>(keys: I) -> TriggerSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

/// The keys a patch touches.
pub fn triggered_keys(patch: &State) -> TriggerSet {
    patch.keys().cloned().collect()
}

/// True iff the two sets share at least one key.
///
/// An empty side never matches.
pub fn intersects(a: &TriggerSet, b: &TriggerSet) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|key| large.contains(key))
}

/// Whether a subscriber with `triggers` is hit by a non-forced mutation of
/// `triggered`, under the configured treatment of empty trigger sets.
pub(crate) fn subscribes_to(
    triggers: &TriggerSet,
    triggered: &TriggerSet,
    policy: EmptyTriggerPolicy,
) -> bool {
    if triggers.is_empty() {
        return policy == EmptyTriggerPolicy::AlwaysMatch;
    }
    intersects(triggers, triggered)
}

// =============================================================================
// TESTS
// =============================================================================
