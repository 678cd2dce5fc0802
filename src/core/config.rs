// ============================================================================
// central-state - Configuration
// Policies a store applies where behaviour is a deliberate choice
// ============================================================================

use serde::{Deserialize, Serialize};

/// How an observer or listener with no trigger keys reacts to a non-forced
/// mutation. Forced passes (`reset`) ignore trigger sets entirely.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyTriggerPolicy {
    /// Never auto-triggered by key changes.
    #[default]
    NeverMatch,
    /// Triggered by every mutation.
    AlwaysMatch,
}

/// What happens to a mutation issued from inside a running dispatch pass
/// (from a veto hook, a listener, or a refresh callback).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentrancyPolicy {
    /// Append to a FIFO; each queued mutation runs its own full pass after
    /// the current one completes.
    #[default]
    Queue,
    /// Fail with [`StoreError::ReentrantMutation`](crate::StoreError::ReentrantMutation).
    Reject,
}

/// Store configuration.
///
/// # Example
///
/// ```
/// use central_state::{EmptyTriggerPolicy, StoreConfig};
///
/// let config: StoreConfig =
///     serde_json::from_str(r#"{ "empty_triggers": "always_match" }"#).unwrap();
/// assert_eq!(config.empty_triggers, EmptyTriggerPolicy::AlwaysMatch);
/// assert!(!config.notify_on_reset);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub empty_triggers: EmptyTriggerPolicy,
    pub reentrancy: ReentrancyPolicy,
    /// Notify every listener with the pre-reset snapshot on `reset`.
    pub notify_on_reset: bool,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_empty_triggers(mut self, policy: EmptyTriggerPolicy) -> Self {
        self.empty_triggers = policy;
        self
    }

    pub fn with_reentrancy(mut self, policy: ReentrancyPolicy) -> Self {
        self.reentrancy = policy;
        self
    }

    pub fn with_notify_on_reset(mut self, notify: bool) -> Self {
        self.notify_on_reset = notify;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
