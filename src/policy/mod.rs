// ============================================================================
// Rollback Policy
// ============================================================================
//
// Maps failure categories to a transaction outcome. The coordinator itself
// is agnostic to why a commit or rollback was requested; only scoped
// execution consults this table when a unit of work fails.
//
// ============================================================================

use crate::core::TxError;
use std::collections::HashMap;

/// Broad classification of a failure escaping a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Unrecoverable failure: bugs, infrastructure loss, invariant breaks.
    System,

    /// Expected business failure the caller is meant to handle.
    Business,
}

/// What scoped execution does with the transaction when work fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Commit,
    Rollback,
}

/// Implemented by error types that participate in outcome decisions
pub trait Categorize {
    fn category(&self) -> FailureCategory;
}

/// Coordinator and resource failures are never business outcomes.
impl Categorize for TxError {
    fn category(&self) -> FailureCategory {
        FailureCategory::System
    }
}

/// Caller-supplied table from failure category to transaction outcome
///
/// The default mirrors the common convention: system failures roll back,
/// business failures commit. Both directions can be overridden per category,
/// the way a declarative `rollback_for` attribute would.
///
/// # Examples
///
/// ```
/// use txstack::{FailureCategory, RollbackPolicy, TxOutcome};
///
/// let policy = RollbackPolicy::new().rollback_on(FailureCategory::Business);
/// assert_eq!(
///     policy.outcome_for(FailureCategory::Business),
///     TxOutcome::Rollback
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RollbackPolicy {
    outcomes: HashMap<FailureCategory, TxOutcome>,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackPolicy {
    pub fn new() -> Self {
        let mut outcomes = HashMap::new();
        outcomes.insert(FailureCategory::System, TxOutcome::Rollback);
        outcomes.insert(FailureCategory::Business, TxOutcome::Commit);
        Self { outcomes }
    }

    /// Roll back when a failure of this category escapes the scope
    pub fn rollback_on(mut self, category: FailureCategory) -> Self {
        self.outcomes.insert(category, TxOutcome::Rollback);
        self
    }

    /// Commit when a failure of this category escapes the scope
    pub fn commit_on(mut self, category: FailureCategory) -> Self {
        self.outcomes.insert(category, TxOutcome::Commit);
        self
    }

    /// Look up the configured outcome for a failure category
    pub fn outcome_for(&self, category: FailureCategory) -> TxOutcome {
        self.outcomes
            .get(&category)
            .copied()
            .unwrap_or(TxOutcome::Rollback)
    }
}
