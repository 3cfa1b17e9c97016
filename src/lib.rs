// ============================================================================
// txstack Library
// ============================================================================

pub mod coordinator;
pub mod core;
pub mod policy;
pub mod resource;

// Re-export main types for convenience
pub use coordinator::{ContextId, Propagation, TransactionContext, TransactionCoordinator};
pub use self::core::{Result, TxError};
pub use policy::{Categorize, FailureCategory, RollbackPolicy, TxOutcome};
pub use resource::{MemoryResource, ResourceHandle, ResourceOp, TransactionResource};

use thiserror::Error;
use tracing::debug;

// ============================================================================
// High-level Scoped Execution
// ============================================================================

/// Failure surfaced by scoped execution
#[derive(Error, Debug)]
pub enum ScopeError<E> {
    /// The unit of work failed. The outcome configured for its failure
    /// category has already been applied to the transaction.
    #[error("unit of work failed: {0}")]
    Work(E),

    /// A coordinator or resource operation failed. This includes
    /// [`TxError::UnexpectedRollback`] when an inner participant silently
    /// forced a rollback of a scope that tried to commit cleanly.
    #[error(transparent)]
    Transaction(#[from] TxError),
}

/// Nested scopes compose: a work closure can propagate an inner scope's
/// failure with `?` and the enclosing scope still reaches a policy decision.
impl<E: Categorize> Categorize for ScopeError<E> {
    fn category(&self) -> FailureCategory {
        match self {
            ScopeError::Work(err) => err.category(),
            ScopeError::Transaction(err) => err.category(),
        }
    }
}

/// Scoped transactional execution
///
/// The explicit equivalent of declarative method-level transactions: a unit
/// of work runs between `begin` and a guaranteed `commit` or `rollback`,
/// with the outcome on failure decided by a [`RollbackPolicy`] rather than
/// hard-coded rules. The coordinator is passed explicitly, never looked up
/// from ambient thread-local state.
///
/// # Examples
///
/// ```
/// use txstack::{MemoryResource, Propagation, TransactionCoordinator, TransactionScope, TxError};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut coordinator = TransactionCoordinator::new(MemoryResource::new());
/// let scope = TransactionScope::new(Propagation::Required);
///
/// let value = scope.execute(&mut coordinator, |coord| {
///     let handle = coord.active_handle().ok_or(TxError::IllegalState(
///         "no active transaction".into(),
///     ))?;
///     coord.resource_mut().write(handle, "order:1")?;
///     Ok::<_, TxError>(42)
/// })?;
///
/// assert_eq!(value, 42);
/// assert!(!coordinator.is_transaction_active());
/// assert!(coordinator.resource().contains("order:1"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionScope {
    propagation: Propagation,
    policy: RollbackPolicy,
}

impl TransactionScope {
    /// Create a scope with the given propagation and the default policy
    pub fn new(propagation: Propagation) -> Self {
        Self {
            propagation,
            policy: RollbackPolicy::default(),
        }
    }

    /// Replace the default failure-outcome table
    pub fn policy(mut self, policy: RollbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run a unit of work inside a transaction scope.
    ///
    /// On success the scope commits. On a work error the policy decides
    /// whether the scope commits or rolls back, and the work error is
    /// re-surfaced as [`ScopeError::Work`]. A coordinator failure while
    /// ending the scope takes precedence and surfaces as
    /// [`ScopeError::Transaction`].
    pub fn execute<R, T, E, F>(
        &self,
        coordinator: &mut TransactionCoordinator<R>,
        work: F,
    ) -> std::result::Result<T, ScopeError<E>>
    where
        R: TransactionResource,
        E: Categorize,
        F: FnOnce(&mut TransactionCoordinator<R>) -> std::result::Result<T, E>,
    {
        let ctx = coordinator.begin(self.propagation)?;

        match work(coordinator) {
            Ok(value) => {
                coordinator.commit(ctx)?;
                Ok(value)
            }
            Err(err) => {
                let outcome = self.policy.outcome_for(err.category());
                debug!(ctx = %ctx, ?outcome, "unit of work failed");
                match outcome {
                    TxOutcome::Rollback => coordinator.rollback(ctx)?,
                    TxOutcome::Commit => coordinator.commit(ctx)?,
                }
                Err(ScopeError::Work(err))
            }
        }
    }
}
