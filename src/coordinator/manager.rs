// ============================================================================
// Transaction Coordinator
// ============================================================================
//
// Manages a LIFO stack of logical transaction scopes over one physical
// resource. At most one physical transaction is active at a time per
// coordinator; REQUIRES_NEW suspends the active one, runs an independent
// transaction, and resumes the suspended one when the inner scope ends.
//
// The coordinator is owned by a single logical thread of control and is
// passed explicitly through call chains; there is no ambient "current
// transaction" lookup.
//
// ============================================================================

use super::context::{ContextId, Propagation, SuspendedTx, TransactionContext};
use crate::core::{Result, TxError};
use crate::resource::{ResourceHandle, TransactionResource};
use tracing::debug;

enum PhysicalEnd {
    Commit,
    Rollback,
}

/// Coordinator for nested logical transactions over one physical resource
pub struct TransactionCoordinator<R: TransactionResource> {
    resource: R,
    stack: Vec<TransactionContext>,
    active: Option<ResourceHandle>,
    rollback_only: bool,
}

impl<R: TransactionResource> TransactionCoordinator<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            stack: Vec::new(),
            active: None,
            rollback_only: false,
        }
    }

    /// Borrow the underlying resource
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Borrow the underlying resource mutably
    ///
    /// Work performed against the resource inside an active transaction uses
    /// the handle from [`active_handle`](Self::active_handle).
    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    /// Handle of the currently active physical transaction, if any
    pub fn active_handle(&self) -> Option<ResourceHandle> {
        self.active
    }

    /// True while a physical transaction is active
    pub fn is_transaction_active(&self) -> bool {
        self.active.is_some()
    }

    /// True once an inner participant has marked the active physical
    /// transaction rollback-only
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    /// Number of logical scopes currently open
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Look up an open scope by its handle
    pub fn context(&self, ctx: ContextId) -> Option<&TransactionContext> {
        self.stack.iter().find(|c| c.id() == ctx)
    }

    /// True if the given scope started its own physical transaction
    pub fn is_new_transaction(&self, ctx: ContextId) -> Result<bool> {
        self.context(ctx)
            .map(TransactionContext::is_new)
            .ok_or_else(|| TxError::IllegalState(format!("unknown transaction scope {ctx}")))
    }

    /// Open a logical transaction scope.
    ///
    /// REQUIRED joins the active physical transaction if there is one and
    /// starts one otherwise. REQUIRES_NEW suspends the active physical
    /// transaction and starts an independent one regardless of nesting.
    pub fn begin(&mut self, propagation: Propagation) -> Result<ContextId> {
        let context = match propagation {
            Propagation::RequiresNew => {
                let suspended = match self.active {
                    Some(handle) => {
                        self.resource.suspend(handle)?;
                        debug!(%handle, "suspended physical transaction");
                        Some(SuspendedTx {
                            handle,
                            rollback_only: self.rollback_only,
                        })
                    }
                    None => None,
                };

                let handle = match self.resource.begin() {
                    Ok(handle) => handle,
                    Err(err) => {
                        // Do not strand the suspended transaction.
                        if let Some(outer) = suspended {
                            let _ = self.resource.resume(outer.handle);
                        }
                        return Err(err);
                    }
                };

                self.active = Some(handle);
                self.rollback_only = false;
                TransactionContext::new(propagation, true, suspended)
            }
            Propagation::Required => match self.active {
                None => {
                    let handle = self.resource.begin()?;
                    self.active = Some(handle);
                    TransactionContext::new(propagation, true, None)
                }
                Some(_) => TransactionContext::new(propagation, false, None),
            },
        };

        let id = context.id();
        debug!(ctx = %id, %propagation, is_new = context.is_new(), "begin");
        self.stack.push(context);
        Ok(id)
    }

    /// Complete a logical scope successfully.
    ///
    /// For a joined scope this only pops the stack; the physical outcome is
    /// deferred to the enclosing scope. For a scope that started its own
    /// physical transaction, the transaction commits unless an inner
    /// participant marked it rollback-only, in which case it is rolled back
    /// and [`TxError::UnexpectedRollback`] is returned.
    pub fn commit(&mut self, ctx: ContextId) -> Result<()> {
        let mut context = self.pop_top(ctx, "commit")?;

        if !context.is_new() {
            debug!(ctx = %ctx, "logical commit, deferring to enclosing scope");
            return Ok(());
        }

        if self.rollback_only {
            debug!(ctx = %ctx, "commit requested on rollback-only transaction, rolling back");
            let ended = self.end_physical(PhysicalEnd::Rollback);
            let resumed = self.restore_suspended(&mut context);
            ended?;
            resumed?;
            return Err(TxError::UnexpectedRollback);
        }

        debug!(ctx = %ctx, "physical commit");
        let ended = self.end_physical(PhysicalEnd::Commit);
        let resumed = self.restore_suspended(&mut context);
        ended?;
        resumed
    }

    /// Abort a logical scope.
    ///
    /// A joined scope marks the shared physical transaction rollback-only;
    /// the eventual outermost commit then fails with
    /// [`TxError::UnexpectedRollback`]. A scope that started its own
    /// physical transaction rolls it back immediately.
    pub fn rollback(&mut self, ctx: ContextId) -> Result<()> {
        let mut context = self.pop_top(ctx, "roll back")?;

        if !context.is_new() {
            self.rollback_only = true;
            debug!(ctx = %ctx, "participating scope rolled back, transaction marked rollback-only");
            return Ok(());
        }

        debug!(ctx = %ctx, "physical rollback");
        let ended = self.end_physical(PhysicalEnd::Rollback);
        let resumed = self.restore_suspended(&mut context);
        ended?;
        resumed
    }

    /// Mark the active physical transaction rollback-only without ending
    /// any scope.
    ///
    /// The eventual outermost commit will fail with
    /// [`TxError::UnexpectedRollback`].
    pub fn set_rollback_only(&mut self) -> Result<()> {
        if self.active.is_none() {
            return Err(TxError::IllegalState(
                "cannot mark rollback-only: no transaction is active".into(),
            ));
        }

        self.rollback_only = true;
        debug!("transaction marked rollback-only");
        Ok(())
    }

    /// Pop the scope if and only if it is the innermost one.
    ///
    /// Ending a non-top scope is a programming error; the stack is left
    /// untouched in that case.
    fn pop_top(&mut self, ctx: ContextId, op: &str) -> Result<TransactionContext> {
        match self.stack.last().map(TransactionContext::id) {
            Some(top) if top == ctx => self.stack.pop().ok_or_else(|| {
                TxError::IllegalState(format!("cannot {op} {ctx}: scope already ended"))
            }),
            Some(top) => Err(TxError::IllegalState(format!(
                "cannot {op} {ctx}: it is not the innermost scope (innermost is {top})"
            ))),
            None => Err(TxError::IllegalState(format!(
                "cannot {op} {ctx}: no transaction scope is active"
            ))),
        }
    }

    /// End the active physical transaction.
    ///
    /// The coordinator state is unwound before the physical call, so the
    /// logical stack stays consistent even when the resource fails.
    fn end_physical(&mut self, how: PhysicalEnd) -> Result<()> {
        let handle = self.active.take().ok_or_else(|| {
            TxError::IllegalState("no physical transaction to end".into())
        })?;

        self.rollback_only = false;
        match how {
            PhysicalEnd::Commit => self.resource.commit(handle),
            PhysicalEnd::Rollback => self.resource.rollback(handle),
        }
    }

    /// Restore physical state suspended by a REQUIRES_NEW scope.
    ///
    /// The logical state (active handle, rollback-only flag) is restored
    /// even if the resource-level resume fails.
    fn restore_suspended(&mut self, context: &mut TransactionContext) -> Result<()> {
        let Some(outer) = context.take_suspended() else {
            return Ok(());
        };

        debug!(handle = %outer.handle, "resuming suspended physical transaction");
        self.active = Some(outer.handle);
        self.rollback_only = outer.rollback_only;
        self.resource.resume(outer.handle)
    }
}
