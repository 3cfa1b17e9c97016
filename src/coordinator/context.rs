// ============================================================================
// Transaction Context
// ============================================================================

use crate::resource::ResourceHandle;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global context ID counter
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle for one logical transaction scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn new() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx_{}", self.0)
    }
}

/// How a logical scope relates to an already-running physical transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    /// Join the active physical transaction, or start one if none is active.
    Required,

    /// Always start an independent physical transaction, suspending any
    /// active one until this scope completes.
    RequiresNew,
}

impl std::fmt::Display for Propagation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Propagation::Required => write!(f, "REQUIRED"),
            Propagation::RequiresNew => write!(f, "REQUIRES_NEW"),
        }
    }
}

/// Physical state parked while a REQUIRES_NEW scope runs
///
/// Restored when the scope that did the suspending completes. The
/// rollback-only flag travels with the physical transaction it belongs to,
/// so an independent inner transaction never contaminates the outer one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SuspendedTx {
    pub handle: ResourceHandle,
    pub rollback_only: bool,
}

/// One logical transaction scope
///
/// Created by `begin`, lives on the coordinator stack until its matching
/// `commit` or `rollback`. The enclosing scope, if any, sits directly below
/// it on the stack.
#[derive(Debug)]
pub struct TransactionContext {
    id: ContextId,
    propagation: Propagation,
    is_new: bool,
    suspended: Option<SuspendedTx>,
}

impl TransactionContext {
    pub(crate) fn new(
        propagation: Propagation,
        is_new: bool,
        suspended: Option<SuspendedTx>,
    ) -> Self {
        Self {
            id: ContextId::new(),
            propagation,
            is_new,
            suspended,
        }
    }

    /// Get the context ID
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Get the propagation this scope was begun with
    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// True if this scope started its own physical transaction
    ///
    /// A REQUIRED scope that joined an existing physical transaction is not
    /// new; its commit and rollback are purely logical.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) fn take_suspended(&mut self) -> Option<SuspendedTx> {
        self.suspended.take()
    }
}
