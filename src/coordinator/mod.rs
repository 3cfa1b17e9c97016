// ============================================================================
// Transaction Coordination Module
// ============================================================================
//
// Logical transaction scopes stacked over one physical resource:
// - REQUIRED joins the active physical transaction or starts one
// - REQUIRES_NEW suspends the active transaction and runs independently
// - rollback of a joined scope marks the shared transaction rollback-only
//
// ============================================================================

pub mod context;
pub mod manager;

pub use context::{ContextId, Propagation, TransactionContext};
pub use manager::TransactionCoordinator;
