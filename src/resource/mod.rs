pub mod memory;

pub use memory::{MemoryResource, ResourceOp};

use crate::core::Result;

/// Identifier of one physical transaction on the underlying resource
///
/// Handles are opaque to the coordinator; only the resource that issued a
/// handle can interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub u64);

impl ResourceHandle {
    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "phys_{}", self.0)
    }
}

/// Physical transaction operations consumed by the coordinator
///
/// Implementations map these calls onto a real transactional resource, such
/// as a database connection or a journaled store. All operations are
/// synchronous and fallible; failures pass through the coordinator unchanged
/// and are never retried at this layer.
///
/// `suspend`/`resume` exist for REQUIRES_NEW support: a suspended physical
/// transaction keeps its pending work untouched while an independent
/// transaction runs, and the two must not interleave on the same underlying
/// connection.
pub trait TransactionResource {
    /// Start a new physical transaction and return its handle.
    fn begin(&mut self) -> Result<ResourceHandle>;

    /// Make the pending work of the given transaction durable.
    fn commit(&mut self, handle: ResourceHandle) -> Result<()>;

    /// Discard the pending work of the given transaction.
    fn rollback(&mut self, handle: ResourceHandle) -> Result<()>;

    /// Park an active physical transaction so an independent one can run.
    fn suspend(&mut self, handle: ResourceHandle) -> Result<()>;

    /// Reactivate a previously suspended physical transaction.
    fn resume(&mut self, handle: ResourceHandle) -> Result<()>;
}
