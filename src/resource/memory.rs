// ============================================================================
// In-Memory Transactional Resource
// ============================================================================
//
// Reference implementation of the TransactionResource trait. Pending writes
// are buffered per physical transaction and only become visible in the
// durable store on commit. Every physical operation is journaled so callers
// can observe exactly which physical effects a sequence of logical
// operations produced.
//
// ============================================================================

use super::{ResourceHandle, TransactionResource};
use crate::core::{Result, TxError};
use std::collections::HashMap;

/// One physical operation performed on the resource
///
/// The journal of these is the ground truth for "what actually happened"
/// at the physical layer, independent of the logical transaction stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOp {
    Begin(ResourceHandle),
    Commit(ResourceHandle),
    Rollback(ResourceHandle),
    Suspend(ResourceHandle),
    Resume(ResourceHandle),
}

#[derive(Debug, Default)]
struct TxSlot {
    writes: Vec<String>,
    suspended: bool,
}

/// In-memory resource with buffered writes and an operation journal
///
/// Supports several simultaneously open physical transactions, as required
/// by REQUIRES_NEW: the suspended transaction and the newly begun one hold
/// independent write buffers and never see each other's pending work.
#[derive(Debug, Default)]
pub struct MemoryResource {
    next_handle: u64,
    open: HashMap<ResourceHandle, TxSlot>,
    committed: Vec<String>,
    journal: Vec<ResourceOp>,
    fail_next_commit: Option<String>,
}

impl MemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a write under the given physical transaction.
    ///
    /// The write becomes durable only when that transaction commits.
    pub fn write(&mut self, handle: ResourceHandle, record: &str) -> Result<()> {
        let slot = self
            .open
            .get_mut(&handle)
            .ok_or_else(|| TxError::Resource(format!("unknown physical transaction {handle}")))?;

        if slot.suspended {
            return Err(TxError::Resource(format!(
                "physical transaction {handle} is suspended"
            )));
        }

        slot.writes.push(record.to_string());
        Ok(())
    }

    /// Records made durable by committed transactions, in commit order.
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    /// Check whether a record was durably committed.
    pub fn contains(&self, record: &str) -> bool {
        self.committed.iter().any(|r| r == record)
    }

    /// Every physical operation performed so far, in order.
    pub fn journal(&self) -> &[ResourceOp] {
        &self.journal
    }

    /// Number of physical transactions currently open (active or suspended).
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Make the next commit fail with the given message.
    ///
    /// Lets callers exercise the pass-through of resource-layer failures.
    pub fn inject_commit_failure(&mut self, message: &str) {
        self.fail_next_commit = Some(message.to_string());
    }

    fn slot_mut(&mut self, handle: ResourceHandle) -> Result<&mut TxSlot> {
        self.open
            .get_mut(&handle)
            .ok_or_else(|| TxError::Resource(format!("unknown physical transaction {handle}")))
    }
}

impl TransactionResource for MemoryResource {
    fn begin(&mut self) -> Result<ResourceHandle> {
        self.next_handle += 1;
        let handle = ResourceHandle(self.next_handle);
        self.open.insert(handle, TxSlot::default());
        self.journal.push(ResourceOp::Begin(handle));
        Ok(handle)
    }

    fn commit(&mut self, handle: ResourceHandle) -> Result<()> {
        if let Some(message) = self.fail_next_commit.take() {
            // The failed transaction is gone either way; pending work is lost.
            self.open.remove(&handle);
            return Err(TxError::Resource(message));
        }

        let slot = self
            .open
            .remove(&handle)
            .ok_or_else(|| TxError::Resource(format!("unknown physical transaction {handle}")))?;

        self.committed.extend(slot.writes);
        self.journal.push(ResourceOp::Commit(handle));
        Ok(())
    }

    fn rollback(&mut self, handle: ResourceHandle) -> Result<()> {
        self.open
            .remove(&handle)
            .ok_or_else(|| TxError::Resource(format!("unknown physical transaction {handle}")))?;

        self.journal.push(ResourceOp::Rollback(handle));
        Ok(())
    }

    fn suspend(&mut self, handle: ResourceHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        if slot.suspended {
            return Err(TxError::Resource(format!(
                "physical transaction {handle} is already suspended"
            )));
        }

        slot.suspended = true;
        self.journal.push(ResourceOp::Suspend(handle));
        Ok(())
    }

    fn resume(&mut self, handle: ResourceHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        if !slot.suspended {
            return Err(TxError::Resource(format!(
                "physical transaction {handle} is not suspended"
            )));
        }

        slot.suspended = false;
        self.journal.push(ResourceOp::Resume(handle));
        Ok(())
    }
}
