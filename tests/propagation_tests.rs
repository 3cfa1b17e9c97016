//! Propagation tests
//!
//! Exercise the coordinator's nesting semantics: REQUIRED join vs. new,
//! REQUIRES_NEW suspension, rollback-only marking, and stack discipline.
//! Run with: cargo test --test propagation_tests

use txstack::{
    MemoryResource, Propagation, ResourceOp, TransactionCoordinator, TxError,
};

fn coordinator() -> TransactionCoordinator<MemoryResource> {
    TransactionCoordinator::new(MemoryResource::new())
}

fn write(coord: &mut TransactionCoordinator<MemoryResource>, record: &str) {
    let handle = coord.active_handle().unwrap();
    coord.resource_mut().write(handle, record).unwrap();
}

#[test]
fn test_commit() {
    let mut coord = coordinator();

    let ctx = coord.begin(Propagation::Required).unwrap();
    assert!(coord.is_transaction_active());

    coord.commit(ctx).unwrap();
    assert!(!coord.is_transaction_active());

    let journal = coord.resource().journal();
    assert!(matches!(journal, [ResourceOp::Begin(_), ResourceOp::Commit(_)]));
}

#[test]
fn test_rollback() {
    let mut coord = coordinator();

    let ctx = coord.begin(Propagation::Required).unwrap();
    write(&mut coord, "a");
    coord.rollback(ctx).unwrap();

    assert!(!coord.is_transaction_active());
    assert!(!coord.resource().contains("a"));

    let journal = coord.resource().journal();
    assert!(matches!(journal, [ResourceOp::Begin(_), ResourceOp::Rollback(_)]));
}

#[test]
fn test_double_commit_is_two_independent_transactions() {
    let mut coord = coordinator();

    let tx1 = coord.begin(Propagation::Required).unwrap();
    write(&mut coord, "first");
    coord.commit(tx1).unwrap();
    assert!(!coord.is_transaction_active());

    let tx2 = coord.begin(Propagation::Required).unwrap();
    write(&mut coord, "second");
    coord.commit(tx2).unwrap();
    assert!(!coord.is_transaction_active());

    assert!(coord.resource().contains("first"));
    assert!(coord.resource().contains("second"));

    // Two separate physical transactions, each begun and committed once.
    let journal = coord.resource().journal();
    assert_eq!(journal.len(), 4);
    assert!(matches!(
        journal,
        [
            ResourceOp::Begin(h1),
            ResourceOp::Commit(h2),
            ResourceOp::Begin(h3),
            ResourceOp::Commit(h4),
        ] if h1 == h2 && h3 == h4 && h1 != h3
    ));
}

#[test]
fn test_inner_commit_joins_outer_transaction() {
    let mut coord = coordinator();

    let outer = coord.begin(Propagation::Required).unwrap();
    assert!(coord.is_new_transaction(outer).unwrap());

    let inner = coord.begin(Propagation::Required).unwrap();
    assert!(!coord.is_new_transaction(inner).unwrap());

    // The joined commit is purely logical.
    coord.commit(inner).unwrap();
    assert_eq!(coord.resource().journal().len(), 1);
    assert!(coord.is_transaction_active());

    coord.commit(outer).unwrap();
    assert!(!coord.is_transaction_active());
    assert_eq!(coord.resource().journal().len(), 2);
}

#[test]
fn test_outer_rollback_discards_inner_work() {
    let mut coord = coordinator();

    let outer = coord.begin(Propagation::Required).unwrap();
    let inner = coord.begin(Propagation::Required).unwrap();

    write(&mut coord, "inner work");
    coord.commit(inner).unwrap();

    coord.rollback(outer).unwrap();
    assert!(!coord.resource().contains("inner work"));
    assert!(!coord.is_transaction_active());
}

#[test]
fn test_inner_rollback_forces_unexpected_rollback_on_outer_commit() {
    let mut coord = coordinator();

    let outer = coord.begin(Propagation::Required).unwrap();
    let inner = coord.begin(Propagation::Required).unwrap();

    write(&mut coord, "outer work");
    coord.rollback(inner).unwrap();
    assert!(coord.is_rollback_only());

    let err = coord.commit(outer).unwrap_err();
    assert!(matches!(err, TxError::UnexpectedRollback));

    // The whole unit of work failed and the coordinator is clean again.
    assert_eq!(coord.depth(), 0);
    assert!(!coord.is_rollback_only());
    assert!(!coord.is_transaction_active());
    assert!(!coord.resource().contains("outer work"));
}

#[test]
fn test_inner_requires_new_rollback_leaves_outer_intact() {
    let mut coord = coordinator();

    let outer = coord.begin(Propagation::Required).unwrap();
    write(&mut coord, "member");

    let inner = coord.begin(Propagation::RequiresNew).unwrap();
    assert!(coord.is_new_transaction(inner).unwrap());
    write(&mut coord, "log");

    coord.rollback(inner).unwrap();
    assert!(!coord.is_rollback_only());

    coord.commit(outer).unwrap();

    assert!(coord.resource().contains("member"));
    assert!(!coord.resource().contains("log"));
}

#[test]
fn test_requires_new_suspends_and_resumes() {
    let mut coord = coordinator();

    let outer = coord.begin(Propagation::Required).unwrap();
    let outer_handle = coord.active_handle().unwrap();

    let inner = coord.begin(Propagation::RequiresNew).unwrap();
    let inner_handle = coord.active_handle().unwrap();
    assert_ne!(outer_handle, inner_handle);

    coord.commit(inner).unwrap();
    assert_eq!(coord.active_handle(), Some(outer_handle));

    coord.commit(outer).unwrap();

    let journal = coord.resource().journal();
    assert_eq!(
        journal,
        &[
            ResourceOp::Begin(outer_handle),
            ResourceOp::Suspend(outer_handle),
            ResourceOp::Begin(inner_handle),
            ResourceOp::Commit(inner_handle),
            ResourceOp::Resume(outer_handle),
            ResourceOp::Commit(outer_handle),
        ]
    );
}

#[test]
fn test_requires_new_is_new_at_any_depth() {
    let mut coord = coordinator();

    let d1 = coord.begin(Propagation::Required).unwrap();
    let d2 = coord.begin(Propagation::Required).unwrap();
    let d3 = coord.begin(Propagation::RequiresNew).unwrap();

    assert!(coord.is_new_transaction(d1).unwrap());
    assert!(!coord.is_new_transaction(d2).unwrap());
    assert!(coord.is_new_transaction(d3).unwrap());

    coord.commit(d3).unwrap();
    coord.commit(d2).unwrap();
    coord.commit(d1).unwrap();
}

#[test]
fn test_requires_new_without_active_transaction() {
    let mut coord = coordinator();

    let ctx = coord.begin(Propagation::RequiresNew).unwrap();
    assert!(coord.is_new_transaction(ctx).unwrap());
    coord.commit(ctx).unwrap();

    // Nothing to suspend or resume when starting from idle.
    let journal = coord.resource().journal();
    assert!(matches!(journal, [ResourceOp::Begin(_), ResourceOp::Commit(_)]));
}

#[test]
fn test_ending_non_top_scope_is_illegal_and_leaves_stack_unchanged() {
    let mut coord = coordinator();

    let outer = coord.begin(Propagation::Required).unwrap();
    let inner = coord.begin(Propagation::Required).unwrap();

    let err = coord.commit(outer).unwrap_err();
    assert!(matches!(err, TxError::IllegalState(_)));
    assert_eq!(coord.depth(), 2);

    let err = coord.rollback(outer).unwrap_err();
    assert!(matches!(err, TxError::IllegalState(_)));
    assert_eq!(coord.depth(), 2);

    // Proper LIFO unwinding still works afterwards.
    coord.commit(inner).unwrap();
    coord.commit(outer).unwrap();
    assert!(!coord.is_transaction_active());
}

#[test]
fn test_ending_unknown_scope_is_illegal() {
    let mut coord = coordinator();

    let ctx = coord.begin(Propagation::Required).unwrap();
    coord.commit(ctx).unwrap();

    assert!(matches!(coord.commit(ctx), Err(TxError::IllegalState(_))));
    assert!(matches!(coord.rollback(ctx), Err(TxError::IllegalState(_))));
}

#[test]
fn test_resource_commit_failure_passes_through_and_unwinds_stack() {
    let mut coord = coordinator();

    let ctx = coord.begin(Propagation::Required).unwrap();
    write(&mut coord, "a");
    coord.resource_mut().inject_commit_failure("connection lost");

    let err = coord.commit(ctx).unwrap_err();
    assert!(matches!(err, TxError::Resource(_)));

    // The logical stack is unwound regardless of the physical failure.
    assert_eq!(coord.depth(), 0);
    assert!(!coord.is_transaction_active());
    assert!(!coord.resource().contains("a"));
}
