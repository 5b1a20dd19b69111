//! Per-client unit-of-work stack.

use parking_lot::Mutex;

use crate::batch::Batch;
use crate::transaction::Transaction;

/// A batch or transaction on the client's stack.
#[derive(Debug, Clone)]
pub enum UnitOfWork {
    /// A non-transactional batch.
    Batch(Batch),
    /// A transaction.
    Transaction(Transaction),
}

impl UnitOfWork {
    /// Returns the transaction, if this unit of work is one.
    #[must_use]
    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Transaction(transaction) => Some(transaction),
            Self::Batch(_) => None,
        }
    }

    /// Returns true if this unit of work is a transaction.
    #[must_use]
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }
}

/// The ordered stack of active units of work on one client.
///
/// The top of the stack is the current unit of work: staged operations
/// route to it, and entering or exiting a scope pushes or pops exactly
/// one entry. Individual operations are locked, but a push/pop sequence
/// is not atomic; a client is not meant to be shared across threads
/// without external synchronization.
#[derive(Debug, Default)]
pub struct WorkStack {
    entries: Mutex<Vec<UnitOfWork>>,
}

impl WorkStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pushes a unit of work, making it current.
    pub fn push(&self, unit: UnitOfWork) {
        self.entries.lock().push(unit);
    }

    /// Pops the current unit of work, restoring the previous one.
    pub fn pop(&self) -> Option<UnitOfWork> {
        self.entries.lock().pop()
    }

    /// Returns the current unit of work.
    #[must_use]
    pub fn top(&self) -> Option<UnitOfWork> {
        self.entries.lock().last().cloned()
    }

    /// Returns the current transaction.
    ///
    /// Only the top of the stack is examined: a batch on top masks every
    /// transaction beneath it, so this returns `None` while the batch is
    /// active even though transactions remain deeper in the stack.
    #[must_use]
    pub fn peek_transaction(&self) -> Option<Transaction> {
        self.entries
            .lock()
            .last()
            .and_then(|unit| unit.as_transaction().cloned())
    }

    /// Returns the number of active units of work.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no unit of work is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Pops the stack when dropped.
///
/// Scoped runs push before beginning and hold this guard so the pop
/// happens on every exit path, including panics and begin failures.
pub(crate) struct StackGuard<'a> {
    stack: &'a WorkStack,
}

impl<'a> StackGuard<'a> {
    pub(crate) fn push(stack: &'a WorkStack, unit: UnitOfWork) -> Self {
        stack.push(unit);
        Self { stack }
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::Client;
    use crate::config::ClientConfig;
    use crate::service::MockDatastore;

    fn test_client() -> Client {
        Client::new(ClientConfig::new("proj"), Arc::new(MockDatastore::new()))
    }

    #[test]
    fn push_and_pop_restore_previous_top() {
        let client = test_client();
        let stack = WorkStack::new();
        let outer = client.transaction();
        let inner = client.batch();

        stack.push(UnitOfWork::Transaction(outer.clone()));
        stack.push(UnitOfWork::Batch(inner));
        assert_eq!(stack.depth(), 2);
        assert!(!stack.top().unwrap().is_transaction());

        stack.pop();
        assert!(stack.top().unwrap().is_transaction());
        stack.pop();
        assert!(stack.is_empty());
    }

    #[test]
    fn batch_on_top_masks_transactions_below() {
        let client = test_client();
        let stack = WorkStack::new();
        let transaction = client.transaction();

        stack.push(UnitOfWork::Transaction(transaction.clone()));
        assert!(stack.peek_transaction().is_some());

        stack.push(UnitOfWork::Batch(client.batch()));
        assert!(stack.peek_transaction().is_none());

        stack.pop();
        let current = stack.peek_transaction().unwrap();
        assert!(current.same_transaction(&transaction));
    }

    #[test]
    fn guard_pops_on_drop() {
        let client = test_client();
        let stack = WorkStack::new();
        {
            let _guard = StackGuard::push(&stack, UnitOfWork::Batch(client.batch()));
            assert_eq!(stack.depth(), 1);
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn guard_pops_during_panic_unwind() {
        let client = test_client();
        let stack = Arc::new(WorkStack::new());
        let stack_ref = Arc::clone(&stack);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard =
                StackGuard::push(&stack_ref, UnitOfWork::Batch(client.batch()));
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(stack.is_empty());
    }
}
