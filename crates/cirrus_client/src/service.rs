//! Datastore RPC abstraction.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;

use cirrus_protocol::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse,
    MutationResult, RollbackRequest, RollbackResponse, TransactionId,
};
use cirrus_types::Key;

use crate::error::{ClientError, ClientResult};

/// The datastore RPC surface consumed by units of work.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (gRPC, HTTP, in-memory for testing, etc.). Calls block
/// until the server answers; implementations own timeout and connection
/// management.
pub trait DatastoreRpc: Send + Sync {
    /// Opens a new transaction.
    fn begin_transaction(
        &self,
        request: &BeginTransactionRequest,
    ) -> ClientResult<BeginTransactionResponse>;

    /// Applies a batch of mutations.
    fn commit(&self, request: &CommitRequest) -> ClientResult<CommitResponse>;

    /// Abandons an open transaction.
    fn rollback(&self, request: &RollbackRequest) -> ClientResult<RollbackResponse>;
}

/// A recorded call made against a [`MockDatastore`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    /// A begin-transaction call and its request.
    BeginTransaction(BeginTransactionRequest),
    /// A commit call and its request.
    Commit(CommitRequest),
    /// A rollback call and its request.
    Rollback(RollbackRequest),
}

/// A mock datastore service for testing.
///
/// Records every call with its full request, assigns sequential
/// transaction ids, and completes partial keys with sequential numeric
/// ids unless specific keys are scripted. Failures are scripted per
/// method and consumed by the next call, so a retry after a scripted
/// failure succeeds.
#[derive(Debug, Default)]
pub struct MockDatastore {
    next_transaction: AtomicU64,
    next_key_id: AtomicI64,
    calls: Mutex<Vec<ServiceCall>>,
    begin_failure: Mutex<Option<String>>,
    commit_failure: Mutex<Option<String>>,
    rollback_failure: Mutex<Option<String>>,
    commit_response: Mutex<Option<CommitResponse>>,
    assigned_keys: Mutex<VecDeque<Key>>,
}

impl MockDatastore {
    /// Creates a new mock datastore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next begin-transaction call fail with a transport error.
    pub fn fail_next_begin(&self, message: impl Into<String>) {
        *self.begin_failure.lock() = Some(message.into());
    }

    /// Makes the next commit call fail with a transport error.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        *self.commit_failure.lock() = Some(message.into());
    }

    /// Makes the next rollback call fail with a transport error.
    pub fn fail_next_rollback(&self, message: impl Into<String>) {
        *self.rollback_failure.lock() = Some(message.into());
    }

    /// Overrides the response returned by every subsequent commit call.
    pub fn set_commit_response(&self, response: CommitResponse) {
        *self.commit_response.lock() = Some(response);
    }

    /// Scripts the completed keys handed out for partial-key inserts, in
    /// order. Once exhausted, the mock falls back to sequential ids.
    pub fn set_assigned_keys(&self, keys: Vec<Key>) {
        *self.assigned_keys.lock() = keys.into();
    }

    /// Returns every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of begin-transaction calls made.
    #[must_use]
    pub fn begin_count(&self) -> usize {
        self.count(|call| matches!(call, ServiceCall::BeginTransaction(_)))
    }

    /// Returns the number of commit calls made.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.count(|call| matches!(call, ServiceCall::Commit(_)))
    }

    /// Returns the number of rollback calls made.
    #[must_use]
    pub fn rollback_count(&self) -> usize {
        self.count(|call| matches!(call, ServiceCall::Rollback(_)))
    }

    /// Returns the most recent commit request, if any.
    #[must_use]
    pub fn last_commit(&self) -> Option<CommitRequest> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            ServiceCall::Commit(request) => Some(request.clone()),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ServiceCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }
}

impl DatastoreRpc for MockDatastore {
    fn begin_transaction(
        &self,
        request: &BeginTransactionRequest,
    ) -> ClientResult<BeginTransactionResponse> {
        self.calls
            .lock()
            .push(ServiceCall::BeginTransaction(request.clone()));
        if let Some(message) = self.begin_failure.lock().take() {
            return Err(ClientError::transport(message));
        }
        let id = self.next_transaction.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(BeginTransactionResponse::new(TransactionId::new(id)))
    }

    fn commit(&self, request: &CommitRequest) -> ClientResult<CommitResponse> {
        self.calls.lock().push(ServiceCall::Commit(request.clone()));
        if let Some(message) = self.commit_failure.lock().take() {
            return Err(ClientError::transport(message));
        }
        if let Some(response) = self.commit_response.lock().clone() {
            return Ok(response);
        }

        let mut scripted = self.assigned_keys.lock();
        let mut results = Vec::with_capacity(request.mutations.len());
        for mutation in &request.mutations {
            if mutation.inserts_partial_key() {
                let key = match scripted.pop_front() {
                    Some(key) => key,
                    None => {
                        let mut completed = mutation.key().clone();
                        let id = self.next_key_id.fetch_add(1, Ordering::SeqCst) + 1;
                        completed.complete_with(id)?;
                        completed
                    }
                };
                results.push(MutationResult::with_key(key));
            } else {
                results.push(MutationResult::unchanged());
            }
        }
        Ok(CommitResponse::new(results))
    }

    fn rollback(&self, request: &RollbackRequest) -> ClientResult<RollbackResponse> {
        self.calls
            .lock()
            .push(ServiceCall::Rollback(request.clone()));
        if let Some(message) = self.rollback_failure.lock().take() {
            return Err(ClientError::transport(message));
        }
        Ok(RollbackResponse::new())
    }
}
