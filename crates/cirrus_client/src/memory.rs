//! In-memory datastore service.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use cirrus_protocol::{
    BeginTransactionRequest, BeginTransactionResponse, CommitMode, CommitRequest, CommitResponse,
    Mutation, MutationResult, RollbackRequest, RollbackResponse, TransactionId,
};
use cirrus_types::{Key, Value};

use crate::error::{ClientError, ClientResult};
use crate::service::DatastoreRpc;

/// A working in-memory datastore.
///
/// Implements the full begin/commit/rollback surface against a process-local
/// record store: transactions are allocated and tracked until they commit or
/// roll back, mutations apply in request order, and partial keys receive
/// sequential numeric ids. Useful in integration tests and examples; also
/// the reference for what a conforming server does.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_transaction: u64,
    next_key_id: i64,
    open_transactions: BTreeSet<u64>,
    records: BTreeMap<Key, BTreeMap<String, Value>>,
}

impl MemoryDatastore {
    /// Creates an empty in-memory datastore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored properties for a key, if present.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<BTreeMap<String, Value>> {
        self.state.lock().records.get(key).cloned()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Returns the number of transactions begun but not yet finished.
    #[must_use]
    pub fn open_transaction_count(&self) -> usize {
        self.state.lock().open_transactions.len()
    }

    fn validate_mutation(mutation: &Mutation) -> ClientResult<()> {
        match mutation {
            Mutation::Upsert { key, .. } => {
                let path = key.path();
                let ancestors_complete = path
                    .iter()
                    .take(path.len().saturating_sub(1))
                    .all(|element| element.is_complete());
                if path.is_empty() || !ancestors_complete {
                    return Err(ClientError::service_fault(format!(
                        "incomplete ancestor path in key {key}"
                    )));
                }
                Ok(())
            }
            Mutation::Delete { key } => {
                if !key.is_complete() {
                    return Err(ClientError::service_fault(format!(
                        "delete with incomplete key {key}"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl DatastoreRpc for MemoryDatastore {
    fn begin_transaction(
        &self,
        _request: &BeginTransactionRequest,
    ) -> ClientResult<BeginTransactionResponse> {
        let mut state = self.state.lock();
        state.next_transaction += 1;
        let id = state.next_transaction;
        state.open_transactions.insert(id);
        Ok(BeginTransactionResponse::new(TransactionId::new(id)))
    }

    fn commit(&self, request: &CommitRequest) -> ClientResult<CommitResponse> {
        let mut state = self.state.lock();

        match (request.mode, request.transaction) {
            (CommitMode::Transactional, Some(transaction)) => {
                if !state.open_transactions.contains(&transaction.as_u64()) {
                    return Err(ClientError::service_fault(format!(
                        "unknown transaction: {transaction}"
                    )));
                }
            }
            (CommitMode::Transactional, None) => {
                return Err(ClientError::service_fault(
                    "transactional commit without transaction id",
                ));
            }
            (CommitMode::NonTransactional, Some(_)) => {
                return Err(ClientError::service_fault(
                    "non-transactional commit carries a transaction id",
                ));
            }
            (CommitMode::NonTransactional, None) => {}
        }

        // Validate everything before applying anything, so a rejected
        // request leaves the store untouched.
        for mutation in &request.mutations {
            Self::validate_mutation(mutation)?;
        }

        let mut results = Vec::with_capacity(request.mutations.len());
        for mutation in &request.mutations {
            match mutation {
                Mutation::Upsert { key, properties } => {
                    if key.is_partial() {
                        state.next_key_id += 1;
                        let id = state.next_key_id;
                        let mut completed = key.clone();
                        completed.complete_with(id)?;
                        state.records.insert(completed.clone(), properties.clone());
                        results.push(MutationResult::with_key(completed));
                    } else {
                        state.records.insert(key.clone(), properties.clone());
                        results.push(MutationResult::unchanged());
                    }
                }
                Mutation::Delete { key } => {
                    state.records.remove(key);
                    results.push(MutationResult::unchanged());
                }
            }
        }

        if let Some(transaction) = request.transaction {
            state.open_transactions.remove(&transaction.as_u64());
        }
        Ok(CommitResponse::new(results))
    }

    fn rollback(&self, request: &RollbackRequest) -> ClientResult<RollbackResponse> {
        let mut state = self.state.lock();
        if !state.open_transactions.remove(&request.transaction.as_u64()) {
            return Err(ClientError::service_fault(format!(
                "unknown transaction: {}",
                request.transaction
            )));
        }
        Ok(RollbackResponse::new())
    }
}
