//! Begin/commit/rollback request and response shapes.

use serde::{Deserialize, Serialize};

use cirrus_types::Key;

use crate::mutation::{CommitMode, Mutation};
use crate::types::TransactionId;

/// Opens a new transaction scoped to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeginTransactionRequest {
    /// Project to open the transaction in.
    pub project_id: String,
}

impl BeginTransactionRequest {
    /// Creates a new begin-transaction request.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

/// Server reply to a begin-transaction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginTransactionResponse {
    /// Identifier of the newly opened transaction.
    pub transaction: TransactionId,
}

impl BeginTransactionResponse {
    /// Creates a new begin-transaction response.
    pub fn new(transaction: TransactionId) -> Self {
        Self { transaction }
    }
}

/// Applies a batch of mutations, optionally under an open transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Project the mutations apply to.
    pub project_id: String,
    /// Whether the mutations commit inside a transaction.
    pub mode: CommitMode,
    /// Mutations in staging order. The server applies them in this order
    /// and answers with one result per mutation in the same order.
    pub mutations: Vec<Mutation>,
    /// Open transaction to commit under. Present iff `mode` is
    /// [`CommitMode::Transactional`].
    pub transaction: Option<TransactionId>,
}

impl CommitRequest {
    /// Creates a non-transactional commit request.
    pub fn non_transactional(project_id: impl Into<String>, mutations: Vec<Mutation>) -> Self {
        Self {
            project_id: project_id.into(),
            mode: CommitMode::NonTransactional,
            mutations,
            transaction: None,
        }
    }

    /// Creates a transactional commit request.
    pub fn transactional(
        project_id: impl Into<String>,
        mutations: Vec<Mutation>,
        transaction: TransactionId,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            mode: CommitMode::Transactional,
            mutations,
            transaction: Some(transaction),
        }
    }
}

/// Outcome of one mutation in a commit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    /// The completed key, populated iff the mutation inserted a record
    /// whose key needed a server-assigned id.
    pub key: Option<Key>,
}

impl MutationResult {
    /// Creates a result for a mutation that needed no key assignment.
    #[must_use]
    pub fn unchanged() -> Self {
        Self { key: None }
    }

    /// Creates a result carrying a server-completed key.
    #[must_use]
    pub fn with_key(key: Key) -> Self {
        Self { key: Some(key) }
    }
}

/// Server reply to a commit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResponse {
    /// One result per request mutation, in request order.
    pub mutation_results: Vec<MutationResult>,
}

impl CommitResponse {
    /// Creates a new commit response.
    pub fn new(mutation_results: Vec<MutationResult>) -> Self {
        Self { mutation_results }
    }

    /// Returns the keys the server assigned to partial-key inserts, in
    /// request order.
    #[must_use]
    pub fn assigned_keys(&self) -> Vec<Key> {
        self.mutation_results
            .iter()
            .filter_map(|result| result.key.clone())
            .collect()
    }
}

/// Abandons an open transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackRequest {
    /// Project the transaction was opened in.
    pub project_id: String,
    /// The transaction to abandon.
    pub transaction: TransactionId,
}

impl RollbackRequest {
    /// Creates a new rollback request.
    pub fn new(project_id: impl Into<String>, transaction: TransactionId) -> Self {
        Self {
            project_id: project_id.into(),
            transaction,
        }
    }
}

/// Server reply to a rollback request. Carries no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResponse {}

impl RollbackResponse {
    /// Creates a new rollback response.
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }
}
