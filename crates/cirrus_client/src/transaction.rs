//! Transactional unit of work.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use cirrus_protocol::{
    BeginTransactionRequest, CommitRequest, Mutation, RollbackRequest, TransactionId,
};
use cirrus_types::{Entity, Key, KeyId};

use crate::batch::{delete_mutation, ensure_not_started, upsert_mutation};
use crate::client::Client;
use crate::error::{ClientError, ClientResult};
use crate::stack::{StackGuard, UnitOfWork};
use crate::status::Status;

/// A transactional unit of work.
///
/// A transaction buffers upserts and deletes like a [`Batch`], but brackets
/// them with a server-side transaction: `begin` obtains an id, `commit`
/// applies every staged mutation atomically under that id, and `rollback`
/// gives the id up without applying anything.
///
/// Entities staged with partial keys are remembered in staging order; when
/// the commit response arrives, the server-assigned keys are written back
/// onto those same entity handles, so every clone of a staged entity sees
/// its completed key.
///
/// Transaction handles are cheap clones sharing one buffer.
///
/// [`Batch`]: crate::Batch
#[derive(Clone)]
pub struct Transaction {
    client: Client,
    inner: Arc<Mutex<TransactionInner>>,
}

struct TransactionInner {
    status: Status,
    id: Option<TransactionId>,
    mutations: Vec<Mutation>,
    /// Entities whose upserts carry partial keys, in staging order. The
    /// i-th entry corresponds to the i-th key the server assigns.
    partial_key_entities: Vec<Entity>,
}

impl TransactionInner {
    fn active_id(&self) -> ClientResult<TransactionId> {
        match (self.status, self.id) {
            (Status::InProgress, Some(id)) => Ok(id),
            (Status::NotStarted, _) => Err(ClientError::invalid_state("transaction not begun")),
            (Status::Aborted, _) => Err(ClientError::invalid_state("transaction already aborted")),
            (Status::Committed, _) => {
                Err(ClientError::invalid_state("transaction already committed"))
            }
            (Status::InProgress, None) => Err(ClientError::invalid_state("transaction has no id")),
        }
    }
}

impl Transaction {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            inner: Arc::new(Mutex::new(TransactionInner {
                status: Status::NotStarted,
                id: None,
                mutations: Vec::new(),
                partial_key_entities: Vec::new(),
            })),
        }
    }

    /// Returns the project this transaction commits against.
    #[must_use]
    pub fn project(&self) -> &str {
        self.client.project()
    }

    /// Returns the namespace, if the owning client has one.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.client.namespace()
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.lock().status
    }

    /// Returns the server-assigned id while the transaction is in
    /// progress, `None` before begin and after commit or rollback.
    #[must_use]
    pub fn id(&self) -> Option<TransactionId> {
        self.inner.lock().id
    }

    /// Returns a snapshot of the staged mutations, in staging order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Mutation> {
        self.inner.lock().mutations.clone()
    }

    /// Returns the number of staged mutations.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.inner.lock().mutations.len()
    }

    /// Returns the staged entities still awaiting server-assigned keys, in
    /// staging order.
    #[must_use]
    pub fn partial_key_entities(&self) -> Vec<Entity> {
        self.inner.lock().partial_key_entities.clone()
    }

    /// Returns `true` if `other` is a clone of this transaction.
    #[must_use]
    pub fn same_transaction(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stages an upsert of `entity`, capturing its key and properties as
    /// they are now.
    ///
    /// The entity must have a key in this transaction's project. If the
    /// key's final path element has no id yet, the entity handle is kept
    /// so commit can write the server-assigned key back onto it.
    pub fn put(&self, entity: &Entity) -> ClientResult<()> {
        let mutation = upsert_mutation(self.project(), entity)?;
        let mut inner = self.inner.lock();
        if mutation.inserts_partial_key() {
            inner.partial_key_entities.push(entity.clone());
        }
        inner.mutations.push(mutation);
        Ok(())
    }

    /// Stages a delete of the record at `key`.
    ///
    /// The key must be complete and belong to this transaction's project.
    pub fn delete(&self, key: &Key) -> ClientResult<()> {
        let mutation = delete_mutation(self.project(), key)?;
        self.inner.lock().mutations.push(mutation);
        Ok(())
    }

    /// Begins the transaction, obtaining an id from the server.
    ///
    /// Fails without touching the server if the transaction was already
    /// begun or has finished. If the begin call itself fails, the
    /// transaction stays not started and begin may be invoked again.
    pub fn begin(&self) -> ClientResult<()> {
        {
            let inner = self.inner.lock();
            ensure_not_started(inner.status)?;
        }

        let request = BeginTransactionRequest::new(self.project());
        let response = self.client.service().begin_transaction(&request)?;

        let mut inner = self.inner.lock();
        inner.id = Some(response.transaction);
        inner.status = Status::InProgress;
        debug!(id = %response.transaction, "transaction begun");
        Ok(())
    }

    /// Commits the staged mutations atomically under this transaction's id.
    ///
    /// On success the server-assigned keys from the response are written
    /// back onto the staged partial-key entities, first to last, and the
    /// transaction is committed for good. A transport or service error
    /// propagates unchanged and leaves the status, id and buffers exactly
    /// as they were, so commit may be invoked again.
    pub fn commit(&self) -> ClientResult<()> {
        let (id, mutations) = {
            let inner = self.inner.lock();
            let id = inner.active_id()?;
            (id, inner.mutations.clone())
        };

        let request = CommitRequest::transactional(self.project(), mutations, id);
        let response = self.client.service().commit(&request)?;

        let mut inner = self.inner.lock();
        let assigned = response.assigned_keys();
        if assigned.len() != inner.partial_key_entities.len() {
            return Err(ClientError::protocol(format!(
                "server assigned {} keys for {} partial-key entities",
                assigned.len(),
                inner.partial_key_entities.len()
            )));
        }

        // Resolve every id before touching any entity, so a malformed
        // response leaves all of them untouched.
        let mut new_ids: Vec<KeyId> = Vec::with_capacity(assigned.len());
        for key in &assigned {
            match key.final_id() {
                Some(id) => new_ids.push(id.clone()),
                None => {
                    return Err(ClientError::protocol(format!(
                        "assigned key {key} is missing its final id"
                    )));
                }
            }
        }

        for (entity, new_id) in inner.partial_key_entities.iter().zip(new_ids) {
            let mut key = entity.key().ok_or(ClientError::MissingKey)?;
            key.complete_with(new_id)?;
            entity.set_key(key);
        }

        debug!(
            id = %id,
            mutations = request.mutations.len(),
            assigned = assigned.len(),
            "transaction committed"
        );
        inner.status = Status::Committed;
        inner.id = None;
        inner.mutations.clear();
        inner.partial_key_entities.clear();
        Ok(())
    }

    /// Rolls the transaction back, discarding the staged mutations.
    ///
    /// The transaction is aborted whether or not the rollback call reaches
    /// the server; a transport or service error still propagates, but the
    /// transaction cannot be used again either way.
    pub fn rollback(&self) -> ClientResult<()> {
        let id = self.inner.lock().active_id()?;

        let request = RollbackRequest::new(self.project(), id);
        let result = self.client.service().rollback(&request);

        let mut inner = self.inner.lock();
        inner.status = Status::Aborted;
        inner.id = None;
        inner.mutations.clear();
        inner.partial_key_entities.clear();

        result?;
        debug!(id = %id, "transaction rolled back");
        Ok(())
    }

    /// Runs `f` with this transaction as the client's current unit of work.
    ///
    /// The transaction is pushed onto the client's stack and begun; if `f`
    /// returns `Ok` the transaction commits, otherwise it rolls back and
    /// the original error is returned. The stack entry is removed on every
    /// exit path, including begin failures and panics.
    pub fn run<T, F>(&self, f: F) -> ClientResult<T>
    where
        F: FnOnce(&Transaction) -> ClientResult<T>,
    {
        let _guard = StackGuard::push(self.client.stack(), UnitOfWork::Transaction(self.clone()));
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!(error = %rollback_err, "rollback failed during scoped exit");
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Transaction")
            .field("project", &self.client.project())
            .field("status", &inner.status)
            .field("id", &inner.id)
            .field("staged", &inner.mutations.len())
            .finish()
    }
}
