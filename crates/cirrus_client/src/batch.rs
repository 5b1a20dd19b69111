//! Non-transactional unit of work.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use cirrus_protocol::{CommitRequest, Mutation};
use cirrus_types::{Entity, Key};

use crate::client::Client;
use crate::error::{ClientError, ClientResult};
use crate::stack::{StackGuard, UnitOfWork};
use crate::status::Status;

/// A non-transactional unit of work.
///
/// A batch buffers upserts and deletes in staging order and sends them as
/// one non-transactional commit request. Unlike a [`Transaction`], a batch
/// holds no server-side state: begin and rollback are purely local
/// transitions, and mutations outside the batch's commit are not isolated
/// from each other.
///
/// Batch handles are cheap clones sharing one buffer, so the handle held
/// on the client's stack and the handle held by the caller stay in step.
///
/// [`Transaction`]: crate::Transaction
#[derive(Clone)]
pub struct Batch {
    client: Client,
    inner: Arc<Mutex<BatchInner>>,
}

struct BatchInner {
    status: Status,
    mutations: Vec<Mutation>,
}

impl Batch {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            inner: Arc::new(Mutex::new(BatchInner {
                status: Status::NotStarted,
                mutations: Vec::new(),
            })),
        }
    }

    /// Returns the project this batch commits against.
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

    /// Stages an upsert of `entity`, capturing its key and properties as
    /// they are now.
    ///
    /// The entity must have a key in this batch's project. The key may be
    /// partial; note that only transactions write server-assigned ids back
    /// onto staged entities.
    pub fn put(&self, entity: &Entity) -> ClientResult<()> {
        let mutation = upsert_mutation(self.project(), entity)?;
        self.inner.lock().mutations.push(mutation);
        Ok(())
    }

    /// Stages a delete of the record at `key`.
    ///
    /// The key must be complete and belong to this batch's project.
    pub fn delete(&self, key: &Key) -> ClientResult<()> {
        let mutation = delete_mutation(self.project(), key)?;
        self.inner.lock().mutations.push(mutation);
        Ok(())
    }

    /// Marks the batch in progress.
    ///
    /// Batches have no server-side state, so this is a local transition.
    /// Fails if the batch was already begun or has finished.
    pub fn begin(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        ensure_not_started(inner.status)?;
        inner.status = Status::InProgress;
        Ok(())
    }

    /// Sends the staged mutations as one non-transactional commit.
    ///
    /// On success the batch is committed and its buffer is cleared for
    /// good. A transport or service error propagates unchanged and leaves
    /// the status and buffer exactly as they were, so commit may be
    /// invoked again; the caller owns the idempotence of that retry.
    pub fn commit(&self) -> ClientResult<()> {
        let mutations = {
            let inner = self.inner.lock();
            ensure_in_progress(inner.status)?;
            inner.mutations.clone()
        };

        let request = CommitRequest::non_transactional(self.project(), mutations);
        self.client.service().commit(&request)?;

        let mut inner = self.inner.lock();
        inner.status = Status::Committed;
        inner.mutations.clear();
        debug!(
            project = self.project(),
            mutations = request.mutations.len(),
            "batch committed"
        );
        Ok(())
    }

    /// Abandons the staged mutations.
    ///
    /// A batch has no server-side transaction to give up, so rollback
    /// discards the buffer locally without contacting the server.
    pub fn rollback(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        ensure_in_progress(inner.status)?;
        inner.status = Status::Aborted;
        inner.mutations.clear();
        debug!(project = self.client.project(), "batch rolled back");
        Ok(())
    }

    /// Runs `f` with this batch as the client's current unit of work.
    ///
    /// The batch is pushed onto the client's stack and begun; if `f`
    /// returns `Ok` the batch commits, otherwise it rolls back locally and
    /// the original error is returned. The stack entry is removed on every
    /// exit path, including begin failures and panics.
    pub fn run<T, F>(&self, f: F) -> ClientResult<T>
    where
        F: FnOnce(&Batch) -> ClientResult<T>,
    {
        let _guard = StackGuard::push(self.client.stack(), UnitOfWork::Batch(self.clone()));
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

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Batch")
            .field("project", &self.client.project())
            .field("status", &inner.status)
            .field("staged", &inner.mutations.len())
            .finish()
    }
}

/// Builds the upsert mutation for `entity`, validating its key against
/// `project`. Shared by batches and transactions.
pub(crate) fn upsert_mutation(project: &str, entity: &Entity) -> ClientResult<Mutation> {
    let key = entity.key().ok_or(ClientError::MissingKey)?;
    check_project(project, &key)?;

    // Only the final path element may await a server-assigned id.
    let path = key.path();
    let ancestors_complete = path
        .iter()
        .take(path.len().saturating_sub(1))
        .all(|element| element.is_complete());
    if path.is_empty() || !ancestors_complete {
        return Err(ClientError::incomplete_key(&key));
    }

    Ok(Mutation::upsert(key, entity.properties()))
}

/// Builds the delete mutation for `key`, validating it against `project`.
pub(crate) fn delete_mutation(project: &str, key: &Key) -> ClientResult<Mutation> {
    check_project(project, key)?;
    if !key.is_complete() {
        return Err(ClientError::incomplete_key(key));
    }
    Ok(Mutation::delete(key.clone()))
}

fn check_project(project: &str, key: &Key) -> ClientResult<()> {
    if key.project() != project {
        return Err(ClientError::project_mismatch(project, key.project()));
    }
    Ok(())
}

pub(crate) fn ensure_not_started(status: Status) -> ClientResult<()> {
    match status {
        Status::NotStarted => Ok(()),
        Status::InProgress => Err(ClientError::invalid_state("already begun")),
        Status::Aborted => Err(ClientError::invalid_state("already aborted")),
        Status::Committed => Err(ClientError::invalid_state("already committed")),
    }
}

pub(crate) fn ensure_in_progress(status: Status) -> ClientResult<()> {
    match status {
        Status::InProgress => Ok(()),
        Status::NotStarted => Err(ClientError::invalid_state("not begun")),
        Status::Aborted => Err(ClientError::invalid_state("already aborted")),
        Status::Committed => Err(ClientError::invalid_state("already committed")),
    }
}
