//! Datastore client and unit-of-work routing.

use std::fmt;
use std::sync::Arc;

use cirrus_types::{Entity, Key};

use crate::batch::Batch;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::service::DatastoreRpc;
use crate::stack::{UnitOfWork, WorkStack};
use crate::transaction::Transaction;

/// Entry point for staging work against a Cirrus project.
///
/// A client owns its RPC service handle and a stack of in-flight units of
/// work. [`put`] and [`delete`] route to the innermost unit of work on
/// that stack; with no unit of work open they fall back to a one-shot
/// batch that commits immediately.
///
/// Client handles are cheap clones sharing one stack, so a handle can be
/// passed to the code that stages writes while another opens and closes
/// scopes.
///
/// [`put`]: Client::put
/// [`delete`]: Client::delete
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    service: Arc<dyn DatastoreRpc>,
    stack: WorkStack,
}

impl Client {
    /// Creates a client for `config` backed by `service`.
    pub fn new(config: ClientConfig, service: Arc<dyn DatastoreRpc>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                service,
                stack: WorkStack::new(),
            }),
        }
    }

    /// Returns the project this client stages work against.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.inner.config.project
    }

    /// Returns the namespace, if one was configured.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.inner.config.namespace.as_deref()
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn service(&self) -> &Arc<dyn DatastoreRpc> {
        &self.inner.service
    }

    /// Returns the stack of in-flight units of work.
    ///
    /// [`Batch::run`] and [`Transaction::run`] maintain the stack for you;
    /// push and pop directly only when driving begin and commit by hand.
    #[must_use]
    pub fn stack(&self) -> &WorkStack {
        &self.inner.stack
    }

    /// Returns the innermost in-flight unit of work, if any.
    #[must_use]
    pub fn current(&self) -> Option<UnitOfWork> {
        self.inner.stack.top()
    }

    /// Returns the innermost unit of work if it is a transaction.
    ///
    /// A batch on top of the stack masks the transactions below it, so
    /// this is `None` whenever staged work would not be routed to a
    /// transaction.
    #[must_use]
    pub fn current_transaction(&self) -> Option<Transaction> {
        self.inner.stack.peek_transaction()
    }

    /// Creates a batch bound to this client. It is not begun and not on
    /// the stack.
    #[must_use]
    pub fn batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    /// Creates a transaction bound to this client. It is not begun and
    /// not on the stack.
    #[must_use]
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Stages an upsert of `entity` in the innermost unit of work.
    ///
    /// With no unit of work open, the upsert is sent immediately in a
    /// one-shot batch. One-shot writes do not receive server-assigned key
    /// patch-back; stage partial-key entities in a [`Transaction`] to have
    /// their keys completed.
    pub fn put(&self, entity: &Entity) -> ClientResult<()> {
        match self.inner.stack.top() {
            Some(UnitOfWork::Batch(batch)) => batch.put(entity),
            Some(UnitOfWork::Transaction(txn)) => txn.put(entity),
            None => self.one_shot(|batch| batch.put(entity)),
        }
    }

    /// Stages a delete of the record at `key` in the innermost unit of
    /// work, or sends it immediately in a one-shot batch if none is open.
    pub fn delete(&self, key: &Key) -> ClientResult<()> {
        match self.inner.stack.top() {
            Some(UnitOfWork::Batch(batch)) => batch.delete(key),
            Some(UnitOfWork::Transaction(txn)) => txn.delete(key),
            None => self.one_shot(|batch| batch.delete(key)),
        }
    }

    fn one_shot<F>(&self, stage: F) -> ClientResult<()>
    where
        F: FnOnce(&Batch) -> ClientResult<()>,
    {
        let batch = self.batch();
        batch.begin()?;
        stage(&batch)?;
        batch.commit()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("project", &self.inner.config.project)
            .field("stack_depth", &self.inner.stack.depth())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cirrus_protocol::CommitMode;

    use crate::error::ClientError;
    use crate::service::MockDatastore;

    fn test_client() -> (Client, Arc<MockDatastore>) {
        let service = Arc::new(MockDatastore::new());
        let client = Client::new(ClientConfig::new("proj"), service.clone());
        (client, service)
    }

    fn keyed_entity(id: i64) -> Entity {
        Entity::with_key(Key::new("proj", "tasks").with_id(id))
    }

    #[test]
    fn exposes_configuration() {
        let service = Arc::new(MockDatastore::new());
        let config = ClientConfig::new("proj").with_namespace("staging");
        let client = Client::new(config, service);
        assert_eq!(client.project(), "proj");
        assert_eq!(client.namespace(), Some("staging"));
    }

    #[test]
    fn one_shot_put_commits_immediately() {
        let (client, service) = test_client();
        client.put(&keyed_entity(1)).unwrap();

        assert_eq!(service.commit_count(), 1);
        let request = service.last_commit().unwrap();
        assert_eq!(request.mode, CommitMode::NonTransactional);
        assert_eq!(request.mutations.len(), 1);
        assert!(client.stack().is_empty());
    }

    #[test]
    fn one_shot_delete_commits_immediately() {
        let (client, service) = test_client();
        client.delete(&Key::new("proj", "tasks").with_id(1)).unwrap();

        assert_eq!(service.commit_count(), 1);
        let request = service.last_commit().unwrap();
        assert!(!request.mutations[0].is_upsert());
    }

    #[test]
    fn one_shot_validation_failure_sends_nothing() {
        let (client, service) = test_client();
        let err = client.put(&Entity::new()).unwrap_err();
        assert!(matches!(err, ClientError::MissingKey));
        assert_eq!(service.commit_count(), 0);
    }

    #[test]
    fn put_routes_to_the_stacked_batch() {
        let (client, service) = test_client();
        let batch = client.batch();
        batch.begin().unwrap();
        client.stack().push(UnitOfWork::Batch(batch.clone()));

        client.put(&keyed_entity(1)).unwrap();
        assert_eq!(batch.mutation_count(), 1);
        assert_eq!(service.commit_count(), 0);

        client.stack().pop();
    }

    #[test]
    fn put_routes_to_the_innermost_unit() {
        let (client, _) = test_client();
        let txn = client.transaction();
        txn.begin().unwrap();
        let batch = client.batch();
        batch.begin().unwrap();

        client.stack().push(UnitOfWork::Transaction(txn.clone()));
        client.stack().push(UnitOfWork::Batch(batch.clone()));

        client.put(&keyed_entity(1)).unwrap();
        assert_eq!(batch.mutation_count(), 1);
        assert_eq!(txn.mutation_count(), 0);
    }

    #[test]
    fn current_transaction_is_masked_by_a_batch_on_top() {
        let (client, _) = test_client();
        let txn = client.transaction();
        let batch = client.batch();

        client.stack().push(UnitOfWork::Transaction(txn.clone()));
        assert!(client
            .current_transaction()
            .is_some_and(|top| top.same_transaction(&txn)));

        client.stack().push(UnitOfWork::Batch(batch));
        assert!(client.current_transaction().is_none());
        assert!(client.current().is_some());

        client.stack().pop();
        assert!(client
            .current_transaction()
            .is_some_and(|top| top.same_transaction(&txn)));
    }

    #[test]
    fn clones_share_the_stack() {
        let (client, _) = test_client();
        let other = client.clone();

        client
            .stack()
            .push(UnitOfWork::Batch(client.batch()));
        assert_eq!(other.stack().depth(), 1);
        assert!(other.current().is_some());
    }
}
