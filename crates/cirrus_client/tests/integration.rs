//! Integration tests running the client against the in-memory server.

use std::sync::Arc;

use cirrus_client::{Client, ClientConfig, ClientError, MemoryDatastore};
use cirrus_types::{Entity, Key, KeyId, Value};

const PROJECT: &str = "guestbook";

fn harness() -> (Client, Arc<MemoryDatastore>) {
    let store = Arc::new(MemoryDatastore::new());
    let client = Client::new(ClientConfig::new(PROJECT), store.clone());
    (client, store)
}

fn entry(text: &str) -> Entity {
    let entity = Entity::with_key(Key::new(PROJECT, "entries"));
    entity.set("text", text);
    entity
}

#[test]
fn scoped_transaction_commits_and_patches_keys() {
    let (client, store) = harness();

    let first = entry("hello");
    let second = entry("world");

    let txn = client.transaction();
    txn.run(|txn| {
        txn.put(&first)?;
        txn.put(&second)?;
        Ok(())
    })
    .unwrap();

    // Both partial keys were completed by the server.
    let first_key = first.key().unwrap();
    let second_key = second.key().unwrap();
    assert!(first_key.is_complete());
    assert!(second_key.is_complete());
    assert_ne!(first_key.final_id(), second_key.final_id());

    // The records landed under exactly those keys.
    assert_eq!(store.record_count(), 2);
    let record = store.get(&first_key).unwrap();
    assert_eq!(record.get("text"), Some(&Value::from("hello")));

    // The server-side transaction was consumed.
    assert_eq!(store.open_transaction_count(), 0);
    assert!(client.stack().is_empty());
}

#[test]
fn scoped_transaction_rolls_back_on_error() {
    let (client, store) = harness();

    let txn = client.transaction();
    let err = txn
        .run(|txn| {
            txn.put(&entry("doomed"))?;
            Err::<(), _>(ClientError::service_fault("validation rejected"))
        })
        .unwrap_err();

    assert!(err.to_string().contains("validation rejected"));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.open_transaction_count(), 0);
    assert!(client.stack().is_empty());
}

#[test]
fn nested_batch_masks_the_outer_transaction() {
    let (client, store) = harness();

    let outer = client.transaction();
    let inner = client.batch();
    let in_txn = entry("in the transaction");
    let in_batch = Entity::with_key(Key::new(PROJECT, "entries").with_id(500));
    in_batch.set("text", "in the batch");

    outer
        .run(|outer| {
            client.put(&in_txn)?;
            assert!(client
                .current_transaction()
                .is_some_and(|top| top.same_transaction(outer)));

            inner.run(|_| {
                // The batch is innermost now: routed writes go to it and
                // it masks the transaction underneath.
                client.put(&in_batch)?;
                assert!(client.current_transaction().is_none());
                assert_eq!(client.stack().depth(), 2);
                Ok(())
            })?;

            // The batch committed on scope exit, before the transaction.
            assert_eq!(store.record_count(), 1);
            assert!(client
                .current_transaction()
                .is_some_and(|top| top.same_transaction(outer)));
            Ok(())
        })
        .unwrap();

    assert_eq!(store.record_count(), 2);
    assert_eq!(outer.mutation_count(), 0);
    assert!(client.stack().is_empty());

    let record = store.get(&in_txn.key().unwrap()).unwrap();
    assert_eq!(record.get("text"), Some(&Value::from("in the transaction")));
}

#[test]
fn transaction_opened_inside_a_batch_becomes_current() {
    let (client, store) = harness();

    let outer = client.transaction();
    let batch = client.batch();
    let innermost = client.transaction();

    outer
        .run(|outer| {
            batch.run(|_| {
                // The batch masks the outer transaction.
                assert!(client.current_transaction().is_none());

                innermost.run(|innermost| {
                    // A transaction stacked above the batch is current
                    // again and takes the routed write.
                    assert_eq!(client.stack().depth(), 3);
                    assert_eq!(store.open_transaction_count(), 2);
                    assert!(client
                        .current_transaction()
                        .is_some_and(|top| top.same_transaction(innermost)));

                    client.put(&entry("innermost"))?;
                    assert_eq!(innermost.mutation_count(), 1);
                    assert_eq!(outer.mutation_count(), 0);
                    Ok(())
                })?;

                // Unwinding one level re-exposes the batch mask.
                assert!(client.current_transaction().is_none());
                assert_eq!(client.stack().depth(), 2);
                Ok(())
            })?;

            assert!(client
                .current_transaction()
                .is_some_and(|top| top.same_transaction(outer)));
            Ok(())
        })
        .unwrap();

    // Every scope closed in order: nothing current, nothing open.
    assert!(client.current_transaction().is_none());
    assert!(client.stack().is_empty());
    assert_eq!(store.record_count(), 1);
    assert_eq!(store.open_transaction_count(), 0);
}

#[test]
fn one_shot_writes_commit_without_a_scope() {
    let (client, store) = harness();

    let keyed = Entity::with_key(Key::new(PROJECT, "entries").with_id(7));
    keyed.set("text", "one shot");
    client.put(&keyed).unwrap();
    assert_eq!(store.record_count(), 1);

    client.delete(&Key::new(PROJECT, "entries").with_id(7)).unwrap();
    assert_eq!(store.record_count(), 0);
}

#[test]
fn patch_back_is_visible_through_every_clone() {
    let (client, _store) = harness();

    let original = entry("shared");
    let held_elsewhere = original.clone();

    let txn = client.transaction();
    txn.run(|txn| {
        txn.put(&original)?;
        Ok(())
    })
    .unwrap();

    let key = held_elsewhere.key().unwrap();
    assert!(key.is_complete());
    assert!(matches!(key.final_id(), Some(KeyId::Id(_))));
}

#[test]
fn assigned_ids_follow_staging_order() {
    let (client, store) = harness();

    let entries: Vec<Entity> = (0..5).map(|n| entry(&format!("entry {n}"))).collect();

    let txn = client.transaction();
    txn.run(|txn| {
        for entity in &entries {
            txn.put(entity)?;
        }
        Ok(())
    })
    .unwrap();

    // The in-memory server assigns ascending ids in mutation order.
    let ids: Vec<i64> = entries
        .iter()
        .map(|entity| {
            let key = entity.key().unwrap();
            match key.final_id() {
                Some(KeyId::Id(id)) => *id,
                other => panic!("expected numeric id, got {other:?}"),
            }
        })
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    assert_eq!(store.record_count(), 5);
}

#[test]
fn tombstoned_transaction_rejects_reuse() {
    let (client, store) = harness();

    let txn = client.transaction();
    txn.run(|txn| {
        txn.put(&entry("only run"))?;
        Ok(())
    })
    .unwrap();

    let err = txn.begin().unwrap_err();
    assert!(err.is_state_violation());
    let err = txn.commit().unwrap_err();
    assert!(err.is_state_violation());

    // Nothing else reached the server.
    assert_eq!(store.record_count(), 1);
}

#[test]
fn sequential_scopes_reuse_the_same_client() {
    let (client, store) = harness();

    for n in 0..3 {
        let txn = client.transaction();
        txn.run(|txn| {
            txn.put(&entry(&format!("round {n}")))?;
            Ok(())
        })
        .unwrap();
        assert!(client.stack().is_empty());
    }

    assert_eq!(store.record_count(), 3);
    assert_eq!(store.open_transaction_count(), 0);
}
