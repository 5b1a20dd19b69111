//! Guestbook example - staged writes against an in-memory datastore.
//!
//! This example demonstrates core cirrus_client functionality:
//! - Creating a client over an in-memory datastore
//! - Committing entities inside a scoped transaction
//! - Server-assigned key patch-back for partial keys
//! - Routing `client.put` to the innermost open scope
//! - Grouping cleanup writes in a batch
//!
//! Run with: cargo run -p cirrus_client --example guestbook

use std::sync::Arc;

use cirrus_client::{Client, ClientConfig, MemoryDatastore};
use cirrus_types::{Entity, Key, Value};
use tracing_subscriber::EnvFilter;

const PROJECT: &str = "guestbook";

fn signed_entry(author: &str, message: &str) -> Entity {
    // Partial key: the server assigns the id at commit time.
    let entity = Entity::with_key(Key::new(PROJECT, "entries"));
    entity.set("author", author);
    entity.set("message", message);
    entity
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .init();

    println!("Guestbook Example");
    println!("=================\n");

    let store = Arc::new(MemoryDatastore::new());
    let client = Client::new(ClientConfig::new(PROJECT), store.clone());
    println!("[OK] Client connected to in-memory datastore");

    // Sign the guestbook inside a transaction. All three entries commit
    // atomically, and the server assigns ids to their partial keys.
    let entries = vec![
        signed_entry("ada", "first!"),
        signed_entry("grace", "lovely place"),
        signed_entry("edsger", "consider a simpler layout"),
    ];

    println!("\n[+] Signing the guestbook ({} entries)...", entries.len());
    let txn = client.transaction();
    txn.run(|txn| {
        for entry in &entries {
            txn.put(entry)?;
        }
        Ok(())
    })?;
    println!("[OK] Committed, server assigned the missing ids");

    for entry in &entries {
        let key = entry.key().ok_or("entry lost its key")?;
        let author = match entry.get("author") {
            Some(Value::Text(author)) => author,
            _ => "unknown".to_string(),
        };
        println!("  {key} signed by {author}");
    }

    // Stage through the client: the innermost open scope receives the
    // write, so this put lands in the transaction opened here.
    println!("\n[~] Amending an entry through the client...");
    let txn = client.transaction();
    txn.run(|_| {
        let amended = entries[2].clone();
        amended.set("message", "nice guestbook");
        client.put(&amended)?;
        Ok(())
    })?;
    println!("[OK] Entry amended in place");

    // Batches group writes into one non-transactional request.
    println!("\n[-] Clearing the guestbook with a batch...");
    let batch = client.batch();
    batch.run(|batch| {
        for entry in &entries {
            if let Some(key) = entry.key() {
                batch.delete(&key)?;
            }
        }
        Ok(())
    })?;
    println!("[OK] Removed {} entries", entries.len());

    println!("\n[*] Records left in the store: {}", store.record_count());
    Ok(())
}
