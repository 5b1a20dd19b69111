//! # Cirrus Client
//!
//! Client-side transaction coordinator for the Cirrus datastore.
//!
//! This crate provides:
//! - Batches (one non-transactional commit per buffer)
//! - Transactions (begin → buffer → atomic commit, with rollback)
//! - Server-assigned key patch-back onto partial-key entities
//! - A per-client stack routing staged work to the innermost scope
//! - Long-running operation polling with pluggable metadata decoders
//! - RPC service abstraction with scriptable and in-memory doubles
//!
//! ## Architecture
//!
//! Mutations are never sent one at a time. A unit of work (a [`Batch`] or
//! a [`Transaction`]) buffers upserts and deletes in staging order and
//! flushes the whole buffer in a single commit RPC. Until that commit,
//! nothing has left the process; after a rollback, nothing ever does.
//!
//! Units of work nest on a per-client stack. [`Client::put`] and
//! [`Client::delete`] route to whatever is innermost, and
//! [`Batch::run`]/[`Transaction::run`] keep the stack balanced on every
//! exit path.
//!
//! ## Key Invariants
//!
//! - Mutations are applied in staging order
//! - A commit either applies the whole buffer or none of it
//! - Transport failures of begin and commit leave the unit retryable
//! - Aborted and committed units are tombstoned and cannot be reused
//! - Server-assigned keys patch staged entities first to last

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod client;
mod config;
mod error;
mod memory;
mod operations;
mod service;
mod stack;
mod status;
mod transaction;

pub use batch::Batch;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use memory::MemoryDatastore;
pub use operations::{
    type_url_for, MetadataRegistry, Operation, OperationsRpc, DEFAULT_TYPE_URL_PREFIX,
};
pub use service::{DatastoreRpc, MockDatastore, ServiceCall};
pub use stack::{UnitOfWork, WorkStack};
pub use status::Status;
pub use transaction::Transaction;
