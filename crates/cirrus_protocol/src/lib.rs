//! # Cirrus Protocol
//!
//! RPC message types for the Cirrus datastore client.
//!
//! This crate provides:
//! - Transaction identifiers
//! - Mutations (upsert, delete) and commit modes
//! - Begin/commit/rollback request and response shapes
//! - Status messages for long-running server operations
//!
//! These are plain data types consumed by the client coordinator and
//! produced by transport implementations. The wire encoding of these
//! messages is owned by the transport, not by this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;
mod mutation;
mod operation;
mod types;

pub use messages::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse,
    MutationResult, RollbackRequest, RollbackResponse,
};
pub use mutation::{CommitMode, Mutation};
pub use operation::{AnyPayload, GetOperationRequest, OperationStatus};
pub use types::TransactionId;
