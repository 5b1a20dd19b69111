//! # Cirrus Types
//!
//! Key, value, and entity types for the Cirrus datastore client.
//!
//! This crate provides:
//! - Hierarchical record keys with partial/complete semantics
//! - Property values
//! - Entities as cheap-clone handles with shared state
//!
//! Keys identify records by a path of `(kind, id)` elements scoped to a
//! project and optional namespace. A key whose final element has no
//! identifier yet is *partial*: the server assigns the missing numeric id
//! when the enclosing mutation commits, and the client writes it back onto
//! the same entity the application staged.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod key;
mod value;

pub use entity::Entity;
pub use error::KeyError;
pub use key::{Key, KeyId, PathElement};
pub use value::Value;
