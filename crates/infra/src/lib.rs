//! Infrastructure layer: the persistence collaborator.
//!
//! Capabilities only see the [`Collection`] contract. The in-memory
//! implementation backs dev/test; a real database adapter plugs in behind
//! the same trait.

pub mod collections;
pub mod store;

pub use collections::Collections;
pub use store::{Collection, Document, Filter, InMemoryCollection, StoreError, Update, populate};
