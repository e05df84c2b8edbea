//! Uniform create/find/update/delete contract per entity collection.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use campus_core::Record;

pub mod filter;
pub mod in_memory;
pub mod populate;

pub use filter::{Filter, Update};
pub use in_memory::InMemoryCollection;
pub use populate::populate;

/// A stored record. Always carries a string `_id` plus `createdAt` /
/// `updatedAt` timestamps.
pub type Document = Record;

/// Backend failures only. "Not found" is never an error: lookups return
/// `None`, deletes return 0.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection '{0}' lock poisoned")]
    Poisoned(String),

    #[error("invalid document for '{collection}': {message}")]
    InvalidDocument { collection: String, message: String },

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Insert and return the stored document (with `_id` and timestamps).
    async fn create(&self, doc: Record) -> Result<Document, StoreError>;

    /// Apply `update` and return the document as it is after the update.
    async fn find_by_id_and_update(&self, id: &str, update: &Update) -> Result<Option<Document>, StoreError>;

    /// Remove and return the removed document.
    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Remove the first match; returns the number removed (0 or 1).
    async fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError>;
}

#[async_trait]
impl<C> Collection for Arc<C>
where
    C: Collection + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        (**self).find_one(filter).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        (**self).find(filter).await
    }

    async fn create(&self, doc: Record) -> Result<Document, StoreError> {
        (**self).create(doc).await
    }

    async fn find_by_id_and_update(&self, id: &str, update: &Update) -> Result<Option<Document>, StoreError> {
        (**self).find_by_id_and_update(id, update).await
    }

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError> {
        (**self).find_by_id_and_delete(id).await
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError> {
        (**self).delete_one(filter).await
    }
}
