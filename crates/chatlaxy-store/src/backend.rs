//! Backend abstraction the typed store helpers are built on.

use async_trait::async_trait;

use chatlaxy_shared::Subscription;

use crate::document::Document;
use crate::error::Result;
use crate::query::{DocSnapshot, Query, QuerySnapshot};

/// Change feed for one watched document.
pub type DocFeed = Subscription<DocSnapshot>;

/// Change feed for one watched query.
pub type QueryFeed = Subscription<QuerySnapshot>;

/// A document database the client can read, write, and watch.
///
/// Subscriptions emit the current state immediately on attach, then a fresh
/// snapshot after every write that affects them. Emission order matches
/// commit order, so a consumer that folds snapshots converges on the stored
/// state without diffing.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Creates a document under a backend-assigned id and returns the id.
    async fn create(&self, collection: &str, doc: Document) -> Result<String>;

    /// Creates or fully replaces the document at `id`.
    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()>;

    /// Partially updates an existing document.
    ///
    /// Fields in `patch` overwrite, fields absent from it survive. Fails
    /// with [`StoreError::NotFound`](crate::StoreError::NotFound) when the
    /// document does not exist; a merge never creates.
    async fn merge(&self, collection: &str, id: &str, patch: Document) -> Result<()>;

    /// Reads a document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Watches a single document.
    fn subscribe_doc(&self, collection: &str, id: &str) -> DocFeed;

    /// Watches a query.
    fn subscribe_query(&self, query: Query) -> QueryFeed;
}
