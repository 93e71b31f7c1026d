//! Ordered, windowed collection queries and the snapshots they produce.

use crate::document::Document;

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A windowed view over one collection, ordered by a single field.
///
/// Documents that do not carry the ordering field are not part of the
/// result set.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub order_by: String,
    pub direction: Direction,
    pub limit: usize,
}

impl Query {
    pub fn new(
        collection: impl Into<String>,
        order_by: impl Into<String>,
        direction: Direction,
        limit: usize,
    ) -> Self {
        Self {
            collection: collection.into(),
            order_by: order_by.into(),
            direction,
            limit,
        }
    }
}

/// Point-in-time result of a [`Query`]: id/document pairs in query order.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    pub docs: Vec<(String, Document)>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Point-in-time state of a single watched document.
///
/// `doc` is `None` while the document does not exist, which is a normal
/// state for a watcher attached before the first write.
#[derive(Debug, Clone)]
pub struct DocSnapshot {
    pub id: String,
    pub doc: Option<Document>,
}

impl DocSnapshot {
    pub fn exists(&self) -> bool {
        self.doc.is_some()
    }
}
