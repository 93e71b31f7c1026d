//! In-memory [`DocumentBackend`].
//!
//! Holds every collection in a single mutex so each write commits atomically
//! with its fanout: watchers observe snapshots in commit order, never a
//! half-applied write. Commit timestamps come from a monotonic clock that is
//! strictly later than every previous commit, so `ServerTime` fields form a
//! total order even for writes landing within the same wall-clock instant.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use chatlaxy_shared::stream::{self, SubscriptionSender};

use crate::backend::{DocFeed, DocumentBackend, QueryFeed};
use crate::document::{Document, Field};
use crate::error::{Result, StoreError};
use crate::query::{DocSnapshot, Direction, Query, QuerySnapshot};

/// A stored document plus its commit sequence number.
///
/// The sequence number breaks ordering ties between documents whose order
/// field holds the same instant.
struct StoredDoc {
    doc: Document,
    seq: u64,
}

struct DocWatcher {
    collection: String,
    id: String,
    tx: SubscriptionSender<DocSnapshot>,
}

struct QueryWatcher {
    query: Query,
    tx: SubscriptionSender<QuerySnapshot>,
}

struct StoreState {
    collections: HashMap<String, BTreeMap<String, StoredDoc>>,
    doc_watchers: Vec<DocWatcher>,
    query_watchers: Vec<QueryWatcher>,
    clock: DateTime<Utc>,
    seq: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            doc_watchers: Vec::new(),
            query_watchers: Vec::new(),
            clock: DateTime::<Utc>::MIN_UTC,
            seq: 0,
        }
    }
}

impl StoreState {
    /// Commit timestamp, strictly later than every previous commit.
    fn server_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.clock = if now > self.clock {
            now
        } else {
            self.clock + Duration::milliseconds(1)
        };
        self.clock
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

enum WriteMode {
    Replace,
    Merge,
}

/// In-memory document store. `Clone` shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // Poisoning is not treated as fatal; the guarded state stays usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, collection: &str, id: &str, incoming: Document, mode: WriteMode) -> Result<()> {
        let mut state = self.state();
        let now = state.server_time();
        let seq = state.next_seq();

        let docs = state.collections.entry(collection.to_string()).or_default();
        let doc = match mode {
            WriteMode::Replace => {
                let mut doc = incoming;
                doc.resolve_server_time(now);
                doc
            }
            WriteMode::Merge => {
                let Some(existing) = docs.get(id) else {
                    return Err(StoreError::NotFound);
                };
                let mut patch = incoming;
                patch.resolve_server_time(now);
                let mut doc = existing.doc.clone();
                doc.merge_from(&patch);
                doc
            }
        };
        docs.insert(id.to_string(), StoredDoc { doc, seq });

        notify(&mut state, collection, id);
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for MemoryStore {
    async fn create(&self, collection: &str, doc: Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.write(collection, &id, doc, WriteMode::Replace)?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        self.write(collection, id, doc, WriteMode::Replace)
    }

    async fn merge(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        self.write(collection, id, patch, WriteMode::Merge)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let state = self.state();
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| stored.doc.clone()))
    }

    fn subscribe_doc(&self, collection: &str, id: &str) -> DocFeed {
        let mut state = self.state();
        let (tx, subscription) = stream::channel();

        let doc = state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| stored.doc.clone());
        tx.send(DocSnapshot {
            id: id.to_string(),
            doc,
        });

        state.doc_watchers.push(DocWatcher {
            collection: collection.to_string(),
            id: id.to_string(),
            tx,
        });
        subscription
    }

    fn subscribe_query(&self, query: Query) -> QueryFeed {
        let mut state = self.state();
        let (tx, subscription) = stream::channel();

        tx.send(evaluate(&state.collections, &query));
        state.query_watchers.push(QueryWatcher { query, tx });
        subscription
    }
}

/// Pushes fresh snapshots to every watcher affected by a write and prunes
/// watchers whose consumer has gone away.
fn notify(state: &mut StoreState, collection: &str, id: &str) {
    let StoreState {
        collections,
        doc_watchers,
        query_watchers,
        ..
    } = state;

    doc_watchers.retain(|w| {
        if w.collection != collection || w.id != id {
            return w.tx.is_live();
        }
        let doc = collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| stored.doc.clone());
        w.tx.send(DocSnapshot {
            id: id.to_string(),
            doc,
        })
    });

    query_watchers.retain(|w| {
        if w.query.collection != collection {
            return w.tx.is_live();
        }
        w.tx.send(evaluate(collections, &w.query))
    });
}

/// Ordering key over the supported orderable field kinds.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Time(DateTime<Utc>),
    Text(&'a str),
}

fn sort_key<'a>(doc: &'a Document, field: &str) -> Option<SortKey<'a>> {
    match doc.get(field)? {
        Field::Timestamp(ts) => Some(SortKey::Time(*ts)),
        Field::Text(s) => Some(SortKey::Text(s)),
        Field::ServerTime => None,
    }
}

fn evaluate(
    collections: &HashMap<String, BTreeMap<String, StoredDoc>>,
    query: &Query,
) -> QuerySnapshot {
    let Some(docs) = collections.get(&query.collection) else {
        return QuerySnapshot::default();
    };

    let mut rows: Vec<(SortKey<'_>, u64, &str, &Document)> = docs
        .iter()
        .filter_map(|(id, stored)| {
            sort_key(&stored.doc, &query.order_by)
                .map(|key| (key, stored.seq, id.as_str(), &stored.doc))
        })
        .collect();

    rows.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
    if let Direction::Descending = query.direction {
        rows.reverse();
    }
    rows.truncate(query.limit);

    QuerySnapshot {
        docs: rows
            .into_iter()
            .map(|(_, _, id, doc)| (id.to_string(), doc.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, min, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = MemoryStore::new();
        let doc = Document::new().with("text", Field::text("hello"));

        let id = store.create("messages", doc).await.unwrap();
        let stored = store.get("messages", &id).await.unwrap().unwrap();

        assert_eq!(stored.text("text").unwrap(), "hello");
        assert!(store.get("messages", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_requires_existing() {
        let store = MemoryStore::new();
        let patch = Document::new().with("bio", Field::text("hi"));

        let err = store.merge("users", "ghost", patch).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_merge_preserves_other_fields() {
        let store = MemoryStore::new();
        let doc = Document::new()
            .with("username", Field::text("alice"))
            .with("bio", Field::text("old"));
        store.set("users", "u1", doc).await.unwrap();

        let patch = Document::new().with("bio", Field::text("new"));
        store.merge("users", "u1", patch).await.unwrap();

        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored.text("username").unwrap(), "alice");
        assert_eq!(stored.text("bio").unwrap(), "new");
    }

    #[tokio::test]
    async fn test_doc_subscription_sees_writes() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe_doc("users", "u1");

        let initial = feed.next().await.unwrap();
        assert!(!initial.exists());

        let doc = Document::new().with("username", Field::text("alice"));
        store.set("users", "u1", doc).await.unwrap();

        let after = feed.next().await.unwrap();
        let doc = after.doc.unwrap();
        assert_eq!(doc.text("username").unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_query_orders_and_limits() {
        let store = MemoryStore::new();
        for (id, hour) in [("a", 8), ("b", 10), ("c", 9)] {
            let doc = Document::new().with("createdAt", Field::Timestamp(at(hour, 0)));
            store.set("messages", id, doc).await.unwrap();
        }

        let query = Query::new("messages", "createdAt", Direction::Descending, 2);
        let mut feed = store.subscribe_query(query);
        let snapshot = feed.next().await.unwrap();

        let ids: Vec<&str> = snapshot.docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_query_skips_docs_without_order_field() {
        let store = MemoryStore::new();
        store
            .set(
                "messages",
                "dated",
                Document::new().with("createdAt", Field::Timestamp(at(8, 0))),
            )
            .await
            .unwrap();
        store
            .set(
                "messages",
                "undated",
                Document::new().with("text", Field::text("no timestamp")),
            )
            .await
            .unwrap();

        let query = Query::new("messages", "createdAt", Direction::Ascending, 10);
        let mut feed = store.subscribe_query(query);
        let snapshot = feed.next().await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].0, "dated");
    }

    #[tokio::test]
    async fn test_query_snapshot_follows_new_writes() {
        let store = MemoryStore::new();
        let query = Query::new("messages", "createdAt", Direction::Ascending, 10);
        let mut feed = store.subscribe_query(query);
        assert!(feed.next().await.unwrap().is_empty());

        store
            .set(
                "messages",
                "m1",
                Document::new().with("createdAt", Field::ServerTime),
            )
            .await
            .unwrap();

        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_server_time_strictly_increases() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            let doc = Document::new().with("createdAt", Field::ServerTime);
            store.set("messages", id, doc).await.unwrap();
        }

        let a = store.get("messages", "a").await.unwrap().unwrap();
        let b = store.get("messages", "b").await.unwrap().unwrap();
        let c = store.get("messages", "c").await.unwrap().unwrap();

        let ta = a.timestamp("createdAt").unwrap();
        let tb = b.timestamp("createdAt").unwrap();
        let tc = c.timestamp("createdAt").unwrap();
        assert!(ta < tb);
        assert!(tb < tc);
    }

    #[tokio::test]
    async fn test_equal_instant_writes_keep_commit_order() {
        // Drive the clock directly to force the tie-break path.
        let store = MemoryStore::new();
        {
            let mut state = store.state();
            state.clock = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        }

        store
            .set(
                "messages",
                "first",
                Document::new().with("createdAt", Field::ServerTime),
            )
            .await
            .unwrap();
        store
            .set(
                "messages",
                "second",
                Document::new().with("createdAt", Field::ServerTime),
            )
            .await
            .unwrap();

        let first = store.get("messages", "first").await.unwrap().unwrap();
        let second = store.get("messages", "second").await.unwrap().unwrap();
        assert!(
            first.timestamp("createdAt").unwrap() < second.timestamp("createdAt").unwrap()
        );
    }
}
