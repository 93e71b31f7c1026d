use chatlaxy_shared::constants::MESSAGES_COLLECTION;
use chatlaxy_shared::MessageId;

use crate::backend::QueryFeed;
use crate::document::{Document, Field};
use crate::error::Result;
use crate::models::AuthorSnapshot;
use crate::query::{Direction, Query};
use crate::store::ChatStore;

impl ChatStore {
    /// Appends a message stamped with the given author fields.
    ///
    /// The body is stored exactly as passed; `createdAt` comes from the
    /// server clock. Returns the backend-assigned id.
    pub async fn create_message(&self, author: &AuthorSnapshot, body: &str) -> Result<MessageId> {
        let id = self
            .backend()
            .create(MESSAGES_COLLECTION, outgoing_document(author, body))
            .await?;
        tracing::debug!(id = %id, author = %author.id, "message stored");
        Ok(MessageId(id))
    }

    /// Watches the `limit` most recent messages, newest first.
    pub fn watch_messages(&self, limit: usize) -> QueryFeed {
        self.backend().subscribe_query(Query::new(
            MESSAGES_COLLECTION,
            "createdAt",
            Direction::Descending,
            limit,
        ))
    }
}

fn outgoing_document(author: &AuthorSnapshot, body: &str) -> Document {
    Document::new()
        .with("text", Field::text(body))
        .with("uid", Field::text(author.id.as_str()))
        .with("username", Field::text(&author.display_name))
        .with("photoURL", Field::text(&author.avatar_ref))
        .with("rank", Field::text(author.rank.as_str()))
        .with("createdAt", Field::ServerTime)
}
