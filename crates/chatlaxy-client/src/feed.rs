//! The bounded live message window.
//!
//! The subscription always delivers the full current window, newest first,
//! so folding a snapshot is a replacement, never an append. Display order
//! (oldest first) and author grouping are re-derived from scratch on every
//! rebuild.

use tracing::{debug, info, warn};

use chatlaxy_shared::{InputError, MessageId};
use chatlaxy_store::{ChatStore, Message, Profile, QueryFeed, QuerySnapshot};

use crate::error::ChatError;
use crate::view::FeedMessage;

/// Marks each message that starts a run of consecutive same-author
/// messages. Only run leaders render the author header; the rest of a run
/// is displayed as a continuation.
pub fn group_consecutive(messages: &[Message]) -> Vec<FeedMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(idx, message)| FeedMessage {
            run_leader: idx == 0 || messages[idx - 1].author_id != message.author_id,
            message: message.clone(),
        })
        .collect()
}

/// The message watcher and send path for the current session.
pub struct MessageFeed {
    store: ChatStore,
    window: usize,
    active: Option<ActiveFeed>,
}

struct ActiveFeed {
    feed: QueryFeed,
    messages: Vec<Message>,
    feed_open: bool,
}

impl MessageFeed {
    pub fn new(store: ChatStore, window: usize) -> Self {
        Self {
            store,
            window,
            active: None,
        }
    }

    /// Opens the message subscription. Starting over a running feed
    /// replaces it.
    pub fn start(&mut self) {
        self.stop();
        let feed = self.store.watch_messages(self.window);
        info!(window = self.window, "message feed started");
        self.active = Some(ActiveFeed {
            feed,
            messages: Vec::new(),
            feed_open: true,
        });
    }

    /// Cancels the subscription. Safe to call repeatedly or before the
    /// first start.
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            info!("message feed stopped");
        }
    }

    /// Waits for the next window snapshot. Pends forever while stopped or
    /// after the feed has closed.
    pub async fn next_snapshot(&mut self) -> QuerySnapshot {
        let Some(active) = self.active.as_mut() else {
            return futures::future::pending().await;
        };
        if !active.feed_open {
            return futures::future::pending().await;
        }
        match active.feed.next().await {
            Some(snapshot) => snapshot,
            None => {
                active.feed_open = false;
                futures::future::pending().await
            }
        }
    }

    /// Replaces the window with a fresh snapshot.
    ///
    /// The snapshot arrives newest first; it is clamped to the window and
    /// flipped into display order. Documents that fail to decode are
    /// logged and skipped.
    pub fn apply_snapshot(&mut self, snapshot: QuerySnapshot) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let mut messages = Vec::with_capacity(snapshot.len().min(self.window));
        for (id, doc) in &snapshot.docs {
            match Message::from_document(id, doc) {
                Ok(message) => messages.push(message),
                Err(e) => warn!(id = %id, error = %e, "skipping malformed message"),
            }
        }
        messages.truncate(self.window);
        messages.reverse();
        debug!(count = messages.len(), "message window replaced");
        active.messages = messages;
    }

    /// The current window in display order.
    pub fn messages(&self) -> &[Message] {
        self.active
            .as_ref()
            .map(|active| active.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Appends one message stamped with the sender's profile fields.
    ///
    /// A body that is blank after trimming is rejected before any write;
    /// an accepted body is stored exactly as typed, whitespace included.
    pub async fn send(&self, sender: &Profile, body: &str) -> Result<MessageId, ChatError> {
        if body.trim().is_empty() {
            return Err(InputError::EmptyMessage.into());
        }
        let id = self.store.create_message(&sender.author_snapshot(), body).await?;
        debug!(id = %id, author = %sender.id, "message sent");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlaxy_shared::{ProfileId, Rank};
    use chatlaxy_store::{Document, Field, NewProfile};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_560_000 + secs, 0).unwrap()
    }

    fn message(id: &str, author: &str, sent_at: DateTime<Utc>) -> Message {
        Message {
            id: MessageId(id.to_string()),
            body: format!("message {id}"),
            author_id: ProfileId::from(author),
            author_name: author.to_string(),
            author_avatar_ref: "https://img/a.png".to_string(),
            author_rank: Rank::User,
            sent_at,
        }
    }

    fn message_doc(author: &str, body: &str, sent_at: DateTime<Utc>) -> Document {
        Document::new()
            .with("text", Field::text(body))
            .with("uid", Field::text(author))
            .with("username", Field::text(author))
            .with("photoURL", Field::text("https://img/a.png"))
            .with("rank", Field::text("User"))
            .with("createdAt", Field::Timestamp(sent_at))
    }

    #[test]
    fn test_grouping_marks_run_leaders() {
        let messages = vec![
            message("m1", "alice", at(0)),
            message("m2", "alice", at(1)),
            message("m3", "bob", at(2)),
            message("m4", "alice", at(3)),
            message("m5", "alice", at(4)),
        ];

        let grouped = group_consecutive(&messages);
        let leaders: Vec<bool> = grouped.iter().map(|m| m.run_leader).collect();
        assert_eq!(leaders, vec![true, false, true, true, false]);
    }

    #[test]
    fn test_grouping_is_stable_across_rebuilds() {
        let messages = vec![
            message("m1", "alice", at(0)),
            message("m2", "alice", at(1)),
            message("m3", "bob", at(2)),
        ];

        let first = group_consecutive(&messages);
        let second = group_consecutive(&messages);
        assert_eq!(first, second);
        assert!(group_consecutive(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_clamps_and_flips_to_display_order() {
        let store = ChatStore::in_memory();
        let mut feed = MessageFeed::new(store, 3);
        feed.start();

        // Five messages, newest first, as the subscription delivers them.
        let snapshot = QuerySnapshot {
            docs: (0..5)
                .map(|i| {
                    let body = format!("m{}", 4 - i);
                    (body.clone(), message_doc("alice", &body, at(4 - i)))
                })
                .collect(),
        };
        feed.apply_snapshot(snapshot);

        let bodies: Vec<&str> = feed.messages().iter().map(|m| m.body.as_str()).collect();
        // Clamped to the three newest, oldest first for display.
        assert_eq!(bodies, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_blank_body_rejected_before_write() {
        let store = ChatStore::in_memory();
        store
            .create_profile(&NewProfile::signup(
                ProfileId::from("u1"),
                "alice",
                "a@example.com",
            ))
            .await
            .unwrap();
        let sender = store
            .get_profile(&ProfileId::from("u1"))
            .await
            .unwrap()
            .unwrap();

        let mut feed = MessageFeed::new(store.clone(), 50);
        feed.start();
        let initial = feed.next_snapshot().await;
        assert!(initial.is_empty());

        let err = feed.send(&sender, "   \n\t ").await.unwrap_err();
        assert_eq!(err, ChatError::Input(InputError::EmptyMessage));

        // No snapshot follows a rejected send; the store saw no write.
        let accepted = feed.send(&sender, "  padded  ").await;
        assert!(accepted.is_ok());
        let snapshot = feed.next_snapshot().await;
        assert_eq!(snapshot.len(), 1);
        let (id, doc) = &snapshot.docs[0];
        let stored = Message::from_document(id, doc).unwrap();
        assert_eq!(stored.body, "  padded  ");
        assert_eq!(stored.author_name, "alice");
    }

    #[tokio::test]
    async fn test_live_feed_tracks_new_messages() {
        let store = ChatStore::in_memory();
        store
            .create_profile(&NewProfile::signup(
                ProfileId::from("u1"),
                "alice",
                "a@example.com",
            ))
            .await
            .unwrap();
        let sender = store
            .get_profile(&ProfileId::from("u1"))
            .await
            .unwrap()
            .unwrap();

        let mut feed = MessageFeed::new(store.clone(), 50);
        feed.start();
        let snapshot = feed.next_snapshot().await;
        feed.apply_snapshot(snapshot);
        assert!(feed.messages().is_empty());

        feed.send(&sender, "first").await.unwrap();
        feed.send(&sender, "second").await.unwrap();
        let snapshot = feed.next_snapshot().await;
        feed.apply_snapshot(snapshot);
        let snapshot = feed.next_snapshot().await;
        feed.apply_snapshot(snapshot);

        let bodies: Vec<&str> = feed.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);

        let grouped = group_consecutive(feed.messages());
        assert!(grouped[0].run_leader);
        assert!(!grouped[1].run_leader);
    }
}
