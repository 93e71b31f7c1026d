//! # chatlaxy-store
//!
//! Remote document storage for the ChatLaxy client.
//!
//! Data lives in schemaless collections behind the [`DocumentBackend`]
//! abstraction, which offers push-style subscriptions for single documents
//! and for ordered, windowed queries. The crate exposes a cloneable
//! [`ChatStore`] handle with typed helpers for the two chat collections,
//! plus [`MemoryStore`], an in-memory backend with the same snapshot
//! semantics for tests and local development.

pub mod backend;
pub mod document;
pub mod memory;
pub mod messages;
pub mod models;
pub mod profiles;
pub mod query;
pub mod store;

mod error;

pub use backend::{DocFeed, DocumentBackend, QueryFeed};
pub use document::{Document, Field};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use models::*;
pub use query::{Direction, DocSnapshot, Query, QuerySnapshot};
pub use store::ChatStore;
