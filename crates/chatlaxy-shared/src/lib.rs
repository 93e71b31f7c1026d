//! # chatlaxy-shared
//!
//! Types and primitives shared by every ChatLaxy crate: identifiers, the
//! closed [`Rank`](rank::Rank) classification, protocol constants,
//! client-side validation errors, and the cancellable subscription stream
//! both backend abstractions deliver snapshots through.

pub mod constants;
pub mod error;
pub mod rank;
pub mod stream;
pub mod types;

pub use error::InputError;
pub use rank::{Rank, RankStyle};
pub use stream::{CancelToken, Subscription, SubscriptionSender};
pub use types::{MessageId, Presence, ProfileId};
