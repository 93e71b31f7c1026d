//! # chatlaxy-auth
//!
//! Identity-service abstraction for the ChatLaxy client: the
//! [`IdentityBackend`] trait the synchronization core drives, the session
//! data it produces, and [`MemoryIdentity`], an in-memory backend with the
//! same transition semantics for tests and local development.

pub mod backend;
pub mod memory;
pub mod session;

mod error;

pub use backend::{IdentityBackend, SessionEvents};
pub use error::AuthError;
pub use memory::MemoryIdentity;
pub use session::{DisplayAttributes, NewAccount, Session, SessionChange};
