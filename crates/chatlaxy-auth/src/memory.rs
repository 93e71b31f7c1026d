//! In-memory [`IdentityBackend`].
//!
//! Reference backend for tests and local development. Credentials are held
//! as salted BLAKE3 digests rather than plaintext, and account creation
//! signs the new session in immediately, matching hosted identity services
//! that return a live session from the signup call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use chatlaxy_shared::stream::{self, SubscriptionSender};
use chatlaxy_shared::ProfileId;

use crate::backend::{IdentityBackend, SessionEvents};
use crate::error::AuthError;
use crate::session::{DisplayAttributes, NewAccount, Session, SessionChange};

/// Key-derivation context for credential digests.
const CREDENTIAL_KDF_CONTEXT: &str = "chatlaxy-credential-digest-v1";

/// Minimum password length accepted at account creation.
pub const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    id: ProfileId,
    email: String,
    display_name: String,
    avatar_ref: Option<String>,
    salt: [u8; 16],
    digest: blake3::Hash,
}

impl Account {
    fn session(&self) -> Session {
        Session {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            avatar_ref: self.avatar_ref.clone(),
        }
    }
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<String, Account>,
    current: Option<Session>,
    watchers: Vec<SubscriptionSender<SessionChange>>,
}

/// In-memory identity service. `Clone` shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    inner: Arc<Mutex<IdentityState>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, IdentityState> {
        // Poisoning is not treated as fatal; the guarded state stays usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityBackend for MemoryIdentity {
    async fn create_account(&self, account: NewAccount) -> Result<Session, AuthError> {
        if account.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let mut guard = self.state();
        let state = &mut *guard;
        if state.accounts.contains_key(&account.email) {
            return Err(AuthError::DuplicateEmail);
        }

        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        let record = Account {
            id: ProfileId(Uuid::new_v4().to_string()),
            email: account.email.clone(),
            display_name: account.display_name,
            avatar_ref: None,
            salt,
            digest: digest_credential(&salt, &account.password),
        };

        let session = record.session();
        state.accounts.insert(account.email, record);
        state.current = Some(session.clone());
        announce(state, SessionChange::SignedIn(session.clone()));
        tracing::info!(id = %session.id, "account created and signed in");
        Ok(session)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(account) = state.accounts.get(email) else {
            return Err(AuthError::InvalidCredential);
        };
        // blake3 hash comparison is constant-time.
        if digest_credential(&account.salt, password) != account.digest {
            return Err(AuthError::InvalidCredential);
        }

        let session = account.session();
        state.current = Some(session.clone());
        announce(state, SessionChange::SignedIn(session.clone()));
        tracing::info!(id = %session.id, "signed in");
        Ok(session)
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        let mut guard = self.state();
        let state = &mut *guard;
        if state.current.take().is_some() {
            announce(state, SessionChange::SignedOut);
            tracing::info!("session ended");
        }
        Ok(())
    }

    async fn update_display_attributes(&self, attrs: DisplayAttributes) -> Result<(), AuthError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(email) = state.current.as_ref().map(|s| s.email.clone()) else {
            return Err(AuthError::NotAuthenticated);
        };

        if let Some(account) = state.accounts.get_mut(&email) {
            if let Some(name) = attrs.display_name {
                account.display_name = name;
            }
            if let Some(avatar) = attrs.avatar_ref {
                account.avatar_ref = Some(avatar);
            }
            state.current = Some(account.session());
        }
        Ok(())
    }

    fn observe(&self) -> SessionEvents {
        let mut state = self.state();
        let (tx, subscription) = stream::channel();

        let change = match &state.current {
            Some(session) => SessionChange::SignedIn(session.clone()),
            None => SessionChange::SignedOut,
        };
        tx.send(change);

        state.watchers.push(tx);
        subscription
    }
}

fn digest_credential(salt: &[u8; 16], password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(CREDENTIAL_KDF_CONTEXT);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

/// Pushes a transition to every watcher and prunes the ones whose consumer
/// has gone away.
fn announce(state: &mut IdentityState, change: SessionChange) {
    state.watchers.retain(|w| w.send(change.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str, name: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "hunter22".to_string(),
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_account_signs_in() {
        let identity = MemoryIdentity::new();
        let session = identity
            .create_account(account("a@example.com", "alice"))
            .await
            .unwrap();

        assert!(!session.id.as_str().is_empty());
        assert_eq!(session.email, "a@example.com");
        assert_eq!(session.display_name, "alice");
        assert!(session.avatar_ref.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let identity = MemoryIdentity::new();
        identity
            .create_account(account("a@example.com", "alice"))
            .await
            .unwrap();

        let err = identity
            .create_account(account("a@example.com", "impostor"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateEmail);
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let identity = MemoryIdentity::new();
        let mut weak = account("a@example.com", "alice");
        weak.password = "12345".to_string();

        let err = identity.create_account(weak).await.unwrap_err();
        assert_eq!(err, AuthError::WeakPassword);
    }

    #[tokio::test]
    async fn test_authenticate_checks_credentials() {
        let identity = MemoryIdentity::new();
        identity
            .create_account(account("a@example.com", "alice"))
            .await
            .unwrap();

        let wrong = identity.authenticate("a@example.com", "wrong-pass").await;
        assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredential);
        let unknown = identity.authenticate("nobody@example.com", "hunter22").await;
        assert_eq!(unknown.unwrap_err(), AuthError::InvalidCredential);

        let session = identity
            .authenticate("a@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(session.display_name, "alice");
    }

    #[tokio::test]
    async fn test_observe_emits_current_state_immediately() {
        let identity = MemoryIdentity::new();
        let mut events = identity.observe();
        assert_eq!(events.next().await, Some(SessionChange::SignedOut));

        identity
            .create_account(account("a@example.com", "alice"))
            .await
            .unwrap();
        let Some(SessionChange::SignedIn(session)) = events.next().await else {
            panic!("expected a signed-in transition");
        };
        assert_eq!(session.email, "a@example.com");

        // A watcher attached mid-session starts from the signed-in state.
        let mut late = identity.observe();
        assert!(matches!(late.next().await, Some(SessionChange::SignedIn(_))));
    }

    #[tokio::test]
    async fn test_end_session_emits_once() {
        let identity = MemoryIdentity::new();
        identity
            .create_account(account("a@example.com", "alice"))
            .await
            .unwrap();
        let mut events = identity.observe();
        assert!(matches!(events.next().await, Some(SessionChange::SignedIn(_))));

        identity.end_session().await.unwrap();
        identity.end_session().await.unwrap();
        identity
            .authenticate("a@example.com", "hunter22")
            .await
            .unwrap();

        // Exactly one sign-out lands between the two sign-ins.
        assert_eq!(events.next().await, Some(SessionChange::SignedOut));
        assert!(matches!(events.next().await, Some(SessionChange::SignedIn(_))));
    }

    #[tokio::test]
    async fn test_display_attributes_require_session_and_stay_quiet() {
        let identity = MemoryIdentity::new();
        let err = identity
            .update_display_attributes(DisplayAttributes::default())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotAuthenticated);

        identity
            .create_account(account("a@example.com", "alice"))
            .await
            .unwrap();
        let mut events = identity.observe();
        assert!(matches!(events.next().await, Some(SessionChange::SignedIn(_))));

        identity
            .update_display_attributes(DisplayAttributes {
                display_name: Some("alicia".to_string()),
                avatar_ref: Some("https://img/a.png".to_string()),
            })
            .await
            .unwrap();
        identity.end_session().await.unwrap();

        // The attribute write itself emitted nothing; the next event on the
        // stream is the sign-out.
        assert_eq!(events.next().await, Some(SessionChange::SignedOut));

        let session = identity
            .authenticate("a@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(session.display_name, "alicia");
        assert_eq!(session.avatar_ref.as_deref(), Some("https://img/a.png"));
    }
}
