//! Session state: OTP login, profile updates and logout.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use velorm_core::{Contact, Email, RequestStatus};

use crate::api::{ProfileUpdate, VelormClient};
use crate::error::{Result, StoreError, clear_sentry_user, set_sentry_user};
use crate::models::User;
use crate::storage::{Storage, StorageError, keys};

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    /// Session token. The backend issues none, so this is the user id.
    pub token: Option<String>,
    pub is_authenticated: bool,
    /// An OTP has been sent and not yet verified.
    pub otp_pending: bool,
    pub status: RequestStatus,
    pub error: Option<String>,
}

impl AuthState {
    /// State rebuilt from persisted values.
    ///
    /// Both must be present and the token must be the user's id.
    #[must_use]
    pub fn restored(user: Option<User>, token: Option<String>) -> Self {
        match (user, token) {
            (Some(user), Some(token)) if token == user.id.as_str() => Self {
                user: Some(user),
                token: Some(token),
                is_authenticated: true,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn begin(&mut self) {
        self.status = RequestStatus::Loading;
        self.error = None;
    }

    fn fail(&mut self, message: String) {
        self.status = RequestStatus::Failed;
        self.error = Some(message);
    }

    fn otp_sent(&mut self) {
        self.status = RequestStatus::Succeeded;
        self.otp_pending = true;
    }

    fn authenticated(&mut self, user: User) {
        self.token = Some(user.id.to_string());
        self.user = Some(user);
        self.is_authenticated = true;
        self.otp_pending = false;
        self.status = RequestStatus::Succeeded;
    }

    fn profile_updated(&mut self, user: User) {
        self.user = Some(user);
        self.status = RequestStatus::Succeeded;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// AuthStore
// =============================================================================

/// Session store backed by the login endpoints and persistent storage.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthStoreInner>,
}

struct AuthStoreInner {
    client: VelormClient,
    storage: Arc<dyn Storage>,
    state: RwLock<AuthState>,
}

impl AuthStore {
    /// Create the store, restoring any persisted session.
    #[must_use]
    pub fn new(client: VelormClient, storage: Arc<dyn Storage>) -> Self {
        let state = restore(storage.as_ref());
        if let Some(user) = &state.user {
            set_sentry_user(&user.id, user.email.as_deref());
        }
        Self {
            inner: Arc::new(AuthStoreInner {
                client,
                storage,
                state: RwLock::new(state),
            }),
        }
    }

    /// Current session snapshot.
    pub async fn snapshot(&self) -> AuthState {
        self.inner.state.read().await.clone()
    }

    /// The signed-in user, if any.
    pub async fn user(&self) -> Option<User> {
        let state = self.inner.state.read().await;
        state.user.clone().filter(|_| state.is_authenticated)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.is_authenticated
    }

    /// Request an OTP for `contact`.
    ///
    /// # Errors
    ///
    /// Returns an error if the contact number is invalid or the backend
    /// refuses; the state is marked failed with the message.
    #[instrument(skip(self))]
    pub async fn send_otp(&self, contact: &str) -> Result<()> {
        self.inner.state.write().await.begin();
        let outcome = self.request_otp(contact).await;

        let mut state = self.inner.state.write().await;
        match &outcome {
            Ok(()) => state.otp_sent(),
            Err(e) => state.fail(e.user_message()),
        }
        outcome
    }

    async fn request_otp(&self, contact: &str) -> Result<()> {
        let contact = Contact::parse(contact)?;
        self.inner.client.send_otp(&contact).await?;
        info!(contact = %contact, "OTP sent");
        Ok(())
    }

    /// Verify an OTP and sign the user in.
    ///
    /// On success the user and token are persisted.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the server message (`Invalid OTP` by
    /// default) if verification fails; the session stays signed out.
    #[instrument(skip(self, otp))]
    pub async fn verify_otp(&self, contact: &str, otp: SecretString) -> Result<User> {
        self.inner.state.write().await.begin();
        let outcome = self.authenticate(contact, &otp).await;

        let mut state = self.inner.state.write().await;
        match &outcome {
            Ok(user) => {
                state.authenticated(user.clone());
                set_sentry_user(&user.id, user.email.as_deref());
                info!(user_id = %user.id, "User signed in");
            }
            Err(e) => state.fail(e.user_message()),
        }
        outcome
    }

    async fn authenticate(&self, contact: &str, otp: &SecretString) -> Result<User> {
        let contact = Contact::parse(contact)?;
        let user = self.inner.client.authenticate(&contact, otp).await?;
        self.persist_session(&user)?;
        Ok(user)
    }

    /// Submit profile details and replace the stored user.
    ///
    /// The authentication flag is left as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the email or contact is invalid, or the backend
    /// refuses (`Failed to update details` by default).
    #[instrument(skip(self, name, email))]
    pub async fn update_profile(&self, name: &str, email: &str, contact: &str) -> Result<User> {
        self.inner.state.write().await.begin();
        let outcome = self.submit_profile(name, email, contact).await;

        let mut state = self.inner.state.write().await;
        match &outcome {
            Ok(user) => state.profile_updated(user.clone()),
            Err(e) => state.fail(e.user_message()),
        }
        outcome
    }

    async fn submit_profile(&self, name: &str, email: &str, contact: &str) -> Result<User> {
        let email = Email::parse_optional(email)?
            .map(Email::into_inner)
            .unwrap_or_default();
        let contact = Contact::parse(contact)?;

        let update = ProfileUpdate {
            name: name.trim().to_string(),
            email,
            contact: contact.into_inner(),
        };
        let user = self.inner.client.add_user_details(&update).await?;
        self.persist(&user)?;
        Ok(user)
    }

    /// Sign out, clearing the in-memory and persisted session.
    ///
    /// Safe to call when already signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted keys cannot be removed. The
    /// in-memory session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.inner.state.write().await.clear();
        clear_sentry_user();

        self.inner.storage.remove(keys::USER)?;
        self.inner.storage.remove(keys::TOKEN)?;
        info!("User signed out");
        Ok(())
    }

    fn persist(&self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user).map_err(|e| StoreError::Storage(e.into()))?;
        self.inner.storage.set(keys::USER, &json)?;
        Ok(())
    }

    /// Write user and token together. On failure the previous pair is put
    /// back, or both keys are cleared if that fails too.
    fn persist_session(&self, user: &User) -> Result<()> {
        let storage = self.inner.storage.as_ref();
        let json = serde_json::to_string(user).map_err(|e| StoreError::Storage(e.into()))?;
        let previous_user = storage.get(keys::USER)?;
        let previous_token = storage.get(keys::TOKEN)?;

        let written = storage
            .set(keys::TOKEN, user.id.as_str())
            .and_then(|()| storage.set(keys::USER, &json));
        if let Err(e) = written {
            let rolled_back = put(storage, keys::USER, previous_user.as_deref())
                .and_then(|()| put(storage, keys::TOKEN, previous_token.as_deref()));
            if let Err(rollback) = rolled_back {
                warn!(error = %rollback, "Session rollback failed, clearing persisted session");
                for key in [keys::USER, keys::TOKEN] {
                    if let Err(e) = storage.remove(key) {
                        warn!(error = %e, key, "Failed to clear persisted session key");
                    }
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn put(
    storage: &dyn Storage,
    key: &str,
    value: Option<&str>,
) -> std::result::Result<(), StorageError> {
    match value {
        Some(value) => storage.set(key, value),
        None => storage.remove(key),
    }
}

fn restore(storage: &dyn Storage) -> AuthState {
    let user = match storage.get(keys::USER) {
        Ok(Some(json)) => match serde_json::from_str::<User>(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding corrupt persisted user");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted user");
            None
        }
    };
    let token = match storage.get(keys::TOKEN) {
        Ok(token) => token.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            warn!(error = %e, "Failed to read persisted token");
            None
        }
    };
    if let (Some(user), Some(token)) = (&user, &token)
        && token != user.id.as_str()
    {
        warn!(user_id = %user.id, "Persisted token does not match user, ignoring session");
    }
    AuthState::restored(user, token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn user(id: &str) -> User {
        serde_json::from_value(json!({"_id": id, "name": "Asha"})).unwrap()
    }

    #[test]
    fn test_restored_requires_user_and_token() {
        assert!(AuthState::restored(Some(user("u-1")), Some("u-1".to_string())).is_authenticated);
        assert!(!AuthState::restored(Some(user("u-1")), None).is_authenticated);
        assert!(!AuthState::restored(None, Some("u-1".to_string())).is_authenticated);

        let partial = AuthState::restored(Some(user("u-1")), None);
        assert!(partial.user.is_none());
    }

    #[test]
    fn test_restore_rejects_mismatched_token() {
        let json = serde_json::to_string(&user("u-1")).unwrap();
        let storage = MemoryStorage::with_entries([
            (keys::USER, json.as_str()),
            (keys::TOKEN, "u-0"),
        ]);
        let state = restore(&storage);
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
    }

    #[test]
    fn test_authenticated_sets_token_to_user_id() {
        let mut state = AuthState::default();
        state.begin();
        assert!(state.status.is_loading());

        state.otp_sent();
        assert!(state.otp_pending);
        assert!(!state.is_authenticated);

        state.authenticated(user("u-1"));
        assert!(state.is_authenticated);
        assert!(!state.otp_pending);
        assert_eq!(state.token.as_deref(), Some("u-1"));
        assert_eq!(state.status, RequestStatus::Succeeded);
    }

    #[test]
    fn test_fail_keeps_user() {
        let mut state = AuthState::restored(Some(user("u-1")), Some("u-1".to_string()));
        state.begin();
        state.fail("Failed to update details".to_string());

        assert_eq!(state.status, RequestStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("Failed to update details"));
        assert!(state.is_authenticated);
        assert_eq!(state.user.unwrap().id.as_str(), "u-1");
    }

    #[test]
    fn test_restore_discards_corrupt_user() {
        let storage = MemoryStorage::with_entries([
            (keys::USER, "{not json"),
            (keys::TOKEN, "u-1"),
        ]);
        let state = restore(&storage);
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
    }

    #[test]
    fn test_restore_persisted_session() {
        let json = serde_json::to_string(&user("u-1")).unwrap();
        let storage = MemoryStorage::with_entries([
            (keys::USER, json.as_str()),
            (keys::TOKEN, "u-1"),
        ]);
        let state = restore(&storage);
        assert!(state.is_authenticated);
        assert_eq!(state.user.unwrap().display_name(), "Asha");
    }
}
