//! Effective user identity.
//!
//! Cart and order calls are keyed by a user id. An authenticated user's id
//! always wins; otherwise a guest id is generated once, persisted, and
//! reused for the lifetime of the installation.

use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::warn;

use velorm_core::UserId;

use crate::models::User;
use crate::storage::{Storage, keys};

/// Id returned when no usable storage is available.
pub const SERVER_SIDE_GUEST: &str = "server-side-guest";

const GUEST_RANDOM_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Resolves the id used for cart and order calls.
#[derive(Clone)]
pub struct IdentityResolver {
    storage: Option<Arc<dyn Storage>>,
    // Serializes read-generate-write so concurrent callers agree on one id.
    guard: Arc<Mutex<()>>,
}

impl IdentityResolver {
    /// Resolver persisting guest ids in `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage: Some(storage),
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Resolver with no storage; every guest resolves to [`SERVER_SIDE_GUEST`].
    #[must_use]
    pub fn detached() -> Self {
        Self {
            storage: None,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// The authenticated user's id if it is non-empty, else the guest id.
    #[must_use]
    pub fn effective_user_id(&self, user: Option<&User>) -> UserId {
        match user {
            Some(user) if !user.id.is_empty() => user.id.clone(),
            _ => self.guest_id(),
        }
    }

    /// The persisted guest id, generating and storing one on first use.
    ///
    /// Falls back to [`SERVER_SIDE_GUEST`] if storage is missing or fails.
    #[must_use]
    pub fn guest_id(&self) -> UserId {
        let Some(storage) = &self.storage else {
            return UserId::new(SERVER_SIDE_GUEST);
        };

        let _guard = self
            .guard
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match storage.get(keys::GUEST_ID) {
            Ok(Some(existing)) if !existing.trim().is_empty() => return UserId::new(existing),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Failed to read guest id, using fallback");
                return UserId::new(SERVER_SIDE_GUEST);
            }
        }

        let generated = generate_guest_id();
        if let Err(e) = storage.set(keys::GUEST_ID, &generated) {
            warn!(error = %e, "Failed to persist guest id, using fallback");
            return UserId::new(SERVER_SIDE_GUEST);
        }

        tracing::debug!(guest_id = %generated, "Generated guest id");
        UserId::new(generated)
    }
}

/// Generate a guest id: `guest_<9 base-36 chars>_<unix millis>`.
#[must_use]
pub fn generate_guest_id() -> String {
    let mut rng = rand::rng();
    let random: String = (0..GUEST_RANDOM_LEN)
        .map(|_| {
            let idx = rng.random_range(0..BASE36.len());
            BASE36.get(idx).map_or('0', |b| char::from(*b))
        })
        .collect();
    format!("guest_{random}_{}", chrono::Utc::now().timestamp_millis())
}
