//! External seams consumed by the resolver
//!
//! The resolver never talks to the backend directly; it goes through these
//! traits:
//! - [`AuthProvider`] — the authentication service (sessions are its sole
//!   source of truth)
//! - [`ProfileStore`] — the profile table
//! - [`RoleVerifier`] — the authoritative server-side role check
//! - [`SessionCache`] — client-persisted demo blob and view overlay

use crate::error::{IdentityError, StoreError};
use crate::types::{ActorId, AuthEvent, AuthSession, DemoSession, Profile, Role};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Attributes supplied at signup; the backend assigns the real role.
#[derive(Debug, Clone)]
pub struct SignupAttributes {
    /// Requested role
    pub role: Role,
    /// Display name
    pub display_name: String,
    /// Organization linkage, for organization accounts
    pub organization: Option<String>,
}

/// Authentication provider contract.
///
/// Session presence as reported here is the sole source of truth for
/// "is a real user logged in".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: SignupAttributes,
    ) -> Result<ActorId, IdentityError>;

    /// Authenticate with credentials.
    ///
    /// # Errors
    /// `IdentityError::Authentication` on rejected credentials or provider
    /// outage; never retried by the resolver.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Session currently held by the provider, for startup bootstrap
    async fn current_session(&self) -> Result<Option<AuthSession>, IdentityError>;

    /// Subscribe to auth state changes
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Profile table reads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the stored profile for an actor.
    ///
    /// `Ok(None)` means the actor has no profile row; the resolver reports
    /// this as a degraded state rather than inventing a role.
    async fn fetch_profile(&self, actor_id: ActorId) -> Result<Option<Profile>, StoreError>;
}

/// Authoritative server-side role check.
///
/// Gates the view-mode overlay; a client-persisted super-admin flag is never
/// a substitute for this call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleVerifier: Send + Sync {
    /// Does this actor hold the super-admin capability?
    async fn is_super_admin(&self, actor_id: ActorId) -> Result<bool, StoreError>;
}

/// Client-side persisted session context: demo blob plus view overlay.
///
/// This is the one injected home for session-scoped mutable state; nothing
/// else reads client storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Load the persisted demo session, if any
    async fn load_demo(&self) -> Result<Option<DemoSession>, StoreError>;

    /// Persist a demo session
    async fn store_demo(&self, demo: &DemoSession) -> Result<(), StoreError>;

    /// Clear the persisted demo session
    async fn clear_demo(&self) -> Result<(), StoreError>;

    /// Load the persisted view overlay, if any
    async fn load_overlay(&self) -> Result<Option<Role>, StoreError>;

    /// Persist the view overlay
    async fn store_overlay(&self, role: Role) -> Result<(), StoreError>;

    /// Clear the persisted view overlay
    async fn clear_overlay(&self) -> Result<(), StoreError>;
}

/// In-memory [`SessionCache`] mirroring browser local/session storage: both
/// values are kept as JSON strings, so malformed blobs surface the same way
/// corrupted client storage would.
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    demo: parking_lot::Mutex<Option<String>>,
    overlay: parking_lot::Mutex<Option<String>>,
}

impl MemorySessionCache {
    /// Create an empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-seeded with a demo session
    #[must_use]
    pub fn with_demo(demo: DemoSession) -> Self {
        let cache = Self::new();
        *cache.demo.lock() = serde_json::to_string(&demo).ok();
        cache
    }

    /// Create a cache pre-seeded with a persisted overlay
    #[must_use]
    pub fn with_overlay(self, role: Role) -> Self {
        *self.overlay.lock() = serde_json::to_string(&role).ok();
        self
    }
}

fn corrupt(what: &str, err: &serde_json::Error) -> StoreError {
    StoreError::Persistence(format!("corrupt {what} blob: {err}"))
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn load_demo(&self) -> Result<Option<DemoSession>, StoreError> {
        self.demo
            .lock()
            .as_deref()
            .map(|raw| serde_json::from_str(raw).map_err(|e| corrupt("demo session", &e)))
            .transpose()
    }

    async fn store_demo(&self, demo: &DemoSession) -> Result<(), StoreError> {
        let raw = serde_json::to_string(demo).map_err(|e| corrupt("demo session", &e))?;
        *self.demo.lock() = Some(raw);
        Ok(())
    }

    async fn clear_demo(&self) -> Result<(), StoreError> {
        *self.demo.lock() = None;
        Ok(())
    }

    async fn load_overlay(&self) -> Result<Option<Role>, StoreError> {
        self.overlay
            .lock()
            .as_deref()
            .map(|raw| serde_json::from_str(raw).map_err(|e| corrupt("view overlay", &e)))
            .transpose()
    }

    async fn store_overlay(&self, role: Role) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&role).map_err(|e| corrupt("view overlay", &e))?;
        *self.overlay.lock() = Some(raw);
        Ok(())
    }

    async fn clear_overlay(&self) -> Result<(), StoreError> {
        *self.overlay.lock() = None;
        Ok(())
    }
}
