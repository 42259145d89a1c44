//! Identity & view-state resolver
//!
//! Produces the single "current actor + effective role" value the rest of the
//! platform reads, reconciling three independent signals:
//! - a locally persisted demo session blob
//! - the live session reported by the authentication provider
//! - an admin-only view-mode overlay
//!
//! Precedence lives in one pure function, [`effective_role`]; nothing else in
//! the workspace re-derives it.

use crate::error::IdentityError;
use crate::provider::{AuthProvider, ProfileStore, RoleVerifier, SessionCache};
use crate::types::{ActorId, AuthEvent, AuthSession, DemoSession, Profile, ResolvedActor, Role, SessionState};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Centralized precedence rule for the role used in authorization decisions.
///
/// Order: authorized overlay over a loaded real profile, then the real stored
/// role, then the demo profile's role, then nothing. A real session with a
/// missing profile resolves to `None` — callers must render a degraded state
/// rather than assume a low-privilege default.
#[must_use]
pub fn effective_role(
    state: &SessionState,
    profile: Option<&Profile>,
    overlay: Option<Role>,
    overlay_authorized: bool,
) -> Option<Role> {
    match state {
        SessionState::Unauthenticated => None,
        SessionState::Demo(demo) => Some(demo.profile.role),
        SessionState::Real(_) => {
            let real = profile.map(|p| p.role)?;
            match overlay {
                Some(simulated) if overlay_authorized => Some(simulated),
                _ => Some(real),
            }
        }
    }
}

/// The identity & view-state resolver.
///
/// Owns the session state machine; all reads and transitions go through it.
pub struct IdentityResolver {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    verifier: Arc<dyn RoleVerifier>,
    cache: Arc<dyn SessionCache>,
    demo_enabled: bool,
    state: RwLock<SessionState>,
    overlay: RwLock<Option<Role>>,
}

impl IdentityResolver {
    /// Create a resolver over the given seams.
    ///
    /// Demo sessions are ignored unless enabled via [`with_demo_enabled`](Self::with_demo_enabled).
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        verifier: Arc<dyn RoleVerifier>,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            auth,
            profiles,
            verifier,
            cache,
            demo_enabled: false,
            state: RwLock::new(SessionState::Unauthenticated),
            overlay: RwLock::new(None),
        }
    }

    /// Allow persisted demo sessions to activate
    #[inline]
    #[must_use]
    pub fn with_demo_enabled(mut self, enabled: bool) -> Self {
        self.demo_enabled = enabled;
        self
    }

    /// Startup reconciliation.
    ///
    /// A live provider session always wins and clears any persisted demo
    /// blob; otherwise a persisted demo blob (when enabled) yields a demo
    /// identity. A persisted overlay is revalidated against the authoritative
    /// role check and discarded when the check fails or errors.
    ///
    /// # Errors
    /// Propagates provider/store failures as `IdentityError`.
    pub async fn bootstrap(&self) -> Result<(), IdentityError> {
        let session = self.auth.current_session().await?;

        match session {
            Some(session) => {
                tracing::info!(actor = %session.actor_id, "bootstrap: real session restored");
                self.enter_real(session).await?;
            }
            None => {
                let demo = if self.demo_enabled {
                    self.cache.load_demo().await?
                } else {
                    None
                };
                match demo {
                    Some(demo) => {
                        tracing::info!(actor = %demo.actor_id, "bootstrap: demo session restored");
                        *self.state.write().await = SessionState::Demo(demo);
                    }
                    None => {
                        *self.state.write().await = SessionState::Unauthenticated;
                    }
                }
                // An overlay is meaningless without a real session.
                self.discard_overlay().await;
            }
        }
        Ok(())
    }

    /// Apply an auth state change from the provider subscription
    pub async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                tracing::info!(actor = %session.actor_id, "auth event: session established");
                if let Err(e) = self.enter_real(session).await {
                    tracing::error!("failed to enter real session: {e}");
                }
            }
            AuthEvent::SignedOut => {
                tracing::info!("auth event: signed out");
                self.enter_unauthenticated().await;
            }
        }
    }

    /// Spawn a task forwarding provider auth events into the resolver
    pub fn spawn_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let resolver = Arc::clone(self);
        let mut events = resolver.auth.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                resolver.handle_event(event).await;
            }
        })
    }

    /// Authenticate with credentials.
    ///
    /// # Errors
    /// `IdentityError::Authentication` from the provider; surfaced as-is,
    /// never retried.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let session = self.auth.sign_in(email, password).await.map_err(|e| {
            tracing::warn!("sign-in failed: {e}");
            e
        })?;
        self.enter_real(session.clone()).await?;
        Ok(session)
    }

    /// End the current session and clear all session-scoped state
    ///
    /// # Errors
    /// Propagates provider failures; local state is cleared regardless.
    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        let result = self.auth.sign_out().await;
        self.enter_unauthenticated().await;
        result
    }

    /// Activate a demo identity.
    ///
    /// Refused while a real session is active (a real session always wins)
    /// and when demo mode is disabled.
    ///
    /// # Errors
    /// `IdentityError::Authorization` when refused.
    pub async fn start_demo(&self, demo: DemoSession) -> Result<(), IdentityError> {
        if !self.demo_enabled {
            return Err(IdentityError::Authorization(
                "demo sessions are disabled".to_string(),
            ));
        }
        let mut state = self.state.write().await;
        if state.is_real() {
            return Err(IdentityError::Authorization(
                "a real session is active; demo identity refused".to_string(),
            ));
        }
        self.cache.store_demo(&demo).await?;
        tracing::info!(actor = %demo.actor_id, "demo session started");
        *state = SessionState::Demo(demo);
        Ok(())
    }

    /// Set the admin view-mode overlay.
    ///
    /// Authorized exclusively by the server-side super-admin check; a stored
    /// profile flag is never consulted.
    ///
    /// # Errors
    /// `IdentityError::Authorization` for non-super-admins or outside a real
    /// session; nothing is persisted on failure.
    pub async fn set_view_overlay(&self, simulated: Role) -> Result<(), IdentityError> {
        let actor_id = {
            let state = self.state.read().await;
            match &*state {
                SessionState::Real(session) => session.actor_id,
                _ => {
                    return Err(IdentityError::Authorization(
                        "view overlay requires an authenticated session".to_string(),
                    ))
                }
            }
        };

        let confirmed = self.verifier.is_super_admin(actor_id).await?;
        if !confirmed {
            tracing::warn!(actor = %actor_id, "view overlay refused: not super-admin");
            return Err(IdentityError::Authorization(
                "view overlay requires the super-admin capability".to_string(),
            ));
        }

        self.cache.store_overlay(simulated).await?;
        *self.overlay.write().await = Some(simulated);
        tracing::info!(actor = %actor_id, overlay = %simulated, "view overlay set");
        Ok(())
    }

    /// Clear the view-mode overlay
    pub async fn clear_view_overlay(&self) {
        self.discard_overlay().await;
    }

    /// Resolve the current actor and effective role.
    ///
    /// Profile fetch failures are logged and yield `profile: None` with an
    /// undefined effective role — a reported, non-fatal condition.
    ///
    /// # Errors
    /// Only session-cache failures propagate; profile fetch errors do not.
    pub async fn current_actor(&self) -> Result<ResolvedActor, IdentityError> {
        let state = self.state.read().await.clone();

        match state {
            SessionState::Unauthenticated => Ok(ResolvedActor::unauthenticated()),
            SessionState::Demo(ref demo) => Ok(ResolvedActor {
                actor_id: Some(demo.actor_id),
                profile: Some(demo.profile.clone()),
                view_overlay: None,
                effective_role: effective_role(&state, Some(&demo.profile), None, false),
                state: state.clone(),
            }),
            SessionState::Real(ref session) => {
                let profile = match self.profiles.fetch_profile(session.actor_id).await {
                    Ok(profile) => profile,
                    Err(e) => {
                        tracing::error!(actor = %session.actor_id, "profile fetch failed: {e}");
                        None
                    }
                };
                if profile.is_none() {
                    tracing::warn!(actor = %session.actor_id, "actor is authenticated but profile-less");
                }

                let overlay = self.authorized_overlay(session.actor_id).await;
                Ok(ResolvedActor {
                    actor_id: Some(session.actor_id),
                    effective_role: effective_role(
                        &state,
                        profile.as_ref(),
                        overlay,
                        overlay.is_some(),
                    ),
                    profile,
                    view_overlay: overlay,
                    state: state.clone(),
                })
            }
        }
    }

    /// Current session state snapshot
    pub async fn session_state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Enter the real-session state: demo state is cleared unconditionally
    /// and the overlay is revalidated for the (possibly different) actor.
    async fn enter_real(&self, session: AuthSession) -> Result<(), IdentityError> {
        if let Err(e) = self.cache.clear_demo().await {
            // Stale demo blobs are harmless once state is Real; report only.
            tracing::warn!("failed to clear persisted demo session: {e}");
        }
        let actor_id = session.actor_id;
        *self.state.write().await = SessionState::Real(session);
        self.revalidate_persisted_overlay(actor_id).await;
        Ok(())
    }

    async fn enter_unauthenticated(&self) {
        *self.state.write().await = SessionState::Unauthenticated;
        self.discard_overlay().await;
        if let Err(e) = self.cache.clear_demo().await {
            tracing::warn!("failed to clear persisted demo session: {e}");
        }
    }

    /// Revalidate a persisted overlay for the given actor; discard unless the
    /// authoritative check confirms super-admin (fail closed on errors).
    async fn revalidate_persisted_overlay(&self, actor_id: ActorId) {
        let persisted = match self.cache.load_overlay().await {
            Ok(overlay) => overlay,
            Err(e) => {
                tracing::warn!("failed to load persisted overlay: {e}");
                None
            }
        };
        let Some(simulated) = persisted else {
            *self.overlay.write().await = None;
            return;
        };

        match self.verifier.is_super_admin(actor_id).await {
            Ok(true) => {
                *self.overlay.write().await = Some(simulated);
            }
            Ok(false) => {
                tracing::warn!(actor = %actor_id, "discarding persisted overlay: not super-admin");
                self.discard_overlay().await;
            }
            Err(e) => {
                tracing::warn!(actor = %actor_id, "discarding persisted overlay: role check failed: {e}");
                self.discard_overlay().await;
            }
        }
    }

    /// In-memory overlay, re-checked against the authoritative verifier.
    async fn authorized_overlay(&self, actor_id: ActorId) -> Option<Role> {
        let simulated = (*self.overlay.read().await)?;
        match self.verifier.is_super_admin(actor_id).await {
            Ok(true) => Some(simulated),
            Ok(false) | Err(_) => {
                self.discard_overlay().await;
                None
            }
        }
    }

    async fn discard_overlay(&self) {
        *self.overlay.write().await = None;
        if let Err(e) = self.cache.clear_overlay().await {
            tracing::warn!("failed to clear persisted overlay: {e}");
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("demo_enabled", &self.demo_enabled)
            .finish_non_exhaustive()
    }
}
