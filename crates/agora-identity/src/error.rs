//! Error types for identity resolution
//!
//! Provides typed failures for:
//! - Authentication provider errors
//! - Authorization (capability) violations
//! - Profile and session persistence errors

/// Main identity error type
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Credentials rejected, session expired, or provider outage.
    /// Surfaced to the caller immediately; never retried silently.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Actor lacks the role or capability for the attempted action
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Actor is authenticated but the stored profile could not be loaded.
    /// Callers must treat this as a degraded state, not a default role.
    #[error("profile unavailable for actor {actor_id}")]
    ProfileUnavailable {
        /// Actor whose profile fetch failed
        actor_id: crate::types::ActorId,
    },

    /// Underlying store rejected a read or write
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IdentityError {
    /// Check if the error is an authorization violation
    #[inline]
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// Check if the error is retryable by the caller
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::ProfileUnavailable { .. })
    }
}

/// Low-level persistence/provider failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing table or provider rejected the operation
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The store is unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Unknown role string encountered while parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);
