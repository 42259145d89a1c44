//! Core identity types
//!
//! Defines the fundamental types for identity resolution:
//! - Actor identifiers and roles
//! - Stored profiles
//! - Authenticated and demo sessions
//! - The session state machine and resolved-actor projection

use crate::error::UnknownRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Unique actor identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Ulid);

impl ActorId {
    /// Generate new actor ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of platform roles.
///
/// Unknown role strings are a parse error, never a silent default: the
/// backend stores the lowercase wire form and every consumer goes through
/// [`Role::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Individual citizen / member account
    Citizen,
    /// Business organization
    Business,
    /// Government body
    Government,
    /// Non-governmental organization
    Ngo,
    /// Verified domain expert
    Expert,
    /// Sponsoring organization with a credit balance
    Sponsor,
    /// Platform administrator
    Admin,
}

impl Role {
    /// All roles, in display order
    pub const ALL: [Role; 7] = [
        Role::Citizen,
        Role::Business,
        Role::Government,
        Role::Ngo,
        Role::Expert,
        Role::Sponsor,
        Role::Admin,
    ];

    /// Lowercase wire form used by the backend tables
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Business => "business",
            Role::Government => "government",
            Role::Ngo => "ngo",
            Role::Expert => "expert",
            Role::Sponsor => "sponsor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" | "member" => Ok(Role::Citizen),
            "business" => Ok(Role::Business),
            "government" => Ok(Role::Government),
            "ngo" => Ok(Role::Ngo),
            "expert" => Ok(Role::Expert),
            "sponsor" => Ok(Role::Sponsor),
            "admin" | "super_admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Stored actor profile as returned by the profile table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owning actor
    pub actor_id: ActorId,
    /// Real stored role
    pub role: Role,
    /// Super-admin capability flag as stored.
    ///
    /// Advisory only: overlay authorization always goes through the
    /// authoritative [`RoleVerifier`](crate::provider::RoleVerifier).
    pub super_admin: bool,
    /// Organization linkage, when the actor belongs to one
    pub organization: Option<String>,
    /// Display name
    pub display_name: String,
}

impl Profile {
    /// Create a new profile with the given role
    #[inline]
    #[must_use]
    pub fn new(actor_id: ActorId, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            actor_id,
            role,
            super_admin: false,
            organization: None,
            display_name: display_name.into(),
        }
    }

    /// Mark the stored super-admin flag
    #[inline]
    #[must_use]
    pub fn with_super_admin(mut self) -> Self {
        self.super_admin = true;
        self
    }

    /// Attach an organization linkage
    #[inline]
    #[must_use]
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }
}

/// Live session reported by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Authenticated actor
    pub actor_id: ActorId,
    /// Account email
    pub email: String,
    /// Opaque provider access token
    pub access_token: String,
    /// Session issue time
    pub issued_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create a session issued now
    #[must_use]
    pub fn new(actor_id: ActorId, email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            actor_id,
            email: email.into(),
            access_token: access_token.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Locally persisted demo identity used for sales walkthroughs.
///
/// Never authenticated: a real provider session always supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoSession {
    /// Demo actor identifier (not a real account)
    pub actor_id: ActorId,
    /// Demo profile presented to the UI
    pub profile: Profile,
}

impl DemoSession {
    /// Create a demo session for the given profile
    #[inline]
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self {
            actor_id: profile.actor_id,
            profile,
        }
    }
}

/// Session state machine.
///
/// At most one of `Demo` / `Real` is active at any instant; transitions into
/// `Real` are one-directional with respect to demo state (a live session
/// always clears the demo blob, never the reverse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No identity at all
    Unauthenticated,
    /// Persisted demo identity, no real session
    Demo(DemoSession),
    /// Live authenticated session
    Real(AuthSession),
}

impl SessionState {
    /// Whether a real authenticated session is active
    #[inline]
    #[must_use]
    pub fn is_real(&self) -> bool {
        matches!(self, SessionState::Real(_))
    }

    /// Whether a demo identity is active
    #[inline]
    #[must_use]
    pub fn is_demo(&self) -> bool {
        matches!(self, SessionState::Demo(_))
    }

    /// Actor identifier for the active identity, if any
    #[inline]
    #[must_use]
    pub fn actor_id(&self) -> Option<ActorId> {
        match self {
            SessionState::Unauthenticated => None,
            SessionState::Demo(demo) => Some(demo.actor_id),
            SessionState::Real(session) => Some(session.actor_id),
        }
    }
}

/// Auth state change emitted by the provider subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was established (sign-in or startup restore)
    SignedIn(AuthSession),
    /// The session ended
    SignedOut,
    /// The session token was refreshed; identity unchanged
    TokenRefreshed(AuthSession),
}

/// Fully resolved actor view handed to callers.
///
/// `effective_role` is `None` both for unauthenticated actors and for
/// authenticated actors whose profile could not be loaded; callers must treat
/// the latter as a degraded state, not default to a low-privilege role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActor {
    /// Actor identifier, when any identity is active
    pub actor_id: Option<ActorId>,
    /// Session state the resolution was computed from
    pub state: SessionState,
    /// Stored profile for real sessions, demo profile for demo sessions
    pub profile: Option<Profile>,
    /// Authorized view-mode overlay, if any
    pub view_overlay: Option<Role>,
    /// Role used for all authorization and display decisions
    pub effective_role: Option<Role>,
}

impl ResolvedActor {
    /// Resolution for a fully signed-out state
    #[inline]
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            actor_id: None,
            state: SessionState::Unauthenticated,
            profile: None,
            view_overlay: None,
            effective_role: None,
        }
    }

    /// Whether the actor may act with the given role
    #[inline]
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.effective_role == Some(role)
    }
}
