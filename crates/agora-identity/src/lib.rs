//! WellAgora Identity - session and view-mode resolution
//!
//! Resolves "who is the current actor and what role are they acting as",
//! reconciling three overlapping sources of truth:
//! - A locally persisted demo session (sales walkthroughs)
//! - The live session from the authentication provider
//! - An admin-only view-mode overlay ("God Mode")
//!
//! # Example
//!
//! ```rust,ignore
//! use agora_identity::{IdentityResolver, Role};
//!
//! # async fn example(resolver: IdentityResolver) -> Result<(), Box<dyn std::error::Error>> {
//! resolver.bootstrap().await?;
//! let actor = resolver.current_actor().await?;
//!
//! if actor.has_role(Role::Sponsor) {
//!     println!("sponsor {} is signed in", actor.actor_id.unwrap());
//! }
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod provider;
pub mod resolver;
pub mod types;

// Re-exports for convenience
pub use error::{IdentityError, StoreError, UnknownRole};
pub use provider::{
    AuthProvider, MemorySessionCache, ProfileStore, RoleVerifier, SessionCache, SignupAttributes,
};
pub use resolver::{effective_role, IdentityResolver};
pub use types::{
    ActorId, AuthEvent, AuthSession, DemoSession, Profile, ResolvedActor, Role, SessionState,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with WellAgora identity
    pub use crate::{
        ActorId, AuthEvent, AuthSession, DemoSession, IdentityError, IdentityResolver, Profile,
        ResolvedActor, Role, SessionState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
