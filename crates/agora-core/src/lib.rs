//! WellAgora Core - platform facade
//!
//! Wires the identity resolver and the credit ledger together and applies
//! role-based authorization at the boundary UI callers use:
//! - Session bootstrap and auth event handling
//! - Effective-role gating for every ledger mutation
//! - A randomized consistency simulator for the ledger
//!
//! # Example
//!
//! ```rust,ignore
//! use agora_core::{Platform, PlatformConfig};
//! use agora_ledger::{RequestKey, Tier};
//!
//! # async fn example(platform: Platform, challenge: agora_ledger::ChallengeId)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! platform.bootstrap().await?;
//! let receipt = platform
//!     .sponsor_challenge(challenge, Tier::Silver, RequestKey::new())
//!     .await?;
//! println!("{} credits left", receipt.balance.available());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod harness;
pub mod platform;

// Re-exports for convenience
pub use config::PlatformConfig;
pub use error::PlatformError;
pub use harness::{run_simulator, SimulatorConfig, SimulatorReport};
pub use platform::Platform;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the WellAgora platform
    pub use crate::{Platform, PlatformConfig, PlatformError};
    pub use agora_identity::prelude::*;
    pub use agora_ledger::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
