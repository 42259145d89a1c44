//! WellAgora Ledger - sponsorship credit accounting
//!
//! Moves a sponsor's prepaid credits into a "spent" state when the sponsor
//! backs a challenge:
//! - Four fixed package tiers (bronze/silver/gold/platinum)
//! - Conditional, per-sponsor serialized debits (no overspend races)
//! - One atomic commit per sponsorship (no partial writes)
//! - Idempotent request keys (no double charges on retry)
//! - Compensating refunds on cancellation
//!
//! # Example
//!
//! ```rust,ignore
//! use agora_ledger::{CreditLedger, MemoryLedgerStore, RequestKey, Tier};
//!
//! # async fn example(sponsor: agora_identity::ActorId, challenge: agora_ledger::ChallengeId)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = CreditLedger::new(std::sync::Arc::new(MemoryLedgerStore::new()));
//! ledger.grant_credits(sponsor, 50, "starter package").await?;
//!
//! let receipt = ledger
//!     .sponsor_challenge(sponsor, challenge, Tier::Silver, RequestKey::new())
//!     .await?;
//! assert_eq!(receipt.balance.available(), 30);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod ledger;
pub mod memory;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use error::{LedgerError, StoreError, UnknownTier};
pub use ledger::CreditLedger;
pub use memory::MemoryLedgerStore;
pub use store::{CancellationOutcome, CommitOutcome, LedgerStore, SponsorshipCommit};
pub use types::{
    Challenge, ChallengeId, CreditBalance, CreditLogEntry, CreditLogKind, RequestKey,
    SponsorshipReceipt, SponsorshipStatus, SponsorshipTransaction, Tier, TransactionId,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the WellAgora ledger
    pub use crate::{
        Challenge, ChallengeId, CreditBalance, CreditLedger, LedgerError, MemoryLedgerStore,
        RequestKey, SponsorshipReceipt, SponsorshipStatus, Tier, TransactionId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
