//! Error types for the credit ledger
//!
//! Provides typed failures for:
//! - Insufficient credit balances (with the shortfall)
//! - Missing sponsors, challenges, and transactions
//! - Cancellation conflicts
//! - Persistence failures

use crate::types::{ChallengeId, TransactionId};
use agora_identity::ActorId;

pub use agora_identity::StoreError;

/// Main ledger error type
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Balance too low for the requested tier; no mutation performed
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// Credit cost of the requested tier
        required: u64,
        /// Credits actually available
        available: u64,
    },

    /// Sponsor has no credit balance row
    #[error("sponsor not found: {0}")]
    SponsorNotFound(ActorId),

    /// Referenced challenge does not exist
    #[error("challenge not found: {0}")]
    ChallengeNotFound(ChallengeId),

    /// Referenced sponsorship transaction does not exist
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transaction was already cancelled; refunds are not repeated
    #[error("transaction already cancelled: {0}")]
    AlreadyCancelled(TransactionId),

    /// Underlying store rejected the operation
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Shortfall for insufficient-credit failures, for user messaging
    #[inline]
    #[must_use]
    pub fn shortfall(&self) -> Option<u64> {
        match self {
            Self::InsufficientCredits {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }

    /// Check if the error is retryable by the caller
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Unknown tier string encountered while parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown package tier: {0}")]
pub struct UnknownTier(pub String);
