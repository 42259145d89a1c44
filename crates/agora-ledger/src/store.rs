//! Ledger persistence seam
//!
//! Every write that must stay consistent is expressed as a single atomic
//! operation on [`LedgerStore`]: the conditional debit, the transaction
//! insert, and the audit-log append land together or not at all. The broken
//! pattern of three independent sequential writes is unrepresentable at this
//! seam.

use crate::types::{
    ChallengeId, CreditBalance, CreditLogEntry, RequestKey, SponsorshipReceipt,
    SponsorshipTransaction, Tier, TransactionId,
};
use agora_identity::{ActorId, StoreError};
use async_trait::async_trait;

/// One user-level sponsorship action, keyed for idempotency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SponsorshipCommit {
    /// Idempotency key: replays of the same action charge at most once
    pub request_key: RequestKey,
    /// Sponsoring actor
    pub sponsor: ActorId,
    /// Target challenge
    pub challenge: ChallengeId,
    /// Package tier to purchase
    pub tier: Tier,
}

/// Outcome of an atomic sponsorship commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All three effects applied
    Applied(SponsorshipReceipt),
    /// Conditional debit rejected; nothing was written
    InsufficientCredits {
        /// Credits available at decision time
        available: u64,
    },
    /// Request key already applied; the original transaction stands
    Duplicate(TransactionId),
    /// Sponsor has no balance row; nothing was written
    SponsorMissing,
}

/// Outcome of an atomic cancellation commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// Status flipped and credits returned
    Refunded {
        /// Cancelled transaction
        transaction_id: TransactionId,
        /// Balance after the compensating refund
        balance: CreditBalance,
    },
    /// Transaction was already cancelled; no second refund
    AlreadyCancelled(TransactionId),
    /// No such transaction
    NotFound(TransactionId),
}

/// Persistence contract for the credit ledger.
///
/// Implementations must serialize balance mutations per sponsor: two
/// concurrent commits against the same balance may not both observe the same
/// pre-debit credits.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current balance row for a sponsor, if one exists
    async fn balance(&self, sponsor: ActorId) -> Result<Option<CreditBalance>, StoreError>;

    /// Does the referenced challenge exist?
    async fn challenge_exists(&self, challenge: ChallengeId) -> Result<bool, StoreError>;

    /// Atomically debit the balance, insert the transaction, and append the
    /// audit entry.
    ///
    /// # Errors
    /// `StoreError` only for infrastructure failures; domain rejections are
    /// reported through [`CommitOutcome`] with no partial effects.
    async fn commit_sponsorship(
        &self,
        commit: SponsorshipCommit,
    ) -> Result<CommitOutcome, StoreError>;

    /// Atomically flip a transaction to cancelled, return its credits, and
    /// append the compensating audit entry.
    async fn commit_cancellation(
        &self,
        transaction_id: TransactionId,
    ) -> Result<CancellationOutcome, StoreError>;

    /// Grant credits, creating the balance row on first grant
    async fn grant_credits(
        &self,
        sponsor: ActorId,
        amount: u64,
        description: &str,
    ) -> Result<CreditBalance, StoreError>;

    /// Look up a single transaction
    async fn transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<SponsorshipTransaction>, StoreError>;

    /// All transactions for a sponsor, oldest first
    async fn transactions_for(
        &self,
        sponsor: ActorId,
    ) -> Result<Vec<SponsorshipTransaction>, StoreError>;

    /// Audit log for a sponsor, oldest first
    async fn log_for(&self, sponsor: ActorId) -> Result<Vec<CreditLogEntry>, StoreError>;
}
