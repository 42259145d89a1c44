//! Sponsorship credit ledger service
//!
//! Converts part of a sponsor's prepaid credit balance into a durable
//! sponsorship of a challenge, exactly once per user-level action, without
//! ever letting the balance go negative. All consistency-critical writes are
//! delegated to the store's atomic commits; this layer validates references,
//! maps outcomes to typed errors, and logs.

use crate::error::LedgerError;
use crate::store::{CancellationOutcome, CommitOutcome, LedgerStore, SponsorshipCommit};
use crate::types::{
    ChallengeId, CreditBalance, CreditLogEntry, RequestKey, SponsorshipReceipt,
    SponsorshipTransaction, Tier, TransactionId,
};
use agora_identity::ActorId;
use std::sync::Arc;

/// The credit ledger service
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn LedgerStore>,
}

impl CreditLedger {
    /// Create a ledger over the given store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Sponsor a challenge at the given tier.
    ///
    /// The `request_key` identifies the user-level action: replaying the same
    /// key returns the original receipt instead of charging again.
    ///
    /// # Errors
    /// - `ChallengeNotFound` / `SponsorNotFound` for dangling references
    /// - `InsufficientCredits` when the balance cannot cover the tier;
    ///   nothing is written
    /// - `Store` for infrastructure failures (no partial effects; the commit
    ///   is a single atomic unit)
    pub async fn sponsor_challenge(
        &self,
        sponsor: ActorId,
        challenge: ChallengeId,
        tier: Tier,
        request_key: RequestKey,
    ) -> Result<SponsorshipReceipt, LedgerError> {
        if !self.store.challenge_exists(challenge).await? {
            return Err(LedgerError::ChallengeNotFound(challenge));
        }

        let outcome = self
            .store
            .commit_sponsorship(SponsorshipCommit {
                request_key,
                sponsor,
                challenge,
                tier,
            })
            .await?;

        match outcome {
            CommitOutcome::Applied(receipt) => {
                tracing::info!(
                    %sponsor, %challenge, %tier,
                    available = receipt.balance.available(),
                    "sponsorship recorded"
                );
                Ok(receipt)
            }
            CommitOutcome::InsufficientCredits { available } => {
                let required = tier.credit_cost();
                tracing::warn!(%sponsor, %tier, available, required, "sponsorship rejected");
                Err(LedgerError::InsufficientCredits {
                    required,
                    available,
                })
            }
            CommitOutcome::Duplicate(transaction_id) => {
                tracing::info!(%sponsor, %transaction_id, "duplicate sponsorship request ignored");
                let balance = self.balance_of(sponsor).await?;
                Ok(SponsorshipReceipt {
                    transaction_id,
                    balance,
                })
            }
            CommitOutcome::SponsorMissing => Err(LedgerError::SponsorNotFound(sponsor)),
        }
    }

    /// Cancel a sponsorship, refunding its full cost.
    ///
    /// The status flip, the compensating credit, and the positive audit entry
    /// are one atomic unit; a cancelled transaction is never refunded twice.
    ///
    /// # Errors
    /// `TransactionNotFound`, `AlreadyCancelled`, or `Store`.
    pub async fn cancel_sponsorship(
        &self,
        transaction_id: TransactionId,
    ) -> Result<CreditBalance, LedgerError> {
        match self.store.commit_cancellation(transaction_id).await? {
            CancellationOutcome::Refunded {
                transaction_id,
                balance,
            } => {
                tracing::info!(%transaction_id, available = balance.available(), "sponsorship cancelled and refunded");
                Ok(balance)
            }
            CancellationOutcome::AlreadyCancelled(id) => Err(LedgerError::AlreadyCancelled(id)),
            CancellationOutcome::NotFound(id) => Err(LedgerError::TransactionNotFound(id)),
        }
    }

    /// Grant credits to a sponsor, creating the balance row on first grant
    ///
    /// # Errors
    /// `Store` on persistence failure.
    pub async fn grant_credits(
        &self,
        sponsor: ActorId,
        amount: u64,
        description: &str,
    ) -> Result<CreditBalance, LedgerError> {
        let balance = self.store.grant_credits(sponsor, amount, description).await?;
        tracing::info!(%sponsor, amount, total = balance.total_credits, "credits granted");
        Ok(balance)
    }

    /// Current balance for a sponsor
    ///
    /// # Errors
    /// `SponsorNotFound` when no balance row exists.
    pub async fn balance_of(&self, sponsor: ActorId) -> Result<CreditBalance, LedgerError> {
        self.store
            .balance(sponsor)
            .await?
            .ok_or(LedgerError::SponsorNotFound(sponsor))
    }

    /// Look up a single sponsorship transaction
    ///
    /// # Errors
    /// `TransactionNotFound` when no such transaction exists.
    pub async fn transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<SponsorshipTransaction, LedgerError> {
        self.store
            .transaction(transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))
    }

    /// All sponsorship transactions for a sponsor, oldest first
    ///
    /// # Errors
    /// `Store` on persistence failure.
    pub async fn transactions_for(
        &self,
        sponsor: ActorId,
    ) -> Result<Vec<SponsorshipTransaction>, LedgerError> {
        Ok(self.store.transactions_for(sponsor).await?)
    }

    /// Audit log for a sponsor, oldest first
    ///
    /// # Errors
    /// `Store` on persistence failure.
    pub async fn audit_log_for(&self, sponsor: ActorId) -> Result<Vec<CreditLogEntry>, LedgerError> {
        Ok(self.store.log_for(sponsor).await?)
    }
}

impl std::fmt::Debug for CreditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockLedgerStore;
    use agora_identity::StoreError;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn unknown_challenge_aborts_before_commit() {
        let mut store = MockLedgerStore::new();
        store.expect_challenge_exists().returning(|_| Ok(false));
        // No commit expectation: reaching it would fail the test.

        let ledger = CreditLedger::new(Arc::new(store));
        let err = ledger
            .sponsor_challenge(
                ActorId::new(),
                ChallengeId::new(),
                Tier::Bronze,
                RequestKey::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ChallengeNotFound(_)));
    }

    #[tokio::test]
    async fn insufficient_outcome_maps_to_typed_error() {
        let mut store = MockLedgerStore::new();
        store.expect_challenge_exists().returning(|_| Ok(true));
        store
            .expect_commit_sponsorship()
            .returning(|_| Ok(CommitOutcome::InsufficientCredits { available: 5 }));

        let ledger = CreditLedger::new(Arc::new(store));
        let err = ledger
            .sponsor_challenge(
                ActorId::new(),
                ChallengeId::new(),
                Tier::Bronze,
                RequestKey::new(),
            )
            .await
            .unwrap_err();

        match err {
            LedgerError::InsufficientCredits {
                required,
                available,
            } => {
                assert_eq!(required, 10);
                assert_eq!(available, 5);
                assert_eq!(err.shortfall(), Some(5));
            }
            other => panic!("expected InsufficientCredits, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_persistence_error() {
        let mut store = MockLedgerStore::new();
        store.expect_challenge_exists().returning(|_| Ok(true));
        store
            .expect_commit_sponsorship()
            .returning(|_| Err(StoreError::Persistence("write rejected".to_string())));

        let ledger = CreditLedger::new(Arc::new(store));
        let err = ledger
            .sponsor_challenge(
                ActorId::new(),
                ChallengeId::new(),
                Tier::Gold,
                RequestKey::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn missing_sponsor_outcome_maps_to_not_found() {
        let mut store = MockLedgerStore::new();
        store.expect_challenge_exists().returning(|_| Ok(true));
        store
            .expect_commit_sponsorship()
            .returning(|_| Ok(CommitOutcome::SponsorMissing));

        let ledger = CreditLedger::new(Arc::new(store));
        let sponsor = ActorId::new();
        let err = ledger
            .sponsor_challenge(sponsor, ChallengeId::new(), Tier::Bronze, RequestKey::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SponsorNotFound(id) if id == sponsor));
    }
}
