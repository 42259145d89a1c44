//! Functional tests for the credit ledger's consistency guarantees.
//!
//! These exercise the end-to-end semantics of CreditLedger over the in-memory
//! store:
//! - successful sponsorship debits, records, and logs in one step
//! - insufficient balances reject with no mutation
//! - concurrent attempts cannot overspend a shared balance
//! - a failing store leaves no partial effect observable
//! - cancellation refunds exactly once

use agora_identity::{ActorId, StoreError};
use agora_ledger::store::{CancellationOutcome, CommitOutcome, SponsorshipCommit};
use agora_ledger::{
    Challenge, ChallengeId, CreditBalance, CreditLedger, CreditLogEntry, CreditLogKind,
    LedgerError, LedgerStore, MemoryLedgerStore, RequestKey, SponsorshipStatus,
    SponsorshipTransaction, Tier, TransactionId,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Helper: a ledger with one registered challenge and one funded sponsor.
async fn funded_ledger(
    total_credits: u64,
) -> (CreditLedger, Arc<MemoryLedgerStore>, ActorId, ChallengeId) {
    let store = Arc::new(MemoryLedgerStore::new());
    let challenge = Challenge::new("Community solar drive");
    let challenge_id = challenge.id;
    store.register_challenge(challenge);

    let sponsor = ActorId::new();
    let ledger = CreditLedger::new(Arc::clone(&store) as Arc<dyn LedgerStore>);
    ledger
        .grant_credits(sponsor, total_credits, "subscription purchase")
        .await
        .unwrap();
    (ledger, store, sponsor, challenge_id)
}

/// Tenet: a successful sponsorship applies all three durable effects —
/// balance debit, transaction row, audit entry — and reports the updated
/// available balance.
#[tokio::test]
async fn silver_sponsorship_applies_all_effects() {
    let (ledger, _store, sponsor, challenge) = funded_ledger(50).await;

    let receipt = ledger
        .sponsor_challenge(sponsor, challenge, Tier::Silver, RequestKey::new())
        .await
        .unwrap();

    assert_eq!(receipt.balance.available(), 30);
    assert_eq!(receipt.balance.used_credits, 20);

    let transactions = ledger.transactions_for(sponsor).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].cost, 20);
    assert_eq!(transactions[0].status, SponsorshipStatus::Active);

    let log = ledger.audit_log_for(sponsor).await.unwrap();
    let sponsorship_entries: Vec<_> = log
        .iter()
        .filter(|e| e.kind == CreditLogKind::Sponsorship)
        .collect();
    assert_eq!(sponsorship_entries.len(), 1);
    assert_eq!(sponsorship_entries[0].amount, -20);
    assert!(sponsorship_entries[0]
        .description
        .contains(&challenge.to_string()));
}

/// Tenet: an underfunded sponsor is rejected with the shortfall reported and
/// zero mutation — balance, transactions, and log are all untouched.
#[tokio::test]
async fn insufficient_credits_rejects_without_mutation() {
    let (ledger, _store, sponsor, challenge) = funded_ledger(5).await;

    let err = ledger
        .sponsor_challenge(sponsor, challenge, Tier::Bronze, RequestKey::new())
        .await
        .unwrap_err();

    match err {
        LedgerError::InsufficientCredits {
            required,
            available,
        } => {
            assert_eq!(required, 10);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientCredits, got {other:?}"),
    }

    assert_eq!(ledger.balance_of(sponsor).await.unwrap().available(), 5);
    assert!(ledger.transactions_for(sponsor).await.unwrap().is_empty());
    let log = ledger.audit_log_for(sponsor).await.unwrap();
    assert!(log.iter().all(|e| e.kind == CreditLogKind::Grant));
}

/// Tenet: dangling references fail with typed NotFound errors before any
/// write happens.
#[tokio::test]
async fn dangling_references_are_typed_failures() {
    let (ledger, _store, sponsor, challenge) = funded_ledger(50).await;

    let err = ledger
        .sponsor_challenge(sponsor, ChallengeId::new(), Tier::Bronze, RequestKey::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ChallengeNotFound(_)));

    let stranger = ActorId::new();
    let err = ledger
        .sponsor_challenge(stranger, challenge, Tier::Bronze, RequestKey::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SponsorNotFound(id) if id == stranger));

    assert_eq!(ledger.balance_of(sponsor).await.unwrap().available(), 50);
}

/// Tenet: two concurrent bronze sponsorships against available=15 resolve to
/// exactly one success and one InsufficientCredits; the final balance is 5,
/// never -5 or 15.
#[tokio::test]
async fn concurrent_overspend_is_rejected() {
    let (ledger, _store, sponsor, challenge) = funded_ledger(15).await;

    let first = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .sponsor_challenge(sponsor, challenge, Tier::Bronze, RequestKey::new())
                .await
        })
    };
    let second = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .sponsor_challenge(sponsor, challenge, Tier::Bronze, RequestKey::new())
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(LedgerError::InsufficientCredits { available: 5, .. })
            )
        })
        .count();

    assert_eq!(successes, 1, "exactly one attempt may win: {results:?}");
    assert_eq!(rejections, 1);
    assert_eq!(ledger.balance_of(sponsor).await.unwrap().available(), 5);
    assert_eq!(ledger.transactions_for(sponsor).await.unwrap().len(), 1);
}

/// Tenet: replaying a request key returns the original transaction and does
/// not charge a second time.
#[tokio::test]
async fn replayed_request_key_charges_once() {
    let (ledger, _store, sponsor, challenge) = funded_ledger(100).await;
    let key = RequestKey::new();

    let first = ledger
        .sponsor_challenge(sponsor, challenge, Tier::Gold, key)
        .await
        .unwrap();
    let replay = ledger
        .sponsor_challenge(sponsor, challenge, Tier::Gold, key)
        .await
        .unwrap();

    assert_eq!(replay.transaction_id, first.transaction_id);
    assert_eq!(replay.balance.available(), 60);
    assert_eq!(ledger.transactions_for(sponsor).await.unwrap().len(), 1);
}

/// Tenet: cancellation refunds the full cost atomically, appends a positive
/// audit entry, and never refunds twice.
#[tokio::test]
async fn cancellation_refunds_in_full_exactly_once() {
    let (ledger, _store, sponsor, challenge) = funded_ledger(50).await;
    let receipt = ledger
        .sponsor_challenge(sponsor, challenge, Tier::Silver, RequestKey::new())
        .await
        .unwrap();

    let balance = ledger
        .cancel_sponsorship(receipt.transaction_id)
        .await
        .unwrap();
    assert_eq!(balance.available(), 50);
    assert_eq!(balance.used_credits, 0);

    let txn = ledger.transaction(receipt.transaction_id).await.unwrap();
    assert_eq!(txn.status, SponsorshipStatus::Cancelled);

    let log = ledger.audit_log_for(sponsor).await.unwrap();
    let refund = log.iter().find(|e| e.kind == CreditLogKind::Refund).unwrap();
    assert_eq!(refund.amount, 20);

    let err = ledger
        .cancel_sponsorship(receipt.transaction_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyCancelled(_)));
    assert_eq!(ledger.balance_of(sponsor).await.unwrap().available(), 50);
}

/// Tenet: cancelling an unknown transaction is a typed NotFound.
#[tokio::test]
async fn cancelling_unknown_transaction_fails() {
    let (ledger, _store, _sponsor, _challenge) = funded_ledger(50).await;
    let err = ledger
        .cancel_sponsorship(TransactionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TransactionNotFound(_)));
}

/// Store wrapper that fails every sponsorship commit while delegating reads,
/// for observing what a mid-operation infrastructure failure leaves behind.
struct FailingCommitStore {
    inner: Arc<MemoryLedgerStore>,
    fail_commits: AtomicBool,
}

#[async_trait]
impl LedgerStore for FailingCommitStore {
    async fn balance(&self, sponsor: ActorId) -> Result<Option<CreditBalance>, StoreError> {
        self.inner.balance(sponsor).await
    }

    async fn challenge_exists(&self, challenge: ChallengeId) -> Result<bool, StoreError> {
        self.inner.challenge_exists(challenge).await
    }

    async fn commit_sponsorship(
        &self,
        commit: SponsorshipCommit,
    ) -> Result<CommitOutcome, StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence("simulated outage".to_string()));
        }
        self.inner.commit_sponsorship(commit).await
    }

    async fn commit_cancellation(
        &self,
        transaction_id: TransactionId,
    ) -> Result<CancellationOutcome, StoreError> {
        self.inner.commit_cancellation(transaction_id).await
    }

    async fn grant_credits(
        &self,
        sponsor: ActorId,
        amount: u64,
        description: &str,
    ) -> Result<CreditBalance, StoreError> {
        self.inner.grant_credits(sponsor, amount, description).await
    }

    async fn transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<SponsorshipTransaction>, StoreError> {
        self.inner.transaction(transaction_id).await
    }

    async fn transactions_for(
        &self,
        sponsor: ActorId,
    ) -> Result<Vec<SponsorshipTransaction>, StoreError> {
        self.inner.transactions_for(sponsor).await
    }

    async fn log_for(&self, sponsor: ActorId) -> Result<Vec<CreditLogEntry>, StoreError> {
        self.inner.log_for(sponsor).await
    }
}

/// Tenet: a failed sponsorship leaves no partial effect — transaction count,
/// balance, and audit-log length stay consistent with "none written", and the
/// same action succeeds cleanly once the store recovers.
#[tokio::test]
async fn failed_commit_leaves_no_partial_effects() {
    let inner = Arc::new(MemoryLedgerStore::new());
    let challenge = Challenge::new("River cleanup");
    let challenge_id = challenge.id;
    inner.register_challenge(challenge);

    let failing = Arc::new(FailingCommitStore {
        inner: Arc::clone(&inner),
        fail_commits: AtomicBool::new(true),
    });
    let ledger = CreditLedger::new(Arc::clone(&failing) as Arc<dyn LedgerStore>);

    let sponsor = ActorId::new();
    ledger
        .grant_credits(sponsor, 50, "subscription purchase")
        .await
        .unwrap();

    let key = RequestKey::new();
    let err = ledger
        .sponsor_challenge(sponsor, challenge_id, Tier::Silver, key)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    // "None written": no debit, no transaction, no sponsorship log entry.
    assert_eq!(ledger.balance_of(sponsor).await.unwrap().available(), 50);
    assert!(ledger.transactions_for(sponsor).await.unwrap().is_empty());
    let log = ledger.audit_log_for(sponsor).await.unwrap();
    assert!(log.iter().all(|e| e.kind == CreditLogKind::Grant));

    // Recovery: the retried action (same key) applies exactly once.
    failing.fail_commits.store(false, Ordering::SeqCst);
    let receipt = ledger
        .sponsor_challenge(sponsor, challenge_id, Tier::Silver, key)
        .await
        .unwrap();
    assert_eq!(receipt.balance.available(), 30);
    assert_eq!(ledger.transactions_for(sponsor).await.unwrap().len(), 1);
}
