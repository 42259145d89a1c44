//! In-memory ledger store
//!
//! Reference [`LedgerStore`] implementation backing tests and the simulator.
//! Each sponsor's account lives behind its own mutex; the conditional debit,
//! transaction insert, and log append happen under that one lock, which is
//! what makes the commit atomic and serializes concurrent commits per
//! sponsor.

use crate::store::{CancellationOutcome, CommitOutcome, LedgerStore, SponsorshipCommit};
use crate::types::{
    Challenge, ChallengeId, CreditBalance, CreditLogEntry, CreditLogKind, RequestKey,
    SponsorshipReceipt, SponsorshipStatus, SponsorshipTransaction, TransactionId,
};
use agora_identity::{ActorId, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-sponsor account state, mutated only under its mutex
#[derive(Debug, Default)]
struct SponsorAccount {
    balance: CreditBalance,
    transactions: Vec<SponsorshipTransaction>,
    log: Vec<CreditLogEntry>,
    applied: HashMap<RequestKey, TransactionId>,
}

/// In-memory [`LedgerStore`]
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    accounts: DashMap<ActorId, Arc<Mutex<SponsorAccount>>>,
    challenges: DashMap<ChallengeId, Challenge>,
    transaction_owners: DashMap<TransactionId, ActorId>,
}

impl MemoryLedgerStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a challenge so sponsorships can reference it
    pub fn register_challenge(&self, challenge: Challenge) {
        self.challenges.insert(challenge.id, challenge);
    }

    /// Number of registered challenges
    #[must_use]
    pub fn challenge_count(&self) -> usize {
        self.challenges.len()
    }

    fn account(&self, sponsor: ActorId) -> Option<Arc<Mutex<SponsorAccount>>> {
        self.accounts.get(&sponsor).map(|entry| Arc::clone(&entry))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn balance(&self, sponsor: ActorId) -> Result<Option<CreditBalance>, StoreError> {
        Ok(self.account(sponsor).map(|account| account.lock().balance))
    }

    async fn challenge_exists(&self, challenge: ChallengeId) -> Result<bool, StoreError> {
        Ok(self.challenges.contains_key(&challenge))
    }

    async fn commit_sponsorship(
        &self,
        commit: SponsorshipCommit,
    ) -> Result<CommitOutcome, StoreError> {
        let Some(account) = self.account(commit.sponsor) else {
            return Ok(CommitOutcome::SponsorMissing);
        };

        let mut account = account.lock();

        if let Some(existing) = account.applied.get(&commit.request_key) {
            return Ok(CommitOutcome::Duplicate(*existing));
        }

        let cost = commit.tier.credit_cost();
        if !account.balance.charge(cost) {
            return Ok(CommitOutcome::InsufficientCredits {
                available: account.balance.available(),
            });
        }

        // Debit taken; the remaining effects happen under the same lock.
        let transaction =
            SponsorshipTransaction::new(commit.sponsor, commit.challenge, commit.tier);
        let transaction_id = transaction.id;
        let entry = CreditLogEntry::new(
            commit.sponsor,
            -i64::try_from(cost).unwrap_or(i64::MAX),
            CreditLogKind::Sponsorship,
            format!(
                "sponsorship of challenge {} at {} ({} credits)",
                commit.challenge, commit.tier, cost
            ),
        );

        account.transactions.push(transaction);
        account.log.push(entry);
        account.applied.insert(commit.request_key, transaction_id);
        let balance = account.balance;
        drop(account);

        self.transaction_owners.insert(transaction_id, commit.sponsor);

        Ok(CommitOutcome::Applied(SponsorshipReceipt {
            transaction_id,
            balance,
        }))
    }

    async fn commit_cancellation(
        &self,
        transaction_id: TransactionId,
    ) -> Result<CancellationOutcome, StoreError> {
        let Some(owner) = self.transaction_owners.get(&transaction_id).map(|e| *e) else {
            return Ok(CancellationOutcome::NotFound(transaction_id));
        };
        let Some(account) = self.account(owner) else {
            return Ok(CancellationOutcome::NotFound(transaction_id));
        };

        let mut account = account.lock();

        let Some(position) = account
            .transactions
            .iter()
            .position(|t| t.id == transaction_id)
        else {
            return Ok(CancellationOutcome::NotFound(transaction_id));
        };

        if account.transactions[position].status == SponsorshipStatus::Cancelled {
            return Ok(CancellationOutcome::AlreadyCancelled(transaction_id));
        }

        let (cost, challenge) = {
            let txn = &mut account.transactions[position];
            txn.status = SponsorshipStatus::Cancelled;
            (txn.cost, txn.challenge)
        };
        account.balance.refund(cost);
        let entry = CreditLogEntry::new(
            owner,
            i64::try_from(cost).unwrap_or(i64::MAX),
            CreditLogKind::Refund,
            format!(
                "refund for cancelled sponsorship {transaction_id} of challenge {challenge}"
            ),
        );
        account.log.push(entry);

        Ok(CancellationOutcome::Refunded {
            transaction_id,
            balance: account.balance,
        })
    }

    async fn grant_credits(
        &self,
        sponsor: ActorId,
        amount: u64,
        description: &str,
    ) -> Result<CreditBalance, StoreError> {
        let account = self
            .accounts
            .entry(sponsor)
            .or_insert_with(|| Arc::new(Mutex::new(SponsorAccount::default())))
            .clone();

        let mut account = account.lock();
        account.balance.grant(amount);
        let entry = CreditLogEntry::new(
            sponsor,
            i64::try_from(amount).unwrap_or(i64::MAX),
            CreditLogKind::Grant,
            description.to_string(),
        );
        account.log.push(entry);
        Ok(account.balance)
    }

    async fn transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<SponsorshipTransaction>, StoreError> {
        let Some(owner) = self.transaction_owners.get(&transaction_id).map(|e| *e) else {
            return Ok(None);
        };
        Ok(self.account(owner).and_then(|account| {
            account
                .lock()
                .transactions
                .iter()
                .find(|t| t.id == transaction_id)
                .cloned()
        }))
    }

    async fn transactions_for(
        &self,
        sponsor: ActorId,
    ) -> Result<Vec<SponsorshipTransaction>, StoreError> {
        Ok(self
            .account(sponsor)
            .map(|account| account.lock().transactions.clone())
            .unwrap_or_default())
    }

    async fn log_for(&self, sponsor: ActorId) -> Result<Vec<CreditLogEntry>, StoreError> {
        Ok(self
            .account(sponsor)
            .map(|account| account.lock().log.clone())
            .unwrap_or_default())
    }
}
