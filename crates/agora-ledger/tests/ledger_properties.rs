//! Property tests for ledger bookkeeping invariants.
//!
//! For arbitrary interleavings of grants, sponsorships, and cancellations:
//! - used_credits never exceeds total_credits (available never underflows)
//! - the sum of active transaction costs equals used_credits
//! - the signed audit-log sum equals total_credits - used_credits

use agora_identity::ActorId;
use agora_ledger::{
    Challenge, CreditLedger, LedgerError, LedgerStore, MemoryLedgerStore, RequestKey,
    SponsorshipStatus, Tier, TransactionId,
};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Grant(u64),
    Sponsor(Tier),
    /// Cancel the n-th recorded transaction, if one exists
    Cancel(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..200).prop_map(Op::Grant),
        prop_oneof![
            Just(Tier::Bronze),
            Just(Tier::Silver),
            Just(Tier::Gold),
            Just(Tier::Platinum),
        ]
        .prop_map(Op::Sponsor),
        (0usize..8).prop_map(Op::Cancel),
    ]
}

async fn check_invariants(ledger: &CreditLedger, sponsor: ActorId) {
    let balance = match ledger.balance_of(sponsor).await {
        Ok(balance) => balance,
        // No grant has happened yet; nothing to check.
        Err(LedgerError::SponsorNotFound(_)) => return,
        Err(other) => panic!("unexpected error: {other:?}"),
    };

    assert!(
        balance.used_credits <= balance.total_credits,
        "used {} exceeds total {}",
        balance.used_credits,
        balance.total_credits
    );

    let transactions = ledger.transactions_for(sponsor).await.unwrap();
    let active_cost: u64 = transactions
        .iter()
        .filter(|t| t.status == SponsorshipStatus::Active)
        .map(|t| t.cost)
        .sum();
    assert_eq!(
        active_cost, balance.used_credits,
        "active transaction costs diverged from used_credits"
    );

    let log = ledger.audit_log_for(sponsor).await.unwrap();
    let log_sum: i64 = log.iter().map(|e| e.amount).sum();
    let expected = i64::try_from(balance.total_credits).unwrap()
        - i64::try_from(balance.used_credits).unwrap();
    assert_eq!(log_sum, expected, "audit log diverged from balance");
}

async fn run_sequence(ops: Vec<Op>) {
    let store = Arc::new(MemoryLedgerStore::new());
    let challenge = Challenge::new("Zero-waste week");
    let challenge_id = challenge.id;
    store.register_challenge(challenge);

    let ledger = CreditLedger::new(store as Arc<dyn LedgerStore>);
    let sponsor = ActorId::new();
    let mut recorded: Vec<TransactionId> = Vec::new();

    for op in ops {
        match op {
            Op::Grant(amount) => {
                ledger
                    .grant_credits(sponsor, amount, "property grant")
                    .await
                    .unwrap();
            }
            Op::Sponsor(tier) => {
                match ledger
                    .sponsor_challenge(sponsor, challenge_id, tier, RequestKey::new())
                    .await
                {
                    Ok(receipt) => recorded.push(receipt.transaction_id),
                    Err(
                        LedgerError::InsufficientCredits { .. } | LedgerError::SponsorNotFound(_),
                    ) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
            Op::Cancel(index) => {
                if let Some(id) = recorded.get(index).copied() {
                    match ledger.cancel_sponsorship(id).await {
                        Ok(_) | Err(LedgerError::AlreadyCancelled(_)) => {}
                        Err(other) => panic!("unexpected error: {other:?}"),
                    }
                }
            }
        }
        check_invariants(&ledger, sponsor).await;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bookkeeping_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        runtime.block_on(run_sequence(ops));
    }
}
