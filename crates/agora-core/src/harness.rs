//! Ledger simulator - randomized consistency testing
//!
//! Drives a seeded random mix of grants, sponsorships, and cancellations
//! against the in-memory ledger, re-checking the bookkeeping invariants after
//! every operation:
//! - used_credits never exceeds total_credits
//! - active transaction costs always sum to used_credits
//! - the signed audit-log sum always equals the available balance
//!
//! A final concurrent phase races sponsorship attempts over a tight balance
//! and verifies that overspend is impossible.

use agora_identity::ActorId;
use agora_ledger::{
    Challenge, ChallengeId, CreditLedger, LedgerError, LedgerStore, MemoryLedgerStore, RequestKey,
    SponsorshipStatus, Tier, TransactionId,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total sequential operations to run
    pub total_operations: u64,
    /// Number of sponsors sharing the ledger
    pub sponsors: usize,
    /// Number of registered challenges
    pub challenges: usize,
    /// Concurrent sponsorship attempts in the race phase
    pub race_attempts: usize,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1000,
            sponsors: 4,
            challenges: 8,
            race_attempts: 16,
            stop_on_first_violation: true,
        }
    }
}

/// Randomly generated ledger operation
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    /// Grant credits to a sponsor
    Grant { sponsor: ActorId, amount: u64 },
    /// Sponsor a challenge at a tier
    Sponsor {
        sponsor: ActorId,
        challenge: ChallengeId,
        tier: Tier,
    },
    /// Cancel a previously recorded transaction
    Cancel { transaction_id: TransactionId },
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// used_credits exceeded total_credits
    BalanceUnderflow { sponsor: ActorId, used: u64, total: u64 },
    /// Active transaction costs diverged from used_credits
    TransactionDivergence { sponsor: ActorId, active_cost: u64, used: u64 },
    /// Audit-log sum diverged from the balance
    AuditLogDivergence { sponsor: ActorId, log_sum: i64, expected: i64 },
    /// More than one racing attempt won a balance that covers only one
    OverspendAccepted { winners: usize, available: u64 },
    /// An operation failed in a way the ledger contract does not allow
    UnexpectedError {
        operation: SimulatedOperation,
        error: String,
    },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    /// Grants executed
    pub grants: u64,
    /// Sponsorships that committed
    pub sponsorships_succeeded: u64,
    /// Sponsorships rejected for insufficient credits or a missing balance
    pub sponsorships_rejected: u64,
    /// Cancellations that refunded
    pub cancellations: u64,
    /// Cancellations of already-cancelled transactions
    pub cancellation_conflicts: u64,
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Operation counts
    pub stats: SimulatorStats,
    /// Invariant violations detected
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== WellAgora Ledger Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Operations: {}\n", self.config.total_operations));
        report.push_str(&format!("Grants: {}\n", self.stats.grants));
        report.push_str(&format!(
            "Sponsorships Succeeded: {}\n",
            self.stats.sponsorships_succeeded
        ));
        report.push_str(&format!(
            "Sponsorships Rejected: {}\n",
            self.stats.sponsorships_rejected
        ));
        report.push_str(&format!("Cancellations: {}\n", self.stats.cancellations));
        report.push_str(&format!(
            "Cancellation Conflicts: {}\n",
            self.stats.cancellation_conflicts
        ));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Run the ledger simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let store = Arc::new(MemoryLedgerStore::new());
    let challenges: Vec<ChallengeId> = (0..config.challenges)
        .map(|i| {
            let challenge = Challenge::new(format!("simulated challenge {i}"));
            let id = challenge.id;
            store.register_challenge(challenge);
            id
        })
        .collect();
    let sponsors: Vec<ActorId> = (0..config.sponsors).map(|_| ActorId::new()).collect();

    let ledger = CreditLedger::new(Arc::clone(&store) as Arc<dyn LedgerStore>);
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();
    let mut recorded: Vec<TransactionId> = Vec::new();

    // Phase 1: sequential random operations with invariant checks
    for _ in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &sponsors, &challenges, &recorded);

        match execute_operation(&ledger, &operation, &mut stats, &mut recorded).await {
            Ok(()) => {}
            Err(error) => {
                violations.push(Violation::UnexpectedError {
                    operation: operation.clone(),
                    error,
                });
                if config.stop_on_first_violation {
                    break;
                }
            }
        }

        let touched = operation_sponsor(&operation, &ledger).await;
        if let Some(sponsor) = touched {
            check_invariants(&ledger, sponsor, &mut violations).await;
            if !violations.is_empty() && config.stop_on_first_violation {
                break;
            }
        }
    }

    // Phase 2: concurrent overspend race on a fresh tight balance
    if violations.is_empty() || !config.stop_on_first_violation {
        run_race_phase(&ledger, &challenges, config.race_attempts, &mut violations).await;
    }

    SimulatorReport {
        config,
        stats,
        violations,
    }
}

fn generate_operation(
    rng: &mut StdRng,
    sponsors: &[ActorId],
    challenges: &[ChallengeId],
    recorded: &[TransactionId],
) -> SimulatedOperation {
    let sponsor = sponsors[rng.gen_range(0..sponsors.len())];
    match rng.gen_range(0..10u8) {
        0..=2 => SimulatedOperation::Grant {
            sponsor,
            amount: rng.gen_range(1..=200),
        },
        3..=7 => SimulatedOperation::Sponsor {
            sponsor,
            challenge: challenges[rng.gen_range(0..challenges.len())],
            tier: Tier::ALL[rng.gen_range(0..Tier::ALL.len())],
        },
        _ => {
            if recorded.is_empty() {
                SimulatedOperation::Grant {
                    sponsor,
                    amount: rng.gen_range(1..=200),
                }
            } else {
                SimulatedOperation::Cancel {
                    transaction_id: recorded[rng.gen_range(0..recorded.len())],
                }
            }
        }
    }
}

async fn execute_operation(
    ledger: &CreditLedger,
    operation: &SimulatedOperation,
    stats: &mut SimulatorStats,
    recorded: &mut Vec<TransactionId>,
) -> Result<(), String> {
    match operation {
        SimulatedOperation::Grant { sponsor, amount } => {
            ledger
                .grant_credits(*sponsor, *amount, "simulator grant")
                .await
                .map_err(|e| e.to_string())?;
            stats.grants += 1;
            Ok(())
        }
        SimulatedOperation::Sponsor {
            sponsor,
            challenge,
            tier,
        } => match ledger
            .sponsor_challenge(*sponsor, *challenge, *tier, RequestKey::new())
            .await
        {
            Ok(receipt) => {
                stats.sponsorships_succeeded += 1;
                recorded.push(receipt.transaction_id);
                Ok(())
            }
            Err(LedgerError::InsufficientCredits { .. } | LedgerError::SponsorNotFound(_)) => {
                stats.sponsorships_rejected += 1;
                Ok(())
            }
            Err(other) => Err(other.to_string()),
        },
        SimulatedOperation::Cancel { transaction_id } => {
            match ledger.cancel_sponsorship(*transaction_id).await {
                Ok(_) => {
                    stats.cancellations += 1;
                    Ok(())
                }
                Err(LedgerError::AlreadyCancelled(_)) => {
                    stats.cancellation_conflicts += 1;
                    Ok(())
                }
                Err(other) => Err(other.to_string()),
            }
        }
    }
}

/// Sponsor whose account the operation touched, for targeted checks
async fn operation_sponsor(
    operation: &SimulatedOperation,
    ledger: &CreditLedger,
) -> Option<ActorId> {
    match operation {
        SimulatedOperation::Grant { sponsor, .. }
        | SimulatedOperation::Sponsor { sponsor, .. } => Some(*sponsor),
        SimulatedOperation::Cancel { transaction_id } => ledger
            .transaction(*transaction_id)
            .await
            .ok()
            .map(|t| t.sponsor),
    }
}

async fn check_invariants(
    ledger: &CreditLedger,
    sponsor: ActorId,
    violations: &mut Vec<Violation>,
) {
    let Ok(balance) = ledger.balance_of(sponsor).await else {
        return;
    };

    if balance.used_credits > balance.total_credits {
        violations.push(Violation::BalanceUnderflow {
            sponsor,
            used: balance.used_credits,
            total: balance.total_credits,
        });
    }

    let Ok(transactions) = ledger.transactions_for(sponsor).await else {
        return;
    };
    let active_cost: u64 = transactions
        .iter()
        .filter(|t| t.status == SponsorshipStatus::Active)
        .map(|t| t.cost)
        .sum();
    if active_cost != balance.used_credits {
        violations.push(Violation::TransactionDivergence {
            sponsor,
            active_cost,
            used: balance.used_credits,
        });
    }

    let Ok(log) = ledger.audit_log_for(sponsor).await else {
        return;
    };
    let log_sum: i64 = log.iter().map(|e| e.amount).sum();
    let expected = i64::try_from(balance.available()).unwrap_or(i64::MAX);
    if log_sum != expected {
        violations.push(Violation::AuditLogDivergence {
            sponsor,
            log_sum,
            expected,
        });
    }
}

/// Race concurrent bronze sponsorships over a balance that covers one
async fn run_race_phase(
    ledger: &CreditLedger,
    challenges: &[ChallengeId],
    attempts: usize,
    violations: &mut Vec<Violation>,
) {
    let Some(&challenge) = challenges.first() else {
        return;
    };
    let racer = ActorId::new();
    let available = Tier::Bronze.credit_cost() + 5;
    if ledger
        .grant_credits(racer, available, "race phase grant")
        .await
        .is_err()
    {
        return;
    }

    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .sponsor_challenge(racer, challenge, Tier::Bronze, RequestKey::new())
                    .await
            })
        })
        .collect();

    let mut winners = 0usize;
    for handle in handles {
        if let Ok(Ok(_)) = handle.await {
            winners += 1;
        }
    }

    if winners != 1 {
        violations.push(Violation::OverspendAccepted { winners, available });
    }
}
