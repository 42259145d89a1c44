//! Core types for the sponsorship credit ledger
//!
//! Defines:
//! - Challenge, transaction, and request identifiers
//! - Package tiers with their fixed credit prices
//! - The sponsor credit balance and its arithmetic
//! - Immutable sponsorship transactions and audit-log entries

use agora_identity::ActorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

use crate::error::UnknownTier;

/// Unique challenge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChallengeId(pub Ulid);

impl ChallengeId {
    /// Generate new challenge ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique sponsorship transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Ulid);

impl TransactionId {
    /// Generate new transaction ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Idempotency key identifying one user-level sponsorship action.
///
/// A retried or duplicated call carries the same key and charges at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey(pub Ulid);

impl RequestKey {
    /// Generate new request key
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RequestKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sponsorship package tier with a fixed credit price.
///
/// Ordered by value: bronze < silver < gold < platinum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Entry tier, 10 credits
    Bronze,
    /// 20 credits
    Silver,
    /// 40 credits
    Gold,
    /// Top tier, 100 credits
    Platinum,
}

impl Tier {
    /// All tiers, cheapest first
    pub const ALL: [Tier; 4] = [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum];

    /// Fixed credit cost of this tier
    #[inline]
    #[must_use]
    pub fn credit_cost(&self) -> u64 {
        match self {
            Tier::Bronze => 10,
            Tier::Silver => 20,
            Tier::Gold => 40,
            Tier::Platinum => 100,
        }
    }

    /// Lowercase wire form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(Tier::Bronze),
            "silver" => Ok(Tier::Silver),
            "gold" => Ok(Tier::Gold),
            "platinum" => Ok(Tier::Platinum),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// One sponsor's prepaid credit balance.
///
/// Invariant: `used_credits <= total_credits` at all times, so `available()`
/// never underflows. All mutation goes through [`charge`](Self::charge),
/// [`refund`](Self::refund), and [`grant`](Self::grant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// Credits ever granted
    pub total_credits: u64,
    /// Credits consumed by active sponsorships
    pub used_credits: u64,
}

impl CreditBalance {
    /// Fresh balance from an initial grant
    #[inline]
    #[must_use]
    pub fn new(total_credits: u64) -> Self {
        Self {
            total_credits,
            used_credits: 0,
        }
    }

    /// Credits still available to spend
    #[inline]
    #[must_use]
    pub fn available(&self) -> u64 {
        self.total_credits - self.used_credits
    }

    /// Conditionally consume credits: the ledger's single debit path.
    ///
    /// Returns `false` and leaves the balance untouched when fewer than
    /// `cost` credits are available.
    #[must_use]
    pub fn charge(&mut self, cost: u64) -> bool {
        if self.available() < cost {
            return false;
        }
        self.used_credits += cost;
        true
    }

    /// Return previously consumed credits (compensating action)
    pub fn refund(&mut self, cost: u64) {
        self.used_credits = self.used_credits.saturating_sub(cost);
    }

    /// Add newly granted credits, saturating at `u64::MAX`
    pub fn grant(&mut self, amount: u64) {
        self.total_credits = self.total_credits.saturating_add(amount);
    }
}

/// Lifecycle status of a sponsorship transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorshipStatus {
    /// Counted against the sponsor's balance
    Active,
    /// Cancelled and refunded
    Cancelled,
}

/// Immutable record of one credit-consuming sponsorship.
///
/// Never mutated after creation except the status flip on cancellation,
/// which is always paired with a compensating refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipTransaction {
    /// Transaction identifier
    pub id: TransactionId,
    /// Sponsoring actor
    pub sponsor: ActorId,
    /// Sponsored challenge
    pub challenge: ChallengeId,
    /// Package tier purchased
    pub tier: Tier,
    /// Credit cost charged (tier price at purchase time)
    pub cost: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: SponsorshipStatus,
}

impl SponsorshipTransaction {
    /// Create an active transaction for the given tier
    #[must_use]
    pub fn new(sponsor: ActorId, challenge: ChallengeId, tier: Tier) -> Self {
        Self {
            id: TransactionId::new(),
            sponsor,
            challenge,
            tier,
            cost: tier.credit_cost(),
            created_at: Utc::now(),
            status: SponsorshipStatus::Active,
        }
    }
}

/// Classification of audit-log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditLogKind {
    /// Credits consumed by a sponsorship (negative amount)
    Sponsorship,
    /// Credits returned by a cancellation (positive amount)
    Refund,
    /// Credits granted by purchase or admin action (positive amount)
    Grant,
}

/// One immutable audit-log entry with a signed credit amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLogEntry {
    /// Entry identifier
    pub id: Ulid,
    /// Sponsor the entry belongs to
    pub sponsor: ActorId,
    /// Signed credit delta (negative for sponsorships)
    pub amount: i64,
    /// Entry classification
    pub kind: CreditLogKind,
    /// Human-readable description referencing the cause
    pub description: String,
    /// Entry time
    pub created_at: DateTime<Utc>,
}

impl CreditLogEntry {
    /// Create a log entry timestamped now
    #[must_use]
    pub fn new(
        sponsor: ActorId,
        amount: i64,
        kind: CreditLogKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            sponsor,
            amount,
            kind,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

/// Successful sponsorship result: the transaction plus the updated balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipReceipt {
    /// Recorded transaction
    pub transaction_id: TransactionId,
    /// Balance after the debit
    pub balance: CreditBalance,
}

/// Minimal challenge record backing existence checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Challenge identifier
    pub id: ChallengeId,
    /// Challenge title
    pub title: String,
}

impl Challenge {
    /// Create a challenge with a fresh identifier
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ChallengeId::new(),
            title: title.into(),
        }
    }
}
