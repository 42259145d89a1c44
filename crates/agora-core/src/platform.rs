//! Platform facade
//!
//! The surface UI callers talk to: resolves the current actor through the
//! identity subsystem, applies role-based authorization, and delegates to the
//! credit ledger. No caller reaches the ledger without passing through the
//! effective-role gate here.

use crate::config::PlatformConfig;
use crate::error::PlatformError;
use agora_identity::{
    ActorId, AuthProvider, IdentityResolver, ProfileStore, ResolvedActor, Role, RoleVerifier,
    SessionCache,
};
use agora_ledger::{
    ChallengeId, CreditBalance, CreditLedger, CreditLogEntry, LedgerStore, RequestKey,
    SponsorshipReceipt, SponsorshipTransaction, Tier, TransactionId,
};
use std::sync::Arc;

/// Roles allowed to spend sponsorship credits
const SPONSORING_ROLES: [Role; 2] = [Role::Sponsor, Role::Admin];

/// The WellAgora platform facade
pub struct Platform {
    identity: Arc<IdentityResolver>,
    ledger: CreditLedger,
    config: PlatformConfig,
}

impl Platform {
    /// Wire the platform over its external seams
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        verifier: Arc<dyn RoleVerifier>,
        cache: Arc<dyn SessionCache>,
        store: Arc<dyn LedgerStore>,
        config: PlatformConfig,
    ) -> Self {
        let identity = Arc::new(
            IdentityResolver::new(auth, profiles, verifier, cache)
                .with_demo_enabled(config.demo_mode_enabled),
        );
        Self {
            identity,
            ledger: CreditLedger::new(store),
            config,
        }
    }

    /// Startup reconciliation of session state
    ///
    /// # Errors
    /// Propagates identity bootstrap failures.
    pub async fn bootstrap(&self) -> Result<(), PlatformError> {
        self.identity.bootstrap().await?;
        Ok(())
    }

    /// The identity resolver (for session and view-mode operations)
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &Arc<IdentityResolver> {
        &self.identity
    }

    /// The underlying credit ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Sponsor a challenge as the current actor.
    ///
    /// Requires an effective role of sponsor or admin; demo identities cannot
    /// spend credits.
    ///
    /// # Errors
    /// `NotSignedIn` / `Authorization` for gate failures, ledger errors
    /// otherwise.
    pub async fn sponsor_challenge(
        &self,
        challenge: ChallengeId,
        tier: Tier,
        request_key: RequestKey,
    ) -> Result<SponsorshipReceipt, PlatformError> {
        let (actor_id, _) = self.require_role(&SPONSORING_ROLES).await?;
        Ok(self
            .ledger
            .sponsor_challenge(actor_id, challenge, tier, request_key)
            .await?)
    }

    /// Cancel a sponsorship as the current actor.
    ///
    /// The owning sponsor may cancel their own transactions; admins may
    /// cancel any.
    ///
    /// # Errors
    /// `Authorization` when the caller owns neither the admin role nor the
    /// transaction; ledger errors otherwise.
    pub async fn cancel_sponsorship(
        &self,
        transaction_id: TransactionId,
    ) -> Result<CreditBalance, PlatformError> {
        let (actor_id, role) = self.require_role(&SPONSORING_ROLES).await?;

        let transaction = self.ledger.transaction(transaction_id).await?;
        if transaction.sponsor != actor_id && role != Role::Admin {
            tracing::warn!(%actor_id, %transaction_id, "cancellation refused: not the owner");
            return Err(PlatformError::Authorization(
                "only the owning sponsor or an admin may cancel a sponsorship".to_string(),
            ));
        }

        Ok(self.ledger.cancel_sponsorship(transaction_id).await?)
    }

    /// Grant credits to a sponsor (admin-only)
    ///
    /// # Errors
    /// `Authorization` unless the effective role is admin.
    pub async fn grant_credits(
        &self,
        sponsor: ActorId,
        amount: u64,
        description: &str,
    ) -> Result<CreditBalance, PlatformError> {
        self.require_role(&[Role::Admin]).await?;
        Ok(self
            .ledger
            .grant_credits(sponsor, amount, description)
            .await?)
    }

    /// Credit balance of the current actor
    ///
    /// # Errors
    /// Gate failures or `SponsorNotFound` for actors without a balance row.
    pub async fn my_balance(&self) -> Result<CreditBalance, PlatformError> {
        let (actor_id, _) = self.require_role(&SPONSORING_ROLES).await?;
        Ok(self.ledger.balance_of(actor_id).await?)
    }

    /// Sponsorship transactions of the current actor, oldest first
    ///
    /// # Errors
    /// Gate failures or ledger errors.
    pub async fn my_sponsorships(&self) -> Result<Vec<SponsorshipTransaction>, PlatformError> {
        let (actor_id, _) = self.require_role(&SPONSORING_ROLES).await?;
        Ok(self.ledger.transactions_for(actor_id).await?)
    }

    /// Audit log of the current actor, oldest first
    ///
    /// # Errors
    /// Gate failures or ledger errors.
    pub async fn my_audit_log(&self) -> Result<Vec<CreditLogEntry>, PlatformError> {
        let (actor_id, _) = self.require_role(&SPONSORING_ROLES).await?;
        Ok(self.ledger.audit_log_for(actor_id).await?)
    }

    /// Resolve the current actor and require one of the given effective
    /// roles. Demo identities are blocked from ledger mutation outright.
    async fn require_role(&self, allowed: &[Role]) -> Result<(ActorId, Role), PlatformError> {
        let actor: ResolvedActor = self.identity.current_actor().await?;

        let Some(actor_id) = actor.actor_id else {
            return Err(PlatformError::NotSignedIn);
        };
        let Some(role) = actor.effective_role else {
            // Authenticated but profile-less: degraded, not a default role.
            return Err(PlatformError::NotSignedIn);
        };

        if actor.state.is_demo() {
            return Err(PlatformError::Authorization(
                "demo identities cannot modify the credit ledger".to_string(),
            ));
        }
        if !allowed.contains(&role) {
            return Err(PlatformError::Authorization(format!(
                "role {role} may not perform this action"
            )));
        }
        Ok((actor_id, role))
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
