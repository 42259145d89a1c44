//! Testing utilities for the WellAgora workspace
//!
//! Shared in-memory providers, fixtures, and helpers.

#![allow(missing_docs)]

use agora_identity::{
    ActorId, AuthEvent, AuthProvider, AuthSession, DemoSession, IdentityError, IdentityResolver,
    MemorySessionCache, Profile, ProfileStore, Role, RoleVerifier, SessionCache, SignupAttributes,
    StoreError,
};
use agora_ledger::{Challenge, ChallengeId, CreditLedger, LedgerStore, MemoryLedgerStore, RequestKey, Tier};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

/// In-memory authentication provider with credential checking and an auth
/// event channel.
pub struct MemoryAuthProvider {
    accounts: DashMap<String, (String, ActorId)>,
    current: Mutex<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: DashMap::new(),
            current: Mutex::new(None),
            events,
        }
    }
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account without going through sign_up
    pub fn seed_account(&self, email: &str, password: &str, actor_id: ActorId) {
        self.accounts
            .insert(email.to_string(), (password.to_string(), actor_id));
    }

    /// Pretend the provider restored a session (e.g. from a stored token)
    pub fn seed_session(&self, session: AuthSession) {
        *self.current.lock() = Some(session);
    }

    /// Emit an auth event to all subscribers
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _attributes: SignupAttributes,
    ) -> Result<ActorId, IdentityError> {
        if self.accounts.contains_key(email) {
            return Err(IdentityError::Authentication(format!(
                "account already exists: {email}"
            )));
        }
        let actor_id = ActorId::new();
        self.seed_account(email, password, actor_id);
        Ok(actor_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let Some(entry) = self.accounts.get(email) else {
            return Err(IdentityError::Authentication(
                "invalid credentials".to_string(),
            ));
        };
        let (stored_password, actor_id) = entry.value().clone();
        if stored_password != password {
            return Err(IdentityError::Authentication(
                "invalid credentials".to_string(),
            ));
        }

        let session = AuthSession::new(actor_id, email, format!("token-{actor_id}"));
        *self.current.lock() = Some(session.clone());
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        *self.current.lock() = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, IdentityError> {
        Ok(self.current.lock().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// In-memory profile table
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<ActorId, Profile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles.insert(profile.actor_id, profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch_profile(&self, actor_id: ActorId) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.get(&actor_id).map(|p| p.clone()))
    }
}

/// In-memory authoritative role check
#[derive(Default)]
pub struct MemoryRoleVerifier {
    super_admins: DashSet<ActorId>,
}

impl MemoryRoleVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_super_admin(&self, actor_id: ActorId) {
        self.super_admins.insert(actor_id);
    }
}

#[async_trait]
impl RoleVerifier for MemoryRoleVerifier {
    async fn is_super_admin(&self, actor_id: ActorId) -> Result<bool, StoreError> {
        Ok(self.super_admins.contains(&actor_id))
    }
}

/// Profile factories

pub fn citizen_profile() -> Profile {
    Profile::new(ActorId::new(), Role::Citizen, "Test Citizen")
}

pub fn sponsor_profile() -> Profile {
    Profile::new(ActorId::new(), Role::Sponsor, "Test Sponsor").with_organization("Green Futures")
}

pub fn super_admin_profile() -> Profile {
    Profile::new(ActorId::new(), Role::Admin, "Test Root").with_super_admin()
}

pub fn demo_session(role: Role) -> DemoSession {
    DemoSession::new(Profile::new(ActorId::new(), role, "Demo Actor"))
}

/// Everything an identity test needs, with handles kept for seeding
pub struct IdentityFixture {
    pub auth: Arc<MemoryAuthProvider>,
    pub profiles: Arc<MemoryProfileStore>,
    pub verifier: Arc<MemoryRoleVerifier>,
    pub cache: Arc<MemorySessionCache>,
    pub resolver: Arc<IdentityResolver>,
}

/// Build a resolver over fresh in-memory providers (demo mode enabled)
#[must_use]
pub fn identity_fixture() -> IdentityFixture {
    let auth = Arc::new(MemoryAuthProvider::new());
    let profiles = Arc::new(MemoryProfileStore::new());
    let verifier = Arc::new(MemoryRoleVerifier::new());
    let cache = Arc::new(MemorySessionCache::new());

    let resolver = Arc::new(
        IdentityResolver::new(
            Arc::clone(&auth) as Arc<dyn AuthProvider>,
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            Arc::clone(&verifier) as Arc<dyn RoleVerifier>,
            Arc::clone(&cache) as Arc<dyn SessionCache>,
        )
        .with_demo_enabled(true),
    );

    IdentityFixture {
        auth,
        profiles,
        verifier,
        cache,
        resolver,
    }
}

/// Seed a signed-in actor with the given profile; returns its session
pub fn seed_signed_in(fixture: &IdentityFixture, profile: Profile) -> AuthSession {
    let session = AuthSession::new(profile.actor_id, "seeded@agora.test", "seeded-token");
    fixture.profiles.insert(profile);
    fixture.auth.seed_session(session.clone());
    session
}

/// A funded ledger with one registered challenge
pub struct LedgerFixture {
    pub ledger: CreditLedger,
    pub store: Arc<MemoryLedgerStore>,
    pub sponsor: ActorId,
    pub challenge: ChallengeId,
}

/// Build a ledger whose sponsor holds `total_credits` against one challenge
pub async fn ledger_with_sponsor(total_credits: u64) -> LedgerFixture {
    let store = Arc::new(MemoryLedgerStore::new());
    let challenge = Challenge::new("Fixture challenge");
    let challenge_id = challenge.id;
    store.register_challenge(challenge);

    let ledger = CreditLedger::new(Arc::clone(&store) as Arc<dyn LedgerStore>);
    let sponsor = ActorId::new();
    if total_credits > 0 {
        ledger
            .grant_credits(sponsor, total_credits, "fixture grant")
            .await
            .expect("grant");
    }

    LedgerFixture {
        ledger,
        store,
        sponsor,
        challenge: challenge_id,
    }
}

/// Sponsor the fixture challenge with a fresh request key
pub async fn sponsor_once(
    fixture: &LedgerFixture,
    tier: Tier,
) -> Result<agora_ledger::SponsorshipReceipt, agora_ledger::LedgerError> {
    fixture
        .ledger
        .sponsor_challenge(fixture.sponsor, fixture.challenge, tier, RequestKey::new())
        .await
}
