//! Error types for the platform facade

use agora_identity::IdentityError;
use agora_ledger::LedgerError;

/// Main platform error type
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// No actor is signed in (or the actor has no resolvable role)
    #[error("no signed-in actor with a resolved role")]
    NotSignedIn,

    /// Effective role does not permit the attempted action.
    /// Callers must block immediately, not degrade.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Identity subsystem failure
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Ledger subsystem failure
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl PlatformError {
    /// Check if the error is an authorization block
    #[inline]
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        match self {
            Self::NotSignedIn | Self::Authorization(_) => true,
            Self::Identity(e) => e.is_authorization(),
            Self::Ledger(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_classification() {
        assert!(PlatformError::NotSignedIn.is_authorization());
        assert!(PlatformError::Authorization("x".to_string()).is_authorization());
        let ledger_err = PlatformError::Ledger(LedgerError::InsufficientCredits {
            required: 10,
            available: 0,
        });
        assert!(!ledger_err.is_authorization());
    }
}
