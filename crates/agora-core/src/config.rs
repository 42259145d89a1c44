//! Platform configuration

use serde::{Deserialize, Serialize};

/// Platform-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Whether persisted demo sessions may activate.
    ///
    /// Off by default: demo identities bypass real authentication and belong
    /// in demo/staging deployments only.
    pub demo_mode_enabled: bool,
}

impl PlatformConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable demo sessions
    #[inline]
    #[must_use]
    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode_enabled = enabled;
        self
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            demo_mode_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_mode_is_off_by_default() {
        assert!(!PlatformConfig::new().demo_mode_enabled);
        assert!(PlatformConfig::new().with_demo_mode(true).demo_mode_enabled);
    }
}
