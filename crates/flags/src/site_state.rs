//! The site state kill-switch.

use serde::{Deserialize, Serialize};

const ACTIVE: &str = "ACTIVE";

/// Whether the worker fleet should perform side effects.
///
/// Only the exact flag value `ACTIVE` enables processing. Any other value
/// puts the workers in dry-run mode: messages are acknowledged without
/// touching any store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteState {
    Active,
    Inactive(String),
}

impl SiteState {
    /// Parses a raw flag value.
    pub fn from_flag(value: &str) -> Self {
        Self::from(value.to_string())
    }

    /// Returns true if side effects are enabled.
    pub fn is_active(&self) -> bool {
        matches!(self, SiteState::Active)
    }

    /// Returns the raw flag value.
    pub fn as_str(&self) -> &str {
        match self {
            SiteState::Active => ACTIVE,
            SiteState::Inactive(raw) => raw,
        }
    }
}

impl From<String> for SiteState {
    fn from(value: String) -> Self {
        if value == ACTIVE {
            SiteState::Active
        } else {
            SiteState::Inactive(value)
        }
    }
}

impl std::fmt::Display for SiteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
