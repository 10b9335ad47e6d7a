use serde::{Deserialize, Serialize};

/// The one protocol token that selects the legacy response shape.
pub const LEGACY_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MODERN_PROTOCOL_VERSION: &str = "2025-03-26";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolRevision {
    Legacy,
    Modern,
}

impl ProtocolRevision {
    /// Exact match on the legacy token; everything else, including unknown or
    /// future tokens, is modern.
    pub fn from_claim(claimed: &str) -> Self {
        if claimed == LEGACY_PROTOCOL_VERSION {
            Self::Legacy
        } else {
            Self::Modern
        }
    }

    pub fn protocol_version(&self) -> &'static str {
        match self {
            Self::Legacy => LEGACY_PROTOCOL_VERSION,
            Self::Modern => MODERN_PROTOCOL_VERSION,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "LEGACY",
            Self::Modern => "MODERN",
        }
    }
}

impl Default for ProtocolRevision {
    fn default() -> Self {
        Self::Modern
    }
}
