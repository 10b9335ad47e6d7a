use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where a re-registered tool lands in the listing order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReregistrationPolicy {
    /// Replace the entry but keep its first-registration slot.
    KeepPosition,
    /// Replace the entry and move it behind every other tool.
    MoveToEnd,
}

impl Default for ReregistrationPolicy {
    fn default() -> Self {
        Self::KeepPosition
    }
}

impl FromStr for ReregistrationPolicy {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep_position" | "keep" | "in_place" => Ok(Self::KeepPosition),
            "move_to_end" | "move" | "append" => Ok(Self::MoveToEnd),
            other => Err(anyhow!("unknown reregistration policy '{}'", other)),
        }
    }
}
