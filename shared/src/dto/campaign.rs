use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry entry for a deployed campaign contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    /// Address of the per-campaign contract
    pub address: Address,
    pub owner: Address,
    pub name: String,
    /// Unix timestamp (seconds) of the registry entry
    pub creation_time: u64,
}

/// On-chain lifecycle state reported by `getCampaignStatus()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CampaignState {
    Active,
    Successful,
    Failed,
}

impl CampaignState {
    pub fn label(&self) -> &'static str {
        match self {
            CampaignState::Active => "Active",
            CampaignState::Successful => "Successful",
            CampaignState::Failed => "Failed",
        }
    }
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for a status discriminant the contract is not known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCampaignState(pub u8);

impl fmt::Display for UnknownCampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown campaign state discriminant {}", self.0)
    }
}

impl std::error::Error for UnknownCampaignState {}

impl TryFrom<u8> for CampaignState {
    type Error = UnknownCampaignState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CampaignState::Active),
            1 => Ok(CampaignState::Successful),
            2 => Ok(CampaignState::Failed),
            other => Err(UnknownCampaignState(other)),
        }
    }
}

/// A funding level. Its position in [`CampaignDetails::tiers`] is its identity for
/// `fund` / `removeTier`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tier {
    pub name: String,
    /// Contribution amount in wei
    pub amount: U256,
    pub backers: u64,
}

/// Full snapshot of a single campaign contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignDetails {
    pub name: String,
    pub description: String,
    /// Funding goal in wei
    pub goal: U256,
    /// Unix timestamp (seconds)
    pub deadline: u64,
    pub owner: Address,
    /// Current contract balance in wei
    pub balance: U256,
    pub state: CampaignState,
    pub tiers: Vec<Tier>,
}

impl CampaignDetails {
    /// Ratio of balance to goal. Over-funded campaigns report values above `1.0`.
    ///
    /// Returns `None` when the goal is zero.
    pub fn funding_ratio(&self) -> Option<f64> {
        if self.goal.is_zero() {
            return None;
        }
        // Basis points keep the division in integer space
        let bps = self.balance.saturating_mul(U256::from(10_000u64)) / self.goal;
        let bps = u64::try_from(bps).unwrap_or(u64::MAX);
        Some(bps as f64 / 10_000.0)
    }

    /// Whether the deadline is still ahead of `now` (unix seconds).
    pub fn is_open(&self, now: u64) -> bool {
        self.deadline > now
    }

    pub fn tier(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }
}
