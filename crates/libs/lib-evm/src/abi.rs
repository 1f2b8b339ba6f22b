//! Contract bindings for the crowdfunding registry and per-campaign contracts.
//!
//! Calldata is built and return data decoded through the `sol!` generated types, then
//! converted into the `shared` DTOs. Out-of-range integers and unknown status
//! discriminants are rejected here rather than silently truncated.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, Panic, Revert, SolCall, SolError};
use shared::dto::campaign::{Campaign, CampaignState, Tier, UnknownCampaignState};
use thiserror::Error;

/// Reason reported when a revert carries no decodable payload.
pub const GENERIC_REVERT_REASON: &str = "Transaction reverted";

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct CampaignRecord {
        address campaignAddress;
        address owner;
        string name;
        uint256 creationTime;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct TierRecord {
        string name;
        uint256 amount;
        uint256 backers;
    }

    interface ICrowdfundingManager {
        function createCampaign(string name, string description, uint256 goal, uint256 durationInDays) external;
        function getUserCampaigns(address user) external view returns (CampaignRecord[]);
        function getAllCampaigns() external view returns (CampaignRecord[]);
        function togglePause() external;
        function paused() external view returns (bool);
    }

    interface ICrowdfunding {
        function name() external view returns (string);
        function description() external view returns (string);
        function goal() external view returns (uint256);
        function deadline() external view returns (uint256);
        function owner() external view returns (address);
        function addTier(string name, uint256 amount) external;
        function removeTier(uint256 index) external;
        function getTiers() external view returns (TierRecord[]);
        function fund(uint256 tierIndex) external payable;
        function withdraw() external;
        function getContractBalance() external view returns (uint256);
        function getCampaignStatus() external view returns (uint8);
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("abi decode failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: U256 },

    #[error(transparent)]
    State(#[from] UnknownCampaignState),
}

pub fn encode<C: SolCall>(call: &C) -> Bytes {
    Bytes::from(call.abi_encode())
}

pub fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return, DecodeError> {
    Ok(C::abi_decode_returns(data)?)
}

pub fn to_u64(field: &'static str, value: U256) -> Result<u64, DecodeError> {
    u64::try_from(value).map_err(|_| DecodeError::OutOfRange { field, value })
}

pub fn campaign_state(discriminant: u8) -> Result<CampaignState, DecodeError> {
    Ok(CampaignState::try_from(discriminant)?)
}

pub fn campaign_from_record(record: CampaignRecord) -> Result<Campaign, DecodeError> {
    Ok(Campaign {
        address: record.campaignAddress,
        owner: record.owner,
        name: record.name,
        creation_time: to_u64("creationTime", record.creationTime)?,
    })
}

pub fn tier_from_record(record: TierRecord) -> Result<Tier, DecodeError> {
    Ok(Tier {
        name: record.name,
        amount: record.amount,
        backers: to_u64("backers", record.backers)?,
    })
}

/// Decode `Error(string)` or `Panic(uint256)` revert data.
///
/// Returns `None` for empty reasons and for payloads that are neither.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason).filter(|reason| !reason.is_empty());
    }
    Panic::abi_decode(data)
        .ok()
        .map(|panic| format!("panic code 0x{:x}", panic.code))
}

#[cfg(test)]
pub(crate) fn revert_payload(reason: &str) -> Bytes {
    Bytes::from(
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode(),
    )
}
