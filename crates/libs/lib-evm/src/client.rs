//! # Contract Client
//!
//! Read-only façade over the registry and campaign contracts.
//!
//! Every operation takes a fresh [`SigningHandle`] from the session, so a disconnect
//! between two calls is observed as [`AppError::NotConnected`] rather than a stale read.
//!
//! ## Fault isolation
//!
//! - [`ContractClient::fetch_details`] is all-or-nothing per campaign: the eight field
//!   reads run concurrently and any failure yields [`AppError::DetailsUnavailable`].
//! - [`ContractClient::fetch_details_batch`] isolates campaigns from each other: failed
//!   addresses are omitted from the map, the rest are returned.

use crate::abi::{
    self, campaign_from_record, tier_from_record, DecodeError, ICrowdfunding,
    ICrowdfundingManager,
};
use crate::provider::{ProviderError, TransactionRequest};
use crate::session::{SigningHandle, WalletSession};
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use futures::future::join_all;
use lib_core::error::{AppError, Result};
use shared::dto::campaign::{Campaign, CampaignDetails};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
enum ReadError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

fn query_failed(err: ReadError) -> AppError {
    warn!(error = %err, "Registry read failed");
    AppError::QueryFailed(err.to_string())
}

#[derive(Debug, Clone)]
pub struct ContractClient {
    session: WalletSession,
}

impl ContractClient {
    pub fn new(session: WalletSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    async fn read<C: SolCall>(
        &self,
        handle: &SigningHandle,
        to: Address,
        call: C,
    ) -> std::result::Result<C::Return, ReadError> {
        let request = TransactionRequest {
            from: Some(handle.address()),
            to: Some(to),
            value: None,
            data: Some(abi::encode(&call)),
        };
        let data = handle.provider().call(&request).await?;
        Ok(abi::decode_returns::<C>(&data)?)
    }

    /// Every campaign in the registry, in registry order.
    pub async fn list_all_campaigns(&self) -> Result<Vec<Campaign>> {
        let handle = self.session.signing_handle()?;
        let registry = self.session.config().registry_address;

        let records = self
            .read(&handle, registry, ICrowdfundingManager::getAllCampaignsCall {})
            .await
            .map_err(query_failed)?;
        let campaigns = records
            .into_iter()
            .map(campaign_from_record)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| query_failed(e.into()))?;

        debug!(count = campaigns.len(), "Listed campaigns");
        Ok(campaigns)
    }

    /// Campaigns created by `owner`, as filtered by the registry.
    pub async fn list_user_campaigns(&self, owner: Address) -> Result<Vec<Campaign>> {
        let handle = self.session.signing_handle()?;
        let registry = self.session.config().registry_address;

        let records = self
            .read(
                &handle,
                registry,
                ICrowdfundingManager::getUserCampaignsCall { user: owner },
            )
            .await
            .map_err(query_failed)?;
        records
            .into_iter()
            .map(campaign_from_record)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| query_failed(e.into()))
    }

    /// Whether the registry has paused campaign creation.
    pub async fn is_paused(&self) -> Result<bool> {
        let handle = self.session.signing_handle()?;
        let registry = self.session.config().registry_address;

        self.read(&handle, registry, ICrowdfundingManager::pausedCall {})
            .await
            .map_err(query_failed)
    }

    pub async fn fetch_details(&self, address: Address) -> Result<CampaignDetails> {
        let handle = self.session.signing_handle()?;

        self.load_details(&handle, address).await.map_err(|err| {
            warn!(campaign = %address, error = %err, "Failed to fetch campaign details");
            AppError::DetailsUnavailable(address)
        })
    }

    /// Details for each distinct address; addresses whose reads fail are left out.
    ///
    /// Fails only with [`AppError::NotConnected`].
    pub async fn fetch_details_batch(
        &self,
        addresses: &[Address],
    ) -> Result<HashMap<Address, CampaignDetails>> {
        let handle = self.session.signing_handle()?;
        let unique: HashSet<Address> = addresses.iter().copied().collect();

        let handle = &handle;
        let results = join_all(unique.iter().map(|&address| async move {
            (address, self.load_details(handle, address).await)
        }))
        .await;

        let mut details = HashMap::with_capacity(results.len());
        for (address, result) in results {
            match result {
                Ok(campaign) => {
                    details.insert(address, campaign);
                }
                Err(err) => {
                    warn!(campaign = %address, error = %err, "Omitting campaign from batch");
                }
            }
        }

        info!(
            requested = unique.len(),
            loaded = details.len(),
            "Fetched campaign details"
        );
        Ok(details)
    }

    async fn load_details(
        &self,
        handle: &SigningHandle,
        address: Address,
    ) -> std::result::Result<CampaignDetails, ReadError> {
        let (name, description, goal, deadline, owner, balance, tiers, status) = futures::try_join!(
            self.read(handle, address, ICrowdfunding::nameCall {}),
            self.read(handle, address, ICrowdfunding::descriptionCall {}),
            self.read(handle, address, ICrowdfunding::goalCall {}),
            self.read(handle, address, ICrowdfunding::deadlineCall {}),
            self.read(handle, address, ICrowdfunding::ownerCall {}),
            self.read(handle, address, ICrowdfunding::getContractBalanceCall {}),
            self.read(handle, address, ICrowdfunding::getTiersCall {}),
            self.read(handle, address, ICrowdfunding::getCampaignStatusCall {}),
        )?;

        Ok(CampaignDetails {
            name,
            description,
            goal,
            deadline: abi::to_u64("deadline", deadline)?,
            owner,
            balance,
            state: abi::campaign_state(status)?,
            tiers: tiers
                .into_iter()
                .map(tier_from_record)
                .collect::<std::result::Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{revert_payload, CampaignRecord};
    use crate::mock::{test_config, MockProvider, ALICE, BOB};
    use alloy_primitives::U256;
    use alloy_sol_types::SolValue;
    use shared::dto::campaign::{CampaignState, Tier};

    const A: Address = Address::repeat_byte(0x0a);
    const B: Address = Address::repeat_byte(0x0b);
    const C: Address = Address::repeat_byte(0x0c);

    fn details(name: &str) -> CampaignDetails {
        CampaignDetails {
            name: name.to_string(),
            description: format!("{} description", name),
            goal: U256::from(5_000_000_000_000_000_000u128),
            deadline: 1_760_000_000,
            owner: ALICE,
            balance: U256::from(7_000_000_000_000_000_000u128),
            state: CampaignState::Successful,
            tiers: vec![
                Tier {
                    name: "Bronze".to_string(),
                    amount: U256::from(10_000_000_000_000_000u128),
                    backers: 3,
                },
                Tier {
                    name: "Gold".to_string(),
                    amount: U256::from(1_000_000_000_000_000_000u128),
                    backers: 1,
                },
            ],
        }
    }

    async fn connected(mock: &MockProvider) -> ContractClient {
        let session = WalletSession::new(Some(mock.injected()), test_config());
        session.connect().await.unwrap();
        ContractClient::new(session)
    }

    fn record(address: Address, owner: Address, name: &str) -> CampaignRecord {
        CampaignRecord {
            campaignAddress: address,
            owner,
            name: name.to_string(),
            creationTime: U256::from(1_750_000_000u64),
        }
    }

    #[tokio::test]
    async fn test_reads_require_connection() {
        let mock = MockProvider::new();
        let client = ContractClient::new(WalletSession::new(Some(mock.injected()), test_config()));

        assert_eq!(client.list_all_campaigns().await.unwrap_err(), AppError::NotConnected);
        assert_eq!(client.fetch_details(A).await.unwrap_err(), AppError::NotConnected);
        assert_eq!(
            client.fetch_details_batch(&[A]).await.unwrap_err(),
            AppError::NotConnected
        );
        assert!(mock.methods().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_campaigns_in_registry_order() {
        let mock = MockProvider::new();
        let registry = test_config().registry_address;
        let records = vec![record(C, ALICE, "Third"), record(A, BOB, "First")];
        mock.respond::<ICrowdfundingManager::getAllCampaignsCall>(registry, records.abi_encode());
        let client = connected(&mock).await;

        let campaigns = client.list_all_campaigns().await.unwrap();

        let names: Vec<&str> = campaigns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "First"]);
        assert_eq!(campaigns[1].owner, BOB);
        assert_eq!(campaigns[0].creation_time, 1_750_000_000);
    }

    #[tokio::test]
    async fn test_list_user_campaigns_queries_owner() {
        let mock = MockProvider::new();
        let registry = test_config().registry_address;
        mock.respond::<ICrowdfundingManager::getUserCampaignsCall>(
            registry,
            vec![record(B, BOB, "Mine")].abi_encode(),
        );
        let client = connected(&mock).await;

        let campaigns = client.list_user_campaigns(BOB).await.unwrap();

        assert_eq!(campaigns.len(), 1);
        let call = &mock.params_of("eth_call")[0][0];
        let expected = ICrowdfundingManager::getUserCampaignsCall { user: BOB }.abi_encode();
        assert_eq!(call["data"], serde_json::json!(alloy_primitives::Bytes::from(expected)));
        assert_eq!(call["from"], serde_json::json!(ALICE));
    }

    #[tokio::test]
    async fn test_registry_failure_is_query_failed() {
        let mock = MockProvider::new();
        let registry = test_config().registry_address;
        mock.revert::<ICrowdfundingManager::getAllCampaignsCall>(
            registry,
            ProviderError::internal("header not found"),
        );
        let client = connected(&mock).await;

        let err = client.list_all_campaigns().await.unwrap_err();

        assert!(matches!(err, AppError::QueryFailed(_)));
        assert_eq!(err.user_message(), "Failed to fetch campaigns.");
    }

    #[tokio::test]
    async fn test_malformed_registry_data_is_query_failed() {
        let mock = MockProvider::new();
        let registry = test_config().registry_address;
        mock.respond::<ICrowdfundingManager::getAllCampaignsCall>(registry, vec![0u8; 7]);
        let client = connected(&mock).await;

        assert!(matches!(
            client.list_all_campaigns().await,
            Err(AppError::QueryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_is_paused() {
        let mock = MockProvider::new();
        let registry = test_config().registry_address;
        mock.respond::<ICrowdfundingManager::pausedCall>(registry, true.abi_encode());
        let client = connected(&mock).await;

        assert!(client.is_paused().await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_details() {
        let mock = MockProvider::new();
        let expected = details("Garden");
        mock.stub_details(A, &expected);
        let client = connected(&mock).await;

        let fetched = client.fetch_details(A).await.unwrap();

        assert_eq!(fetched, expected);
        assert_eq!(fetched.funding_ratio(), Some(1.4));
        assert_eq!(fetched.tier(1).unwrap().name, "Gold");
    }

    #[tokio::test]
    async fn test_fetch_details_is_all_or_nothing() {
        let mock = MockProvider::new();
        mock.stub_details(A, &details("Garden"));
        mock.revert::<ICrowdfunding::getTiersCall>(
            A,
            ProviderError::reverted(revert_payload("boom")),
        );
        let client = connected(&mock).await;

        assert_eq!(
            client.fetch_details(A).await.unwrap_err(),
            AppError::DetailsUnavailable(A)
        );
    }

    #[tokio::test]
    async fn test_unknown_status_is_unavailable() {
        let mock = MockProvider::new();
        mock.stub_details(A, &details("Garden"));
        mock.respond::<ICrowdfunding::getCampaignStatusCall>(A, U256::from(9u8).abi_encode());
        let client = connected(&mock).await;

        assert_eq!(
            client.fetch_details(A).await.unwrap_err(),
            AppError::DetailsUnavailable(A)
        );
    }

    #[tokio::test]
    async fn test_fetch_details_is_idempotent() {
        let mock = MockProvider::new();
        mock.stub_details(A, &details("Garden"));
        let client = connected(&mock).await;

        let first = client.fetch_details(A).await.unwrap();
        let second = client.fetch_details(A).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let mock = MockProvider::new();
        mock.stub_details(A, &details("Alpha"));
        mock.stub_details(B, &details("Bravo"));
        mock.stub_details(C, &details("Charlie"));
        mock.revert::<ICrowdfunding::goalCall>(
            B,
            ProviderError::reverted(revert_payload("Campaign is not active.")),
        );
        let client = connected(&mock).await;

        let batch = client.fetch_details_batch(&[A, B, C]).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[&A].name, "Alpha");
        assert_eq!(batch[&C].name, "Charlie");
        assert!(!batch.contains_key(&B));
    }

    #[tokio::test]
    async fn test_batch_deduplicates_addresses() {
        let mock = MockProvider::new();
        mock.stub_details(A, &details("Alpha"));
        let client = connected(&mock).await;
        mock.clear_log();

        let batch = client.fetch_details_batch(&[A, A, A]).await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(mock.count("eth_call"), 8);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mock = MockProvider::new();
        let client = connected(&mock).await;

        assert!(client.fetch_details_batch(&[]).await.unwrap().is_empty());
    }
}
