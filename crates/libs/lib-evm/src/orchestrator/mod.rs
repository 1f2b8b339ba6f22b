//! # Transaction Orchestrator
//!
//! Drives one state-mutating contract call end-to-end:
//!
//! 1. take a fresh [`SigningHandle`] (fails with `NotConnected` before any provider call)
//! 2. claim the busy flag (fails with `AlreadyInFlight` while another call is tracked)
//! 3. submit through the wallet, which may wait on the user's confirmation
//! 4. poll the receipt until the transaction is mined
//! 5. on success run the caller's refresh hook, then return [`Confirmed`]
//!
//! Failures are classified once and never retried here. A reverted receipt is replayed
//! with `eth_call` at its block to recover the revert reason.

use crate::abi::{self, ICrowdfunding, ICrowdfundingManager, GENERIC_REVERT_REASON};
use crate::provider::{
    classify, InjectedProvider, ProviderError, TransactionReceipt, TransactionRequest,
};
use crate::session::{SigningHandle, WalletSession};
use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use lib_core::error::{AppError, Result};
use lib_utils::now_utc;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    CreateCampaign,
    AddTier,
    RemoveTier,
    Fund,
    Withdraw,
    TogglePause,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::CreateCampaign => "create campaign",
            TransactionKind::AddTier => "add tier",
            TransactionKind::RemoveTier => "remove tier",
            TransactionKind::Fund => "fund",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::TogglePause => "toggle pause",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Submitted,
    Confirmed,
    Failed,
}

/// The transaction this orchestrator is tracking, kept until the view acknowledges it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    pub kind: TransactionKind,
    pub target: Address,
    /// Unset until the wallet returns the hash
    pub hash: Option<B256>,
    pub submitted_at: DateTime<Utc>,
    pub status: TxStatus,
    pub error: Option<AppError>,
}

impl PendingTransaction {
    pub fn is_terminal(&self) -> bool {
        self.status != TxStatus::Submitted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub kind: TransactionKind,
    pub hash: B256,
    pub block_number: Option<u64>,
}

/// Arguments of `createCampaign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampaign {
    pub name: String,
    pub description: String,
    /// Funding goal in wei
    pub goal: U256,
    pub duration_days: u64,
}

/// Holds the busy flag; clearing happens exactly once, on drop.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(target_arch = "wasm32")]
async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

fn generic_revert() -> AppError {
    AppError::ContractReverted(GENERIC_REVERT_REASON.to_string())
}

#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    session: WalletSession,
    busy: Arc<AtomicBool>,
    pending: Arc<RwLock<Option<PendingTransaction>>>,
}

impl TransactionOrchestrator {
    pub fn new(session: WalletSession) -> Self {
        Self {
            session,
            busy: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> Option<PendingTransaction> {
        self.pending.read().clone()
    }

    /// Take the tracked transaction once it reached a terminal status.
    pub fn acknowledge(&self) -> Option<PendingTransaction> {
        let mut pending = self.pending.write();
        if pending.as_ref().is_some_and(PendingTransaction::is_terminal) {
            pending.take()
        } else {
            None
        }
    }

    /// Submit `call` and track it to a terminal outcome.
    ///
    /// `call` receives the signing handle and returns the transaction hash; `refresh`
    /// runs after confirmation and before this returns.
    pub async fn submit<C, CF, R, RF>(
        &self,
        kind: TransactionKind,
        target: Address,
        call: C,
        refresh: R,
    ) -> Result<Confirmed>
    where
        C: FnOnce(SigningHandle) -> CF,
        CF: Future<Output = std::result::Result<B256, ProviderError>>,
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let handle = self.session.signing_handle()?;
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!(%kind, "Rejecting submit while busy");
            return Err(AppError::AlreadyInFlight);
        };

        let provider = handle.provider().clone();
        *self.pending.write() = Some(PendingTransaction {
            kind,
            target,
            hash: None,
            submitted_at: now_utc(),
            status: TxStatus::Submitted,
            error: None,
        });
        info!(%kind, %target, "Submitting transaction");

        let hash = match call(handle).await {
            Ok(hash) => hash,
            Err(err) => {
                let error = classify(&err);
                warn!(%kind, error = %err, "Transaction was not submitted");
                return Err(self.fail(error));
            }
        };
        if let Some(pending) = self.pending.write().as_mut() {
            pending.hash = Some(hash);
        }
        debug!(%kind, %hash, "Awaiting confirmation");

        let receipt = match self.await_receipt(&provider, hash).await {
            Ok(receipt) => receipt,
            Err(error) => return Err(self.fail(error)),
        };
        if !receipt.succeeded() {
            let error = self.replay_revert(&provider, hash, &receipt).await;
            warn!(%kind, %hash, error = %error, "Transaction reverted");
            return Err(self.fail(error));
        }

        if let Some(pending) = self.pending.write().as_mut() {
            pending.status = TxStatus::Confirmed;
        }
        info!(%kind, %hash, block = ?receipt.block_number(), "Transaction confirmed");

        refresh().await;

        Ok(Confirmed {
            kind,
            hash,
            block_number: receipt.block_number(),
        })
    }

    fn fail(&self, error: AppError) -> AppError {
        if let Some(pending) = self.pending.write().as_mut() {
            pending.status = TxStatus::Failed;
            pending.error = Some(error.clone());
        }
        error
    }

    async fn await_receipt(
        &self,
        provider: &InjectedProvider,
        hash: B256,
    ) -> Result<TransactionReceipt> {
        let interval = self.session.config().receipt_poll_interval;
        loop {
            match provider.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => sleep(interval).await,
                Err(err) => {
                    warn!(%hash, error = %err, "Receipt lookup failed");
                    return Err(classify(&err));
                }
            }
        }
    }

    /// Re-run a reverted transaction as a call at its block to read the reason.
    async fn replay_revert(
        &self,
        provider: &InjectedProvider,
        hash: B256,
        receipt: &TransactionReceipt,
    ) -> AppError {
        let tx = match provider.transaction_by_hash(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return generic_revert(),
            Err(err) => {
                debug!(%hash, error = %err, "Could not load reverted transaction");
                return generic_revert();
            }
        };

        let request = TransactionRequest {
            from: Some(tx.from),
            to: tx.to,
            value: Some(tx.value),
            data: Some(tx.input),
        };
        let block = receipt
            .block_number()
            .or_else(|| tx.block_number.map(|n| n.to::<u64>()));

        match provider.call_at(&request, block).await {
            Err(err) => match classify(&err) {
                reverted @ AppError::ContractReverted(_) => reverted,
                _ => generic_revert(),
            },
            Ok(_) => generic_revert(),
        }
    }

    async fn send<R, RF>(
        &self,
        kind: TransactionKind,
        to: Address,
        data: Bytes,
        value: Option<U256>,
        refresh: R,
    ) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        self.submit(
            kind,
            to,
            move |handle: SigningHandle| async move {
                let request = TransactionRequest {
                    from: Some(handle.address()),
                    to: Some(to),
                    value,
                    data: Some(data),
                };
                handle.provider().send_transaction(&request).await
            },
            refresh,
        )
        .await
    }

    pub async fn create_campaign<R, RF>(&self, campaign: NewCampaign, refresh: R) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let registry = self.session.config().registry_address;
        let data = abi::encode(&ICrowdfundingManager::createCampaignCall {
            name: campaign.name,
            description: campaign.description,
            goal: campaign.goal,
            durationInDays: U256::from(campaign.duration_days),
        });
        self.send(TransactionKind::CreateCampaign, registry, data, None, refresh)
            .await
    }

    pub async fn add_tier<R, RF>(
        &self,
        campaign: Address,
        name: String,
        amount: U256,
        refresh: R,
    ) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let data = abi::encode(&ICrowdfunding::addTierCall { name, amount });
        self.send(TransactionKind::AddTier, campaign, data, None, refresh)
            .await
    }

    pub async fn remove_tier<R, RF>(&self, campaign: Address, index: u64, refresh: R) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let data = abi::encode(&ICrowdfunding::removeTierCall {
            index: U256::from(index),
        });
        self.send(TransactionKind::RemoveTier, campaign, data, None, refresh)
            .await
    }

    /// Back tier `tier_index` with `value` wei.
    pub async fn fund<R, RF>(
        &self,
        campaign: Address,
        tier_index: u64,
        value: U256,
        refresh: R,
    ) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let data = abi::encode(&ICrowdfunding::fundCall {
            tierIndex: U256::from(tier_index),
        });
        self.send(TransactionKind::Fund, campaign, data, Some(value), refresh)
            .await
    }

    pub async fn withdraw<R, RF>(&self, campaign: Address, refresh: R) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let data = abi::encode(&ICrowdfunding::withdrawCall {});
        self.send(TransactionKind::Withdraw, campaign, data, None, refresh)
            .await
    }

    pub async fn toggle_pause<R, RF>(&self, refresh: R) -> Result<Confirmed>
    where
        R: FnOnce() -> RF,
        RF: Future<Output = ()>,
    {
        let registry = self.session.config().registry_address;
        let data = abi::encode(&ICrowdfundingManager::togglePauseCall {});
        self.send(TransactionKind::TogglePause, registry, data, None, refresh)
            .await
    }
}
