//! # Injected Provider
//!
//! The request/response surface of an EIP-1193 wallet provider (`window.ethereum` in
//! browsers) plus its account/chain notifications.
//!
//! [`Eip1193Provider`] is the seam: `wallet-web` implements it over `wasm-bindgen`,
//! tests implement it with a scripted mock. Everything above it talks to
//! [`InjectedProvider`], which decodes each JSON-RPC response into an explicit type so
//! untyped values never flow further into the core.
//!
//! ## Example
//!
//! ```rust,ignore
//! let provider = InjectedProvider::new(browser_provider);
//! let accounts = provider.request_accounts().await?;
//! let chain_id = provider.chain_id().await?;
//! ```

use crate::abi::{decode_revert, GENERIC_REVERT_REASON};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use lib_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Well-known provider error codes (EIP-1193, EIP-1474, EIP-3085).
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const EXECUTION_REVERTED: i64 = 3;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Error object returned by a provider request.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Transport failure or a response that did not have the expected shape.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }

    pub fn user_rejected() -> Self {
        Self::new(codes::USER_REJECTED, "User rejected the request.")
    }

    /// Revert carrying ABI-encoded error data, as nodes report it for `eth_call`/`eth_estimateGas`.
    pub fn reverted(data: impl Into<Bytes>) -> Self {
        Self {
            code: codes::EXECUTION_REVERTED,
            message: "execution reverted".to_string(),
            data: Some(json!(data.into())),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == codes::USER_REJECTED || self.nested_code() == Some(codes::USER_REJECTED)
    }

    /// The wallet does not know the requested chain and it must be added first.
    ///
    /// Some mobile wallets wrap the code in `data.originalError`.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == codes::UNRECOGNIZED_CHAIN
            || self.nested_code() == Some(codes::UNRECOGNIZED_CHAIN)
    }

    pub fn is_revert(&self) -> bool {
        self.code == codes::EXECUTION_REVERTED
            || self.message.contains("execution reverted")
            || self.revert_data().is_some()
    }

    /// ABI-encoded revert payload, wherever the provider put it.
    pub fn revert_data(&self) -> Option<Bytes> {
        fn hex_bytes(value: &Value) -> Option<Bytes> {
            let raw = value.as_str()?;
            if !raw.starts_with("0x") || raw.len() <= 2 {
                return None;
            }
            raw.parse().ok()
        }

        let data = self.data.as_ref()?;
        hex_bytes(data)
            .or_else(|| data.get("data").and_then(hex_bytes))
            .or_else(|| {
                data.get("originalError")
                    .and_then(|e| e.get("data"))
                    .and_then(hex_bytes)
            })
    }

    /// Human-readable revert reason: decoded payload first, then the provider message.
    pub fn revert_reason(&self) -> Option<String> {
        if let Some(reason) = self.revert_data().and_then(|d| decode_revert(&d)) {
            return Some(reason);
        }
        self.message
            .split_once("execution reverted:")
            .map(|(_, reason)| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
    }

    fn nested_code(&self) -> Option<i64> {
        self.data
            .as_ref()?
            .get("originalError")?
            .get("code")?
            .as_i64()
    }
}

/// Map a provider failure onto the application taxonomy.
///
/// - `4001` → [`AppError::UserRejected`]
/// - revert → [`AppError::ContractReverted`] with the decoded reason, or a generic message
/// - anything else → [`AppError::Rpc`]
pub fn classify(err: &ProviderError) -> AppError {
    if err.is_user_rejected() {
        return AppError::UserRejected;
    }
    if err.is_revert() {
        let reason = err
            .revert_reason()
            .unwrap_or_else(|| GENERIC_REVERT_REASON.to_string());
        return AppError::ContractReverted(reason);
    }
    AppError::Rpc(err.to_string())
}

/// Notification emitted by the provider independently of any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnect,
}

/// EIP-1193 request surface.
///
/// Futures are not `Send`: browser providers wrap JS values and everything runs on a
/// single cooperative scheduler.
#[async_trait(?Send)]
pub trait Eip1193Provider {
    /// Issue a JSON-RPC request. `params` is the positional parameter array.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Receive account/chain notifications.
    ///
    /// Every call hands out the same queue: each event is delivered to exactly one
    /// receiver, so a single consumer ([`WalletSession::listen`]) should drive it and fan
    /// out through its own notices.
    ///
    /// [`WalletSession::listen`]: crate::session::WalletSession::listen
    fn subscribe(&self) -> async_channel::Receiver<ProviderEvent>;
}

/// Transaction or call object for `eth_sendTransaction` / `eth_call`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

/// The receipt fields the orchestrator relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `0x1` success, `0x0` failure; absent before Byzantium
    #[serde(default)]
    pub status: Option<U64>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| status == U64::from(1))
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number.map(|n| n.to::<u64>())
    }
}

/// A mined transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: B256,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub block_number: Option<U64>,
}

/// Parse a chain id given as `0x` hex, decimal string or JSON number.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

fn block_tag(block: Option<u64>) -> Value {
    match block {
        Some(number) => json!(format!("0x{:x}", number)),
        None => json!("latest"),
    }
}

/// Typed, cheap-to-clone wrapper around an [`Eip1193Provider`].
#[derive(Clone)]
pub struct InjectedProvider {
    inner: Arc<dyn Eip1193Provider>,
}

impl fmt::Debug for InjectedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedProvider").finish_non_exhaustive()
    }
}

impl InjectedProvider {
    pub fn new<P: Eip1193Provider + 'static>(provider: P) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        debug!(method, "provider request");
        self.inner.request(method, params).await
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ProviderError::internal(format!("malformed {} response: {}", method, e)))
    }

    pub fn subscribe(&self) -> async_channel::Receiver<ProviderEvent> {
        self.inner.subscribe()
    }

    /// `eth_requestAccounts`: may open the wallet's consent dialog.
    pub async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request_as("eth_requestAccounts", json!([])).await
    }

    /// `eth_accounts`: already-authorized accounts, never prompts.
    pub async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request_as("eth_accounts", json!([])).await
    }

    pub async fn chain_id(&self) -> Result<u64, ProviderError> {
        let raw = self.request("eth_chainId", json!([])).await?;
        parse_chain_id(&raw)
            .ok_or_else(|| ProviderError::internal(format!("malformed eth_chainId response: {}", raw)))
    }

    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let params = json!([{ "chainId": format!("0x{:x}", chain_id) }]);
        self.request("wallet_switchEthereumChain", params).await?;
        Ok(())
    }

    /// `wallet_addEthereumChain` with a prepared parameter object.
    pub async fn add_chain(&self, params: Value) -> Result<(), ProviderError> {
        self.request("wallet_addEthereumChain", json!([params])).await?;
        Ok(())
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, request: &TransactionRequest) -> Result<Bytes, ProviderError> {
        self.call_at(request, None).await
    }

    /// `eth_call` against a specific block, or latest for `None`.
    pub async fn call_at(
        &self,
        request: &TransactionRequest,
        block: Option<u64>,
    ) -> Result<Bytes, ProviderError> {
        self.request_as("eth_call", json!([request, block_tag(block)]))
            .await
    }

    /// `eth_sendTransaction`: may wait on the user's confirmation in their wallet.
    pub async fn send_transaction(&self, request: &TransactionRequest) -> Result<B256, ProviderError> {
        self.request_as("eth_sendTransaction", json!([request])).await
    }

    /// `None` until the transaction is mined.
    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        self.request_as("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    pub async fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionRecord>, ProviderError> {
        self.request_as("eth_getTransactionByHash", json!([hash]))
            .await
    }
}
