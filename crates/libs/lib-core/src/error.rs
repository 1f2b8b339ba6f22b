//! # Centralized Error Handling
//!
//! This module defines the error type [`AppError`] shared by the wallet session, the
//! contract query façade and the transaction orchestrator. It follows the `thiserror`
//! pattern for ergonomic error handling.
//!
//! ## Error Categories
//!
//! 1. **Session** - wallet availability and network identity
//!    - [`ProviderNotFound`](AppError::ProviderNotFound), [`NotConnected`](AppError::NotConnected)
//!    - [`ChainMismatch`](AppError::ChainMismatch), [`ChainSwitchFailed`](AppError::ChainSwitchFailed)
//!
//! 2. **Transactions** - per-call terminal outcomes, never retried internally
//!    - [`UserRejected`](AppError::UserRejected), [`ContractReverted`](AppError::ContractReverted)
//!    - [`Rpc`](AppError::Rpc), [`AlreadyInFlight`](AppError::AlreadyInFlight)
//!
//! 3. **Queries** - read failures the caller renders as "nothing to show"
//!    - [`QueryFailed`](AppError::QueryFailed), [`DetailsUnavailable`](AppError::DetailsUnavailable)
//!
//! 4. **Boundary** - [`InvalidInput`](AppError::InvalidInput), [`Config`](AppError::Config)
//!
//! ## User-facing messages
//!
//! `Display` carries full detail for logs. Views should render
//! [`AppError::user_message`], which keeps revert reasons and hides raw transport text:
//!
//! ```rust
//! use lib_core::error::AppError;
//!
//! let err = AppError::Rpc("connection reset by peer".to_string());
//! assert_eq!(err.user_message(), "Network request failed. Please try again.");
//!
//! let err = AppError::ContractReverted("Campaign is not active.".to_string());
//! assert_eq!(err.user_message(), "Campaign is not active.");
//! ```

use alloy_primitives::Address;
use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error type covering every failure the wallet core can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// No injected wallet provider is present in the host.
    #[error("No wallet provider found")]
    ProviderNotFound,

    /// The operation needs a connected session.
    #[error("Wallet is not connected")]
    NotConnected,

    /// The wallet is on another network and was not switched.
    #[error("Wrong network: expected chain {expected}, wallet is on chain {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// The wallet failed a switch/add-chain request for a reason other than the user declining.
    #[error("Network switch failed: {0}")]
    ChainSwitchFailed(String),

    /// The user declined the request in their wallet.
    #[error("Request rejected in wallet")]
    UserRejected,

    /// The contract reverted; carries the decoded revert reason or a generic message.
    #[error("Contract reverted: {0}")]
    ContractReverted(String),

    /// Transport, timeout or malformed-response failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A registry read failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A campaign detail bundle could not be read in full.
    #[error("Campaign details unavailable for {0}")]
    DetailsUnavailable(Address),

    /// A transaction is already being tracked by this orchestrator.
    #[error("A transaction is already in flight")]
    AlreadyInFlight,

    /// Malformed user input at the UI boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable variant name, suitable for telemetry and view-level matching.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ProviderNotFound => "ProviderNotFound",
            AppError::NotConnected => "NotConnected",
            AppError::ChainMismatch { .. } => "ChainMismatch",
            AppError::ChainSwitchFailed(_) => "ChainSwitchFailed",
            AppError::UserRejected => "UserRejected",
            AppError::ContractReverted(_) => "ContractReverted",
            AppError::Rpc(_) => "RpcError",
            AppError::QueryFailed(_) => "QueryFailed",
            AppError::DetailsUnavailable(_) => "DetailsUnavailable",
            AppError::AlreadyInFlight => "AlreadyInFlight",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Config(_) => "Config",
        }
    }

    /// Get a user-friendly error message.
    ///
    /// Raw transport errors are replaced with a generic message; they belong in logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ProviderNotFound => "Please install a browser wallet such as MetaMask.".to_string(),
            AppError::NotConnected => "Connect your wallet first.".to_string(),
            AppError::ChainMismatch { .. } => {
                "Please switch your wallet to the supported network.".to_string()
            }
            AppError::ChainSwitchFailed(_) => "Could not switch your wallet's network.".to_string(),
            AppError::UserRejected => "Request was rejected in your wallet.".to_string(),
            AppError::ContractReverted(reason) => reason.clone(),
            AppError::Rpc(_) => "Network request failed. Please try again.".to_string(),
            AppError::QueryFailed(_) => "Failed to fetch campaigns.".to_string(),
            AppError::DetailsUnavailable(_) => "Failed to fetch campaign details.".to_string(),
            AppError::AlreadyInFlight => {
                "Please wait for the current transaction to finish.".to_string()
            }
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Config(_) => "The application is misconfigured.".to_string(),
        }
    }

    /// Whether the user declined the request (as opposed to it failing).
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, AppError::UserRejected)
    }
}
