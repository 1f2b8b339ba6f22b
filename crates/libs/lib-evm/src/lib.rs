//! # EVM Wallet Core
//!
//! Wallet session, contract reads and transaction tracking for the crowdfunding dApp,
//! written against an injected EIP-1193 provider.
//!
//! ## Modules
//!
//! - [`provider`] - the EIP-1193 seam and its typed wrapper
//! - [`abi`] - contract bindings and validated decoding into `shared` DTOs
//! - [`session`] - connect/disconnect state machine and provider event handling
//! - [`client`] - read-only registry and campaign queries
//! - [`staleness`] - discarding results of superseded queries
//! - [`orchestrator`] - single in-flight transaction submission and confirmation
//! - [`units`] - ether/wei conversion for the UI boundary
//!
//! ## Wiring
//!
//! ```rust,ignore
//! use lib_core::config::chain_config;
//! use lib_evm::{ContractClient, TransactionOrchestrator, WalletSession};
//! use std::sync::Arc;
//!
//! let session = WalletSession::new(Some(provider), Arc::new(chain_config().clone()));
//! let client = ContractClient::new(session.clone());
//! let orchestrator = TransactionOrchestrator::new(session.clone());
//!
//! session.restore().await;
//! let campaigns = client.list_all_campaigns().await?;
//! ```

pub mod abi;
pub mod client;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod staleness;
pub mod units;

#[cfg(test)]
mod mock;

pub use client::ContractClient;
pub use orchestrator::{
    Confirmed, NewCampaign, PendingTransaction, TransactionKind, TransactionOrchestrator,
    TxStatus,
};
pub use provider::{Eip1193Provider, InjectedProvider, ProviderError, ProviderEvent};
pub use session::{SessionNotice, SessionStatus, SigningHandle, WalletSession, WalletSessionState};
pub use staleness::{QueryTicket, StaleGuard};
pub use units::{format_amount, parse_amount};
