//! # Chain Configuration
//!
//! Static description of the target network: chain identity, the metadata a wallet
//! needs to add the chain, and the crowdfunding registry address. These are load-time
//! constants; nothing in the wallet core mutates them.
//!
//! ## Global Config Access
//!
//! Use [`chain_config()`] to access the process-wide instance. Native hosts call
//! [`init_config()`] once at startup to load overrides from the environment. In the
//! browser nothing is set, so it installs [`ChainConfig::default()`] (Sepolia).
//!
//! ```rust,no_run
//! use lib_core::config::{chain_config, init_config};
//!
//! init_config().expect("valid chain configuration");
//! let config = chain_config();
//! assert_eq!(config.chain_id_hex(), "0xaa36a7");
//! ```

use crate::error::{AppError, Result};
use alloy_primitives::{address, Address};
use lib_utils::envs::get_env_or;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

/// Sepolia testnet chain id.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Deployed crowdfunding registry on Sepolia.
pub const SEPOLIA_REGISTRY_ADDRESS: Address = address!("5Ff84Bf37f2057280C233F77b8b0aCe29D2dA876");

const DEFAULT_RECEIPT_POLL_MS: u64 = 2_000;

/// Native currency metadata used by `wallet_addEthereumChain`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Target network and contract configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// Numeric chain id the session must be on to be `Connected`
    pub chain_id: u64,

    /// Human-readable chain name shown by the wallet when adding the chain
    pub chain_name: String,

    pub native_currency: NativeCurrency,

    /// RPC endpoints handed to the wallet when adding the chain
    pub rpc_urls: Vec<String>,

    pub block_explorer_urls: Vec<String>,

    /// Crowdfunding registry (manager) contract
    pub registry_address: Address,

    /// Delay between `eth_getTransactionReceipt` polls while awaiting confirmation
    pub receipt_poll_interval: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            chain_name: "Sepolia Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://sepolia.infura.io/v3/".to_string()],
            block_explorer_urls: vec!["https://sepolia.etherscan.io".to_string()],
            registry_address: SEPOLIA_REGISTRY_ADDRESS,
            receipt_poll_interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
        }
    }
}

impl ChainConfig {
    /// Load configuration from environment variables (and a `.env` file if present).
    ///
    /// Unset variables keep their Sepolia defaults:
    /// `CHAIN_ID`, `CHAIN_NAME`, `CHAIN_RPC_URL`, `CHAIN_EXPLORER_URL`,
    /// `REGISTRY_ADDRESS`, `RECEIPT_POLL_INTERVAL_MS`.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let chain_id = get_env_or("CHAIN_ID", defaults.chain_id)
            .map_err(|e| AppError::Config(format!("CHAIN_ID must be a valid number: {}", e)))?;

        let chain_name = get_env_or("CHAIN_NAME", defaults.chain_name)
            .map_err(|e| AppError::Config(format!("CHAIN_NAME is invalid: {}", e)))?;

        let rpc_url = get_env_or("CHAIN_RPC_URL", String::new())
            .map_err(|e| AppError::Config(format!("CHAIN_RPC_URL is invalid: {}", e)))?;
        let rpc_urls = if rpc_url.is_empty() { defaults.rpc_urls } else { vec![rpc_url] };

        let explorer_url = get_env_or("CHAIN_EXPLORER_URL", String::new())
            .map_err(|e| AppError::Config(format!("CHAIN_EXPLORER_URL is invalid: {}", e)))?;
        let block_explorer_urls = if explorer_url.is_empty() {
            defaults.block_explorer_urls
        } else {
            vec![explorer_url]
        };

        let registry_address = get_env_or("REGISTRY_ADDRESS", defaults.registry_address)
            .map_err(|e| AppError::Config(format!("REGISTRY_ADDRESS must be a 0x-prefixed address: {}", e)))?;

        let poll_ms = get_env_or("RECEIPT_POLL_INTERVAL_MS", DEFAULT_RECEIPT_POLL_MS)
            .map_err(|e| AppError::Config(format!("RECEIPT_POLL_INTERVAL_MS must be a valid number: {}", e)))?;

        Ok(Self {
            chain_id,
            chain_name,
            native_currency: defaults.native_currency,
            rpc_urls,
            block_explorer_urls,
            registry_address,
            receipt_poll_interval: Duration::from_millis(poll_ms),
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(AppError::Config("CHAIN_ID must be non-zero".to_string()));
        }

        if self.registry_address == Address::ZERO {
            return Err(AppError::Config(
                "REGISTRY_ADDRESS must not be the zero address".to_string(),
            ));
        }

        if self.rpc_urls.is_empty() {
            return Err(AppError::Config(
                "At least one RPC URL is required".to_string(),
            ));
        }

        for url in self.rpc_urls.iter().chain(self.block_explorer_urls.iter()) {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(AppError::Config(format!(
                    "URL must use http(s): {}",
                    url
                )));
            }
        }

        if self.receipt_poll_interval.is_zero() {
            return Err(AppError::Config(
                "RECEIPT_POLL_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Chain id as the `0x`-prefixed lowercase hex string wallets expect.
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Parameter object for `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.block_explorer_urls,
        })
    }
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<ChainConfig> = OnceLock::new();

/// Load, validate and install the global configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Environment variables are malformed
/// - Configuration validation fails
/// - Config has already been initialized
pub fn init_config() -> Result<()> {
    let config = ChainConfig::from_env()?;
    config.validate()?;

    CONFIG
        .set(config)
        .map_err(|_| AppError::Config("Config has already been initialized".to_string()))
}

/// Get the global configuration, falling back to the Sepolia defaults when
/// [`init_config()`] was never called.
pub fn chain_config() -> &'static ChainConfig {
    CONFIG.get_or_init(ChainConfig::default)
}
