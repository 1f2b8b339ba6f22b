//! # Core Library
//!
//! Chain configuration and the error taxonomy shared by the wallet core.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{chain_config, init_config, ChainConfig, NativeCurrency};
pub use error::{AppError, Result};
