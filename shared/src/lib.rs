//! # Shared Campaign Types
//!
//! This library defines the contract between the wallet core (`lib-evm`) and whatever
//! presentation layer renders it (the Leptos bindings in `wallet-web`, or a test harness).
//! All types serialize with `serde` so they can cross the wasm boundary as JSON.
//!
//! ## Structure
//!
//! - **[`dto`]**: Campaign snapshots decoded from the crowdfunding contracts
//!   - **[`dto::campaign`]**: `Campaign`, `CampaignDetails`, `Tier`, `CampaignState`
//! - **[`utils`]**: Shared utility functions
//!   - **[`utils::format_address`]**: Format `0x` addresses for display
//!   - **[`utils::truncate_address`]**: Truncate addresses with ellipsis
//!
//! ## Wire Format
//!
//! - Addresses serialize as EIP-55 checksummed `0x` strings
//! - Wei amounts serialize as `0x`-prefixed hex quantities
//! - Field names use **snake_case**
//!
//! ```rust
//! use shared::utils::truncate_address;
//!
//! let display = truncate_address("0x5Ff84Bf37f2057280C233F77b8b0aCe29D2dA876");
//! assert_eq!(display, "0x5Ff8...A876");
//! ```

pub mod dto;
pub mod utils;

// Wildcard re-exports: everything in this crate is public API
pub use dto::*;
pub use utils::*;
