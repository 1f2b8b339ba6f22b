//! # Data Transfer Objects (DTOs)
//!
//! Immutable snapshots of on-chain crowdfunding records. They are re-fetched, never
//! mutated in place.
//!
//! - [`campaign`] - Registry entries, campaign details and funding tiers
//!
//! ## Example JSON
//!
//! ```text
//! {
//!   "address": "0x5Ff84Bf37f2057280C233F77b8b0aCe29D2dA876",
//!   "owner": "0x1000000000000000000000000000000000000001",
//!   "name": "Community Garden",
//!   "creation_time": 1718000000
//! }
//! ```

pub mod campaign;

pub use campaign::*;
