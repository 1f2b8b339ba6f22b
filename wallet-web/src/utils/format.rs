//! # Formatting Utilities for Wallet Web
//!
//! Number and value formatting for campaign views.
//! For address formatting, use [`shared::utils::short_address`] or [`shared::utils::truncate_address`].
//!
//! ## Functions
//!
//! - [`format_number`] - Format numbers with comma separators
//! - [`format_eth`] - Convert wei to a human ETH amount
//! - [`format_progress`] - Funding progress as a percentage
//! - [`format_deadline`] - Campaign deadline as a calendar date
//! - [`campaign_status_label`] - Lifecycle label combining on-chain state and deadline

use alloy_primitives::U256;
use chrono::DateTime;
use shared::dto::campaign::{CampaignDetails, CampaignState};

/// Format a number with commas (e.g., 1234567.89 -> "1,234,567.89")
///
/// # Examples
///
/// ```rust
/// use wallet_web::utils::format::format_number;
///
/// assert_eq!(format_number(1234567.89, 2), "1,234,567.89");
/// assert_eq!(format_number(100.0, 0), "100");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.prec$}", value, prec = decimals);
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    let mut result = String::new();
    for (i, ch) in integer_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    let integer_with_commas: String = result.chars().rev().collect();

    if decimal_part.is_empty() {
        integer_with_commas
    } else {
        format!("{}.{}", integer_with_commas, decimal_part)
    }
}

/// Format wei as ETH (e.g. `1500000000000000000` -> "1.5 ETH")
pub fn format_eth(wei: U256) -> String {
    format!("{} ETH", lib_evm::format_amount(wei))
}

/// Funding progress, not capped at 100%. Campaigns with no goal show "n/a".
pub fn format_progress(details: &CampaignDetails) -> String {
    match details.funding_ratio() {
        Some(ratio) => format!("{}%", format_number(ratio * 100.0, 0)),
        None => "n/a".to_string(),
    }
}

/// Deadline as `YYYY-MM-DD` (UTC)
pub fn format_deadline(deadline: u64) -> String {
    i64::try_from(deadline)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// "Active" campaigns past their deadline are shown as "Ended" until the contract
/// settles them.
pub fn campaign_status_label(details: &CampaignDetails, now: u64) -> &'static str {
    match details.state {
        CampaignState::Active if !details.is_open(now) => "Ended",
        state => state.label(),
    }
}
