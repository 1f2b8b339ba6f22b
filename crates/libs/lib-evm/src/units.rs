//! Ether/wei conversion at the input and display boundary.

use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::U256;
use lib_core::error::{AppError, Result};

/// Parse a decimal ether amount (`"0.5"`, `"1"`) into wei.
pub fn parse_amount(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Amount is required".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(AppError::InvalidInput("Amount must not be negative".to_string()));
    }
    parse_ether(trimmed)
        .map_err(|e| AppError::InvalidInput(format!("Invalid amount '{}': {}", trimmed, e)))
}

/// Format wei as ether without trailing zeros, e.g. `1.5` or `0.0`.
pub fn format_amount(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => format!("{}.0", formatted),
    }
}
