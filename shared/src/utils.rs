//! # Shared Utility Functions
//!
//! Common utility functions used by the wallet core and the wallet-web bindings.
//!
//! ## Address Formatting
//!
//! Functions for formatting `0x` wallet and contract addresses for display:
//! - [`format_address`] - Format address with ellipsis (first N and last M characters)
//! - [`truncate_address`] - Alias for `format_address` with default parameters
//!
//! ## Usage
//!
//! ```rust
//! use shared::utils::format_address;
//!
//! let address = "0x5Ff84Bf37f2057280C233F77b8b0aCe29D2dA876";
//! let formatted = format_address(address, 4, 4);
//! assert_eq!(formatted, "0x5F...A876");
//! ```

/// Format a wallet address by showing the first `prefix_len` and last `suffix_len` characters.
///
/// If the address is shorter than `prefix_len + suffix_len`, it is returned as-is.
///
/// # Arguments
///
/// * `address` - The wallet address to format
/// * `prefix_len` - Number of characters to show at the start (default: 4)
/// * `suffix_len` - Number of characters to show at the end (default: 4)
///
/// # Examples
///
/// ```rust
/// use shared::utils::format_address;
///
/// let addr = "0x5Ff84Bf37f2057280C233F77b8b0aCe29D2dA876";
/// assert_eq!(format_address(addr, 6, 4), "0x5Ff8...A876");
/// assert_eq!(format_address(addr, 4, 4), "0x5F...A876");
/// assert_eq!(format_address("short", 4, 4), "short");
/// ```
pub fn format_address(address: &str, prefix_len: usize, suffix_len: usize) -> String {
    let address_len = address.len();
    
    // Return early if address is too short to truncate meaningfully
    // Also guard against individual lengths exceeding address length to prevent panics
    if address_len <= prefix_len + suffix_len
        || prefix_len >= address_len
        || suffix_len >= address_len
    {
        return address.to_string();
    }
    
    // Safe to slice: we've verified prefix_len and suffix_len are within bounds
    // Hex addresses are ASCII-only, so byte indexing is safe
    let prefix = &address[..prefix_len];
    let suffix = &address[address_len - suffix_len..];
    
    format!("{}...{}", prefix, suffix)
}

/// Format an address with the `0x` prefix plus 4 characters, and a 4-character suffix.
///
/// # Examples
///
/// ```rust
/// use shared::utils::truncate_address;
///
/// let addr = "0x5Ff84Bf37f2057280C233F77b8b0aCe29D2dA876";
/// assert_eq!(truncate_address(addr), "0x5Ff8...A876");
/// ```
pub fn truncate_address(address: &str) -> String {
    let prefix_len = if address.starts_with("0x") { 6 } else { 4 };
    format_address(address, prefix_len, 4)
}

/// Checksummed, truncated rendering of a typed address.
pub fn short_address(address: &alloy_primitives::Address) -> String {
    truncate_address(&address.to_checksum(None))
}
