//! Client identifier derivation.
//!
//! The limiter operates purely on identifier strings; this module holds the
//! one derivation callers usually want — forwarded client address with a
//! loopback fallback — kept outside the core so the check itself never
//! touches ambient request state.

/// Placeholder identifier used when no client address is obtainable. All
/// such callers share one counter; the reduced precision is accepted over
/// failing the check.
pub const UNKNOWN_CLIENT: &str = "127.0.0.1";

/// Derive a caller identifier from a forwarded-address header value.
///
/// The header value is used verbatim as the counter key; no parsing or
/// validation. Distinct clients behind one proxy address therefore share a
/// counter — an accepted limitation, not a bug.
pub fn client_identifier(forwarded_for: Option<&str>) -> &str {
    forwarded_for.unwrap_or(UNKNOWN_CLIENT)
}
