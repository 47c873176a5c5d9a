//! System-wide constants for the OtcBook escrow core.

/// Denominator for integer percentages: 2% is stored as `200`.
pub const PERCENT_BOOST: i64 = 10_000;

/// Maximum decimal precision an asset symbol may declare.
pub const MAX_PRECISION: u8 = 18;

/// Maximum length of a merchant display name.
pub const MAX_NAME_LEN: usize = 32;

/// Maximum length of a merchant contact email.
pub const MAX_EMAIL_LEN: usize = 64;

/// Maximum length of a merchant detail blob.
pub const MAX_DETAIL_LEN: usize = 255;

/// Maximum length of a free-form memo field.
pub const MAX_MEMO_LEN: usize = 255;

/// Maximum length of a deal closing message.
pub const MAX_CLOSE_MSG_LEN: usize = 255;

/// Blacklist duration applied when a maker flags a taker on cancel (3 days).
pub const DEFAULT_BLACKLIST_SECS: i64 = 3 * 86_400;

/// Upper bound an admin may blacklist an account for (30 days).
pub const MAX_BLACKLIST_SECS: i64 = 30 * 86_400;

/// Withdraw hold-down after the last balance change, per merchant tier.
pub const WITHDRAW_HOLD_BASIC_SECS: i64 = 72 * 3_600;
pub const WITHDRAW_HOLD_GOLD_SECS: i64 = 24 * 3_600;
pub const WITHDRAW_HOLD_DIAMOND_SECS: i64 = 12 * 3_600;
pub const WITHDRAW_HOLD_BLUESHIELD_SECS: i64 = 3_600;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OtcBook";
