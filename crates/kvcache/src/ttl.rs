//! TTL sentinel values
//!
//! `TTL` replies are signed: negative values are sentinels, not errors.
//! They are passed through to the caller untouched.

use chrono::Duration;

/// Seconds reported when the key does not exist
pub const KEY_MISSING_SECS: i64 = -2;

/// Seconds reported when the key exists without an expiry
pub const NO_EXPIRY_SECS: i64 = -1;

/// TTL reported for an absent key (-2s)
pub fn key_missing() -> Duration {
    Duration::seconds(KEY_MISSING_SECS)
}

/// TTL reported for a key with no expiry (-1s)
pub fn no_expiry() -> Duration {
    Duration::seconds(NO_EXPIRY_SECS)
}

/// True for the absent-key sentinel
pub fn is_key_missing(ttl: &Duration) -> bool {
    *ttl == key_missing()
}

/// True for the no-expiry sentinel
pub fn is_persistent(ttl: &Duration) -> bool {
    *ttl == no_expiry()
}

/// Convert a backend TTL reply in seconds into a signed duration
pub fn from_secs(secs: i64) -> Duration {
    Duration::seconds(secs)
}
