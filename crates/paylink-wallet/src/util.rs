//! Util

use web_time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch
pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
