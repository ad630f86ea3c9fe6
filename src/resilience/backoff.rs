//! Exponential backoff with jitter between capture write attempts.
//!
//! Delays carry up to 10% random jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped_delay = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
