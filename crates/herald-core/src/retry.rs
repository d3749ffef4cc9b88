//! Retry policy value object.
//!
//! Exponential backoff with a cap and a bounded attempt count. Jitter
//! (`jitter_pct`) is declared here but MUST be applied by the runtime
//! caller; the pure policy returns pre-jitter delays.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first call (default 4).
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default 500).
    pub base_delay_ms: u64,
    /// Backoff multiplier per retry (default 2.0).
    pub multiplier: f64,
    /// Maximum delay in milliseconds (default 15000).
    pub max_delay_ms: u64,
    /// Jitter fraction applied by the runtime layer (default 0.20 = ±20%).
    pub jitter_pct: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 15_000,
            jitter_pct: 0.20,
        }
    }
}

impl RetryPolicy {
    /// Pre-jitter delay before retry number `retry` (0-based: the delay
    /// after the first failed attempt is `delay_for_retry(0)`).
    pub fn delay_for_retry(&self, retry: u32) -> u64 {
        let raw = (self.base_delay_ms as f64) * self.multiplier.powi(retry as i32);
        if !raw.is_finite() || raw >= self.max_delay_ms as f64 {
            self.max_delay_ms
        } else {
            raw as u64
        }
    }

    /// Whether another attempt is allowed after `attempts_made` calls.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

// ─── Tests ───────────────────────────────────────────────────────
