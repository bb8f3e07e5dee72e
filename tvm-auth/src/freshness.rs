//! Timestamp Freshness
//!
//! Checks that a client-supplied timestamp is within a symmetric window of
//! server time. Unparseable timestamps are treated exactly like stale ones.

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Create a clock that always reports `at`
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse an ISO-8601 request timestamp.
///
/// Accepts RFC 3339 and the compact `+0000` offset form some device SDKs emit.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .or_else(|_| DateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `|now - timestamp| <= window`, inclusive at both ends
pub fn is_fresh(timestamp: &str, now: DateTime<Utc>, window: Duration) -> bool {
    let Some(ts) = parse_timestamp(timestamp) else {
        return false;
    };

    let skew = if now >= ts { now - ts } else { ts - now };
    skew <= window
}

/// Clock skew validator bound to a configured window
#[derive(Debug, Clone, Copy)]
pub struct ClockSkewValidator {
    window: Duration,
}

impl ClockSkewValidator {
    /// Create a validator with the given window
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Configured window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check `timestamp` against `now`
    pub fn is_fresh(&self, timestamp: &str, now: DateTime<Utc>) -> bool {
        is_fresh(timestamp, now, self.window)
    }
}

impl Default for ClockSkewValidator {
    fn default() -> Self {
        Self::new(Duration::seconds(crate::DEFAULT_FRESHNESS_WINDOW_SECS as i64))
    }
}
