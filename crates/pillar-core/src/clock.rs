//! Round arithmetic and wall-clock sources.
//!
//! [`RoundClock`] maps timestamps onto a grid of fixed-length rounds that
//! starts at the configured start time. Every settlement timestamp in the
//! ledger sits on this grid, so advancing by whole rounds never drifts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LedgerError};
use crate::traits::Clock;

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RoundClock {
    start: u64,
    round_duration: u64,
}

impl RoundClock {
    pub fn new(start: u64, round_duration: u64) -> Result<Self, ConfigError> {
        if round_duration == 0 {
            return Err(ConfigError::ZeroRoundDuration);
        }
        Ok(Self { start, round_duration })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn round_duration(&self) -> u64 {
        self.round_duration
    }

    pub fn has_started(&self, now: u64) -> bool {
        now >= self.start
    }

    /// Whole rounds between `last` and `now`. Zero when `now < last`.
    pub fn rounds_elapsed(&self, last: u64, now: u64) -> u64 {
        now.saturating_sub(last) / self.round_duration
    }

    /// Start of the round containing `t`, never earlier than the start time.
    pub fn round_start(&self, t: u64) -> u64 {
        if t <= self.start {
            return self.start;
        }
        let offset = t - self.start;
        self.start + offset - offset % self.round_duration
    }

    /// Zero-based index of the round containing `t`.
    pub fn round_index(&self, t: u64) -> u64 {
        t.saturating_sub(self.start) / self.round_duration
    }

    /// `last + rounds × round_duration`.
    pub fn advance(&self, last: u64, rounds: u64) -> Result<u64, LedgerError> {
        rounds
            .checked_mul(self.round_duration)
            .and_then(|span| last.checked_add(span))
            .ok_or(LedgerError::ArithmeticOverflow)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle
/// while the ledger owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self { now: Arc::new(AtomicU64::new(now)) }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Wall-clock time in Unix seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
