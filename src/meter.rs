//! Shared byte meter for the session-wide inbound data cap.
//!
//! The receive demuxer charges every raw inbound slice against a
//! [`DataMeter`] before dispatching it to a reassembly buffer. Several
//! demuxers belonging to one session may share a single meter, so the cap
//! covers the aggregate across all priority streams and channels.
//!
//! The meter uses atomic operations for lock-free tracking and can be
//! shared across threads; clones share the same underlying counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sentinel limit meaning "no cap configured".
const UNLIMITED: u64 = u64::MAX;

/// Shared meter charging inbound bytes against a configurable limit.
#[derive(Debug, Clone)]
pub struct DataMeter {
    inner: Arc<MeterInner>,
}

#[derive(Debug)]
struct MeterInner {
    /// Total bytes charged so far.
    consumed: AtomicU64,
    /// Configured cap; `UNLIMITED` when no cap is set.
    limit: AtomicU64,
}

impl DataMeter {
    /// Create a meter with the given byte limit.
    pub fn new(limit: u64) -> Self {
        Self {
            inner: Arc::new(MeterInner {
                consumed: AtomicU64::new(0),
                limit: AtomicU64::new(limit),
            }),
        }
    }

    /// Create a meter with no cap.
    pub fn unlimited() -> Self {
        Self::new(UNLIMITED)
    }

    /// The configured limit, or `None` when uncapped.
    pub fn limit(&self) -> Option<u64> {
        match self.inner.limit.load(Ordering::Acquire) {
            UNLIMITED => None,
            limit => Some(limit),
        }
    }

    /// Replace the limit. `None` removes the cap.
    pub fn set_limit(&self, limit: Option<u64>) {
        self.inner
            .limit
            .store(limit.unwrap_or(UNLIMITED), Ordering::Release);
    }

    /// Total bytes charged so far.
    #[inline]
    pub fn consumed(&self) -> u64 {
        self.inner.consumed.load(Ordering::Acquire)
    }

    /// Bytes left before the cap, or `None` when uncapped.
    pub fn remaining(&self) -> Option<u64> {
        self.limit()
            .map(|limit| limit.saturating_sub(self.consumed()))
    }

    /// Charge `bytes` against the meter.
    ///
    /// Returns `false` when the charge pushes the running total past the
    /// limit. The charge is recorded either way; a breached session is
    /// expected to be torn down, not resumed.
    pub fn try_charge(&self, bytes: u64) -> bool {
        let before = self.inner.consumed.fetch_add(bytes, Ordering::AcqRel);
        let total = before.saturating_add(bytes);
        total <= self.inner.limit.load(Ordering::Acquire)
    }

    /// Reset the running total to zero, keeping the limit.
    pub fn reset(&self) {
        self.inner.consumed.store(0, Ordering::Release);
    }
}

impl Default for DataMeter {
    fn default() -> Self {
        Self::unlimited()
    }
}
