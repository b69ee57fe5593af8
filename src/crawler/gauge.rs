//! In-flight counters for the bounded resources of a crawl
//!
//! Each bounded section (HTTP attempts, detail tasks) holds a guard from an
//! `ActivityGauge` while it runs. The gauge remembers the highest concurrency
//! it has seen, which the crawl report logs and the tests assert against the
//! configured caps.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counter of currently active operations
#[derive(Debug, Clone, Default)]
pub struct ActivityGauge {
    inner: Arc<GaugeInner>,
}

#[derive(Debug, Default)]
struct GaugeInner {
    active: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicU64,
}

impl ActivityGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one operation as started; it ends when the guard drops
    pub fn enter(&self) -> GaugeGuard {
        let now = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        self.inner.total.fetch_add(1, Ordering::Relaxed);
        GaugeGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Operations running right now
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous operations observed
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    /// Operations started since the gauge was created
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::Relaxed)
    }
}

/// Decrements the gauge on drop
#[derive(Debug)]
pub struct GaugeGuard {
    inner: Arc<GaugeInner>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}
