//! Cooperative yield primitives
//!
//! The yield is the only way a looper iteration or a stage hands control back
//! to the host event loop. It never alters the value being processed and has
//! no failure mode: a broken timer is fatal to the runtime, not to a task.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default pause between chunks of work
pub const DEFAULT_YIELD_INTERVAL: Duration = Duration::from_millis(20);

/// Suspend the calling task, then resume
#[async_trait]
pub trait Yielder: Send + Sync {
    async fn pause(&self);
}

/// Sleeps a fixed interval on the tokio timer
///
/// This is the production primitive: every chunk of work is preceded by a
/// pause long enough for the host loop to render and handle input.
#[derive(Debug, Clone, Copy)]
pub struct SleepYield {
    interval: Duration,
}

impl SleepYield {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SleepYield {
    fn default() -> Self {
        Self::new(DEFAULT_YIELD_INTERVAL)
    }
}

#[async_trait]
impl Yielder for SleepYield {
    async fn pause(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Gives the scheduler one turn without touching the timer
///
/// Deterministic and instant, for tests and hosts that pace work themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooperativeYield;

#[async_trait]
impl Yielder for CooperativeYield {
    async fn pause(&self) {
        tokio::task::yield_now().await;
    }
}

/// Wraps another yielder and counts how many pauses went through it
///
/// Clones share the same counter.
#[derive(Debug)]
pub struct CountingYield<Y> {
    inner: Y,
    count: Arc<AtomicUsize>,
}

impl<Y> CountingYield<Y> {
    pub fn new(inner: Y) -> Self {
        Self {
            inner,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of pauses started so far
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<Y: Clone> Clone for CountingYield<Y> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            count: Arc::clone(&self.count),
        }
    }
}

#[async_trait]
impl<Y: Yielder> Yielder for CountingYield<Y> {
    async fn pause(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.pause().await;
    }
}
