//! Clock implementations.
//!
//! [`SystemClock`] reads wall-clock time and ticks on a tokio interval.
//! [`ManualClock`] only moves when told to and ticks on demand, for tests and
//! simulations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use lockup_core::traits::Clock;
use lockup_core::types::Timestamp;

const TICK_BUFFER: usize = 64;

/// Wall clock in whole Unix seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }

    fn current() -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

#[async_trait]
impl Clock for SystemClock {
    async fn now(&self) -> Timestamp {
        Self::current()
    }

    /// Spawns a ticker task that lives as long as some receiver does.
    ///
    /// Must be called from within a tokio runtime.
    fn subscribe_ticks(&self, interval_secs: u64) -> broadcast::Receiver<Timestamp> {
        let (tx, rx) = broadcast::channel(TICK_BUFFER);
        let period = Duration::from_secs(interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Self::current()).is_err() {
                    debug!("no tick subscribers left, stopping ticker");
                    break;
                }
            }
        });
        rx
    }
}

/// A clock that advances only when asked.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
    ticks: broadcast::Sender<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        let (ticks, _) = broadcast::channel(TICK_BUFFER);
        Self {
            now: AtomicU64::new(start),
            ticks,
        }
    }

    pub fn current(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`. Returns the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }

    /// Emit a tick carrying the current time. Returns how many subscribers got it.
    pub fn tick(&self) -> usize {
        self.ticks.send(self.current()).unwrap_or(0)
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn now(&self) -> Timestamp {
        self.current()
    }

    /// Ticks arrive only through [`ManualClock::tick`]; the interval is ignored.
    fn subscribe_ticks(&self, _interval_secs: u64) -> broadcast::Receiver<Timestamp> {
        self.ticks.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now().await, 100);
        assert_eq!(clock.advance(50), 150);
        clock.set(10);
        assert_eq!(clock.now().await, 10);
    }

    #[tokio::test]
    async fn manual_ticks_reach_subscribers() {
        let clock = ManualClock::new(5);
        assert_eq!(clock.tick(), 0);
        let mut rx = clock.subscribe_ticks(3600);
        clock.advance(1);
        assert_eq!(clock.tick(), 1);
        assert_eq!(rx.recv().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn system_clock_is_after_2020() {
        assert!(SystemClock::new().now().await > 1_577_836_800);
    }

    #[tokio::test]
    async fn system_clock_ticks_immediately() {
        let mut rx = SystemClock::new().subscribe_ticks(1);
        let first = rx.recv().await.unwrap();
        assert!(first > 0);
    }
}
