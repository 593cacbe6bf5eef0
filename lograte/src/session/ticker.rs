//! Repeating send timer for the sampling phase.
//!
//! The first sample command goes out immediately; the ticker covers the
//! rest. It is owned by the session future, so every exit path drops it and
//! no tick can fire on a closed session.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Timer that fires a fixed number of times, then disarms itself.
#[derive(Debug)]
pub struct SampleTicker {
    interval: Option<Interval>,
    remaining: usize,
}

impl SampleTicker {
    /// A ticker that never fires until armed.
    pub fn idle() -> Self {
        Self {
            interval: None,
            remaining: 0,
        }
    }

    /// Fire `sends` times, one `period` apart, starting one period from now.
    pub fn arm(&mut self, period: Duration, sends: usize) {
        if sends == 0 {
            self.disarm();
            return;
        }
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.remaining = sends;
    }

    /// Stop firing.
    pub fn disarm(&mut self) {
        self.interval = None;
        self.remaining = 0;
    }

    /// Whether more ticks are due.
    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Ticks still to come.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Wait for the next tick.
    ///
    /// Never resolves while disarmed. Cancel-safe.
    pub async fn next(&mut self) {
        let Some(interval) = self.interval.as_mut() else {
            return std::future::pending().await;
        };
        interval.tick().await;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.interval = None;
        }
    }
}

impl Default for SampleTicker {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_exact_count() {
        let mut ticker = SampleTicker::idle();
        let start = Instant::now();
        ticker.arm(Duration::from_secs(10), 2);

        ticker.next().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        ticker.next().await;
        assert_eq!(start.elapsed(), Duration::from_secs(20));

        assert!(!ticker.is_armed());
        assert_eq!(ticker.remaining(), 0);

        // a third tick must never come
        let third = tokio::time::timeout(Duration::from_secs(60), ticker.next()).await;
        assert!(third.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_sends_stays_idle() {
        let mut ticker = SampleTicker::idle();
        ticker.arm(Duration::from_secs(10), 0);
        assert!(!ticker.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm() {
        let mut ticker = SampleTicker::idle();
        ticker.arm(Duration::from_secs(1), 5);
        ticker.next().await;
        ticker.disarm();
        let next = tokio::time::timeout(Duration::from_secs(10), ticker.next()).await;
        assert!(next.is_err());
    }
}
