//! Poll-with-timeout helpers built on `tokio::time`, so waits on the
//! transceiver can be driven deterministically with paused time in tests.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Repeated-attempt schedule: wait one interval, attempt, until a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval: interval.min(timeout) }
    }

    /// A single attempt after `delay`
    pub fn once_after(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Start the schedule now
    pub fn start(&self) -> PollTicker {
        PollTicker {
            deadline: Instant::now() + self.timeout,
            interval: self.interval,
            expired: false,
        }
    }
}

/// Running instance of a [`Poller`]
///
/// ```no_run
/// # async fn demo() {
/// use std::time::Duration;
/// use lightbar_bridge::radio::timing::Poller;
///
/// let mut ticker = Poller::new(Duration::from_millis(20), Duration::from_millis(5)).start();
/// while ticker.tick().await {
///     // sample the device; break when it is ready
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct PollTicker {
    deadline: Instant,
    interval: Duration,
    expired: bool,
}

impl PollTicker {
    /// Sleep until the next attempt. Returns `false` once the attempt made at
    /// the deadline has been handed out.
    pub async fn tick(&mut self) -> bool {
        if self.expired {
            return false;
        }

        let wake = (Instant::now() + self.interval).min(self.deadline);
        sleep_until(wake).await;
        if wake >= self.deadline {
            self.expired = true;
        }
        true
    }
}

/// Wall-clock budget for a long-running operation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self { started: Instant::now(), budget }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }
}
