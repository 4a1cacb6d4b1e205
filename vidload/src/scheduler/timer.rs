use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Fixed-period ticker driving the scheduler's control loop.
pub(crate) struct Timer {
    interval: Interval,
    period: Duration,
}

impl Timer {
    /// `period` must be non-zero. The first tick fires one period from now.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    /// Wait for the next tick and return how late it fired.
    pub async fn tick(&mut self) -> Duration {
        let scheduled = self.interval.tick().await;
        scheduled.elapsed()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.period))
    }
}
