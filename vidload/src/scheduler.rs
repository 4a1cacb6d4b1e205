//! Drives every scenario's concurrency profile off one shared run clock.
mod pool;
mod timer;

use crate::metrics::{Metrics, MetricsError, VUS_MAX};
use crate::scenario::Scenario;
use crate::workload::Workload;
use pool::{Pool, UserPool};
use serde::Serialize;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use timer::Timer;
use tokio::time::Instant;
use vidload_core::{ConfigError, SCHEDULER_TICK};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid scenario: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("Scenario `{0}` was added twice.")]
    DuplicateScenario(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub iterations: u64,
    pub peak_concurrency: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    #[serde(skip)]
    pub started_at: OffsetDateTime,
    pub elapsed: Duration,
    /// Highest total number of concurrently running virtual users.
    pub vus_max: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl ScheduleReport {
    pub fn iterations(&self) -> u64 {
        self.scenarios.iter().map(|s| s.iterations).sum()
    }
}

/// Runs a set of scenarios to completion.
///
/// Every `tick` the scheduler compares each scenario's desired concurrency at the current run
/// offset against the users it has running, spawning or signalling users to converge. Once the
/// last scenario's timeline is over, all users are stopped and drained.
pub struct Scheduler {
    metrics: Metrics,
    pools: Vec<Box<dyn Pool>>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            pools: vec![],
            tick: SCHEDULER_TICK,
        }
    }

    /// Control-loop period. A zero period keeps the default.
    pub fn tick(mut self, tick: Duration) -> Self {
        if tick.is_zero() {
            warn!(
                "Ignoring zero scheduler tick; keeping {}",
                humantime::format_duration(self.tick)
            );
        } else {
            self.tick = tick;
        }
        self
    }

    pub fn add<W>(&mut self, scenario: Scenario<W>) -> Result<(), SchedulerError>
    where
        W: Workload + Sync + 'static,
    {
        let (config, workload) = scenario.into_parts();
        config.validate()?;
        if self.pools.iter().any(|p| p.config().name == config.name) {
            return Err(SchedulerError::DuplicateScenario(config.name));
        }

        debug!(
            "Scheduling scenario {} at +{} for {}",
            config.name,
            humantime::format_duration(config.start_time),
            humantime::format_duration(config.executor.duration())
        );
        self.pools
            .push(Box::new(UserPool::new(config, workload, &self.metrics)?));
        Ok(())
    }

    /// Builder form of [`Scheduler::add`].
    pub fn scenario<W>(mut self, scenario: Scenario<W>) -> Result<Self, SchedulerError>
    where
        W: Workload + Sync + 'static,
    {
        self.add(scenario)?;
        Ok(self)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Offset from the run start at which the last scenario completes.
    pub fn end_offset(&self) -> Duration {
        self.pools
            .iter()
            .map(|p| p.config().end_offset())
            .max()
            .unwrap_or_default()
    }

    #[instrument(name = "scheduler", skip_all, fields(scenarios = self.pools.len()))]
    pub async fn run(mut self) -> ScheduleReport {
        let end = self.end_offset();
        info!(
            "Running {} scenario(s) over {}",
            self.pools.len(),
            humantime::format_duration(end)
        );

        let started_at = OffsetDateTime::now_utc();
        let start = Instant::now();
        let mut timer = Timer::new(self.tick);
        trace!("Scheduler ticking every {timer}");

        let mut vus_max = 0;
        loop {
            let elapsed = start.elapsed();
            for pool in self.pools.iter_mut() {
                let desired = pool.config().concurrency_at(elapsed);
                pool.set_concurrency(desired);
            }

            let running: usize = self.pools.iter().map(|p| p.concurrency()).sum();
            vus_max = vus_max.max(running);

            if elapsed >= end {
                break;
            }
            let lag = timer.tick().await;
            if lag >= timer.period() {
                warn!(
                    "Scheduler tick fired {} late",
                    humantime::format_duration(lag)
                );
            }
        }

        debug!("All timelines complete; draining virtual users.");
        let mut scenarios = Vec::with_capacity(self.pools.len());
        for pool in self.pools {
            scenarios.push(pool.shutdown().await);
        }

        match self.metrics.counter(VUS_MAX) {
            Ok(counter) => counter.increment(vus_max as u64),
            Err(err) => warn!("Not recording {VUS_MAX}: {err}"),
        }

        let report = ScheduleReport {
            started_at,
            elapsed: start.elapsed(),
            vus_max,
            scenarios,
        };
        info!(
            "Run complete in {}: {} iterations, {} peak users",
            humantime::format_duration(report.elapsed),
            report.iterations(),
            report.vus_max
        );
        report
    }
}

impl IntoFuture for Scheduler {
    type Output = ScheduleReport;
    type IntoFuture = Pin<Box<dyn Future<Output = ScheduleReport> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}
