use super::snapshot::{CounterValues, RateValues, SeriesValues, TrendValues};
use metrics_util::AtomicBucket;
use serde::Serialize;
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Rate,
    Trend,
    Counter,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Rate => f.write_str("rate"),
            SeriesKind::Trend => f.write_str("trend"),
            SeriesKind::Counter => f.write_str("counter"),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Series {
    Rate(Arc<RateCell>),
    Trend(Arc<TrendCell>),
    Counter(Arc<CounterCell>),
}

impl Series {
    pub fn new(kind: SeriesKind) -> Self {
        match kind {
            SeriesKind::Rate => Series::Rate(Arc::default()),
            SeriesKind::Trend => Series::Trend(Arc::default()),
            SeriesKind::Counter => Series::Counter(Arc::default()),
        }
    }

    pub fn kind(&self) -> SeriesKind {
        match self {
            Series::Rate(_) => SeriesKind::Rate,
            Series::Trend(_) => SeriesKind::Trend,
            Series::Counter(_) => SeriesKind::Counter,
        }
    }

    pub fn values(&self, elapsed: Duration) -> SeriesValues {
        match self {
            Series::Rate(cell) => SeriesValues::Rate(RateValues::new(
                cell.passes.load(Ordering::Acquire),
                cell.fails.load(Ordering::Acquire),
            )),
            Series::Trend(cell) => {
                let mut samples = vec![];
                cell.samples.data_with(|block| samples.extend_from_slice(block));
                SeriesValues::Trend(TrendValues::new(samples))
            }
            Series::Counter(cell) => SeriesValues::Counter(CounterValues::new(
                cell.count.load(Ordering::Acquire),
                elapsed,
            )),
        }
    }
}

#[derive(Default)]
pub(crate) struct RateCell {
    passes: AtomicU64,
    fails: AtomicU64,
}

pub(crate) struct TrendCell {
    samples: AtomicBucket<f64>,
}

impl Default for TrendCell {
    fn default() -> Self {
        Self {
            samples: AtomicBucket::new(),
        }
    }
}

#[derive(Default)]
pub(crate) struct CounterCell {
    count: AtomicU64,
}

/// Handle to a rate series.
#[derive(Clone)]
pub struct Rate {
    cell: Arc<RateCell>,
    sealed: Arc<AtomicBool>,
}

impl Rate {
    pub(crate) fn new(cell: Arc<RateCell>, sealed: Arc<AtomicBool>) -> Self {
        Self { cell, sealed }
    }

    /// `true` counts toward the rate, `false` only toward the total.
    pub fn add(&self, value: bool) {
        if self.sealed.load(Ordering::Acquire) {
            trace!("Dropping rate observation after finalization.");
            return;
        }

        if value {
            self.cell.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cell.fails.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Handle to a trend series.
#[derive(Clone)]
pub struct Trend {
    cell: Arc<TrendCell>,
    sealed: Arc<AtomicBool>,
}

impl Trend {
    pub(crate) fn new(cell: Arc<TrendCell>, sealed: Arc<AtomicBool>) -> Self {
        Self { cell, sealed }
    }

    pub fn add(&self, value: f64) {
        if self.sealed.load(Ordering::Acquire) {
            trace!("Dropping trend observation after finalization.");
            return;
        }
        self.cell.samples.push(value);
    }

    /// Records the duration in milliseconds.
    pub fn add_duration(&self, duration: Duration) {
        self.add(duration.as_secs_f64() * 1000.);
    }
}

/// Handle to a counter series.
#[derive(Clone)]
pub struct Counter {
    cell: Arc<CounterCell>,
    sealed: Arc<AtomicBool>,
}

impl Counter {
    pub(crate) fn new(cell: Arc<CounterCell>, sealed: Arc<AtomicBool>) -> Self {
        Self { cell, sealed }
    }

    pub fn increment(&self, value: u64) {
        if self.sealed.load(Ordering::Acquire) {
            trace!("Dropping counter increment after finalization.");
            return;
        }
        self.cell.count.fetch_add(value, Ordering::Relaxed);
    }
}
