//! Run-scoped metric registry.
//!
//! Series are created lazily on first use and live until the run is finalized. Each series has
//! one kind for its whole life; asking for an existing name with a different kind is an error
//! rather than a silent second series.
mod recorder;
mod report;
mod series;
mod snapshot;

pub use recorder::OutcomeRecorder;
pub use report::{RunReport, SummaryError, ThresholdResult};
pub use series::{Counter, Rate, SeriesKind, Trend};
pub use snapshot::{
    AggregateError, CounterValues, RateValues, SeriesValues, Snapshot, TrendValues,
};

use arc_swap::ArcSwap;
use series::Series;
use std::collections::{BTreeMap, HashMap};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub const HTTP_REQS: &str = "http_reqs";
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const ITERATIONS: &str = "iterations";
pub const VUS_MAX: &str = "vus_max";

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("Metric `{name}` is registered as a {existing}, not a {requested}.")]
    KindMismatch {
        name: String,
        existing: SeriesKind,
        requested: SeriesKind,
    },
}

/// Handle to the registry shared by every virtual user of a run. Cheap to clone.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
}

struct Registry {
    series: ArcSwap<HashMap<String, Series>>,
    sealed: Arc<AtomicBool>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                series: ArcSwap::from_pointee(HashMap::new()),
                sealed: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Pass/fail series. Its value is `passes / (passes + fails)`.
    pub fn rate(&self, name: &str) -> Result<Rate, MetricsError> {
        match self.series(name, SeriesKind::Rate)? {
            Series::Rate(cell) => Ok(Rate::new(cell, self.sealed())),
            other => Err(self.mismatch(name, other.kind(), SeriesKind::Rate)),
        }
    }

    /// Numeric sample series, recorded in milliseconds when fed durations.
    pub fn trend(&self, name: &str) -> Result<Trend, MetricsError> {
        match self.series(name, SeriesKind::Trend)? {
            Series::Trend(cell) => Ok(Trend::new(cell, self.sealed())),
            other => Err(self.mismatch(name, other.kind(), SeriesKind::Trend)),
        }
    }

    /// Monotonic count.
    pub fn counter(&self, name: &str) -> Result<Counter, MetricsError> {
        match self.series(name, SeriesKind::Counter)? {
            Series::Counter(cell) => Ok(Counter::new(cell, self.sealed())),
            other => Err(self.mismatch(name, other.kind(), SeriesKind::Counter)),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.registry.sealed.load(Ordering::Acquire)
    }

    /// Freeze every series and read it out. Observations arriving afterwards are dropped.
    pub fn finalize(&self, elapsed: Duration) -> Snapshot {
        if self.registry.sealed.swap(true, Ordering::AcqRel) {
            warn!("Metrics were already finalized; reading the frozen series again.");
        }

        let series: BTreeMap<String, SeriesValues> = self
            .registry
            .series
            .load()
            .iter()
            .map(|(name, series)| (name.clone(), series.values(elapsed)))
            .collect();

        debug!("Finalized {} series over {elapsed:?}", series.len());
        Snapshot::new(elapsed, series)
    }

    fn sealed(&self) -> Arc<AtomicBool> {
        self.registry.sealed.clone()
    }

    fn series(&self, name: &str, kind: SeriesKind) -> Result<Series, MetricsError> {
        // NOTE: At most two passes. The rcu only inserts when the name is still absent.
        loop {
            if let Some(existing) = self.registry.series.load().get(name) {
                if existing.kind() != kind {
                    return Err(self.mismatch(name, existing.kind(), kind));
                }
                return Ok(existing.clone());
            }

            self.registry.series.rcu(|current| {
                if current.contains_key(name) {
                    Arc::clone(current)
                } else {
                    let mut next = HashMap::clone(current);
                    next.insert(name.to_string(), Series::new(kind));
                    Arc::new(next)
                }
            });
        }
    }

    fn mismatch(&self, name: &str, existing: SeriesKind, requested: SeriesKind) -> MetricsError {
        MetricsError::KindMismatch {
            name: name.to_string(),
            existing,
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidload_core::{Aggregation, ThresholdRule};

    #[test]
    fn rate_counts_passes_over_total() {
        let metrics = Metrics::new();
        let rate = metrics.rate("errors").unwrap();
        for _ in 0..3 {
            rate.add(true);
        }
        for _ in 0..9 {
            rate.add(false);
        }

        let snapshot = metrics.finalize(Duration::from_secs(1));
        let values = snapshot.get("errors").unwrap();
        assert_eq!(values.aggregate(Aggregation::Rate), Ok(0.25));
        assert_eq!(
            values,
            &SeriesValues::Rate(RateValues::new(3, 9)),
        );
    }

    #[test]
    fn same_name_shares_a_series() {
        let metrics = Metrics::new();
        metrics.counter("videos_uploaded").unwrap().increment(2);
        metrics.counter("videos_uploaded").unwrap().increment(3);

        let snapshot = metrics.finalize(Duration::from_secs(5));
        assert_eq!(
            snapshot
                .get("videos_uploaded")
                .unwrap()
                .aggregate(Aggregation::Count),
            Ok(5.)
        );
    }

    #[test]
    fn kind_is_fixed_on_first_use() {
        let metrics = Metrics::new();
        metrics.trend("latency").unwrap();
        assert_eq!(
            metrics.rate("latency").err(),
            Some(MetricsError::KindMismatch {
                name: "latency".into(),
                existing: SeriesKind::Trend,
                requested: SeriesKind::Rate,
            })
        );
    }

    #[test]
    fn late_observations_are_dropped() {
        let metrics = Metrics::new();
        let trend = metrics.trend("upload_time_ms").unwrap();
        trend.add(10.);

        let snapshot = metrics.finalize(Duration::from_secs(1));
        trend.add(20.);
        assert!(metrics.is_finalized());

        let again = metrics.finalize(Duration::from_secs(1));
        assert_eq!(snapshot, again);
        assert_eq!(
            again.get("upload_time_ms").unwrap().aggregate(Aggregation::Count),
            Ok(1.)
        );
    }

    #[test]
    fn missing_series_fails_its_threshold() {
        let metrics = Metrics::new();
        metrics.rate("upload_success").unwrap();
        let snapshot = metrics.finalize(Duration::from_secs(1));

        let registered_but_empty = ThresholdRule::new("upload_success", "rate>0.70").unwrap();
        let result = ThresholdResult::evaluate(&registered_but_empty, &snapshot);
        assert!(!result.ok);
        assert_eq!(result.observed, None);

        let never_registered = ThresholdRule::new("videos_pending", "count>0").unwrap();
        assert!(!ThresholdResult::evaluate(&never_registered, &snapshot).ok);
    }
}
