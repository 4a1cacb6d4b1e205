use super::series::SeriesKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use vidload_core::Aggregation;

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("no samples were recorded")]
    NoSamples,

    #[error("`{aggregation}` does not apply to a {kind}")]
    Unsupported {
        kind: SeriesKind,
        aggregation: String,
    },
}

/// Frozen contents of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum SeriesValues {
    Rate(RateValues),
    Trend(TrendValues),
    Counter(CounterValues),
}

impl SeriesValues {
    pub fn kind(&self) -> SeriesKind {
        match self {
            SeriesValues::Rate(_) => SeriesKind::Rate,
            SeriesValues::Trend(_) => SeriesKind::Trend,
            SeriesValues::Counter(_) => SeriesKind::Counter,
        }
    }

    /// Read a statistic off the series. An empty series has no statistic at all, so every
    /// threshold on it fails rather than passing vacuously.
    pub fn aggregate(&self, aggregation: Aggregation) -> Result<f64, AggregateError> {
        let value = match (self, aggregation) {
            (SeriesValues::Rate(rate), Aggregation::Rate) => rate.rate,
            (SeriesValues::Counter(counter), Aggregation::Count) => {
                Some(counter.count as f64).filter(|_| counter.count > 0)
            }
            (SeriesValues::Trend(trend), Aggregation::Count) => {
                Some(trend.count as f64).filter(|_| trend.count > 0)
            }
            (SeriesValues::Trend(trend), Aggregation::Avg) => trend.avg,
            (SeriesValues::Trend(trend), Aggregation::Min) => trend.min,
            (SeriesValues::Trend(trend), Aggregation::Max) => trend.max,
            (SeriesValues::Trend(trend), Aggregation::Med) => trend.med,
            (SeriesValues::Trend(trend), Aggregation::Percentile(p)) => trend.percentile(p),
            (values, aggregation) => {
                return Err(AggregateError::Unsupported {
                    kind: values.kind(),
                    aggregation: aggregation.to_string(),
                })
            }
        };
        value.ok_or(AggregateError::NoSamples)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateValues {
    pub passes: u64,
    pub fails: u64,
    pub rate: Option<f64>,
}

impl RateValues {
    pub fn new(passes: u64, fails: u64) -> Self {
        let total = passes + fails;
        let rate = (total > 0).then(|| passes as f64 / total as f64);
        Self {
            passes,
            fails,
            rate,
        }
    }

    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

/// Trend statistics in the unit the samples were recorded in (milliseconds for latencies).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendValues {
    pub count: usize,
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub med: Option<f64>,
    pub max: Option<f64>,
    #[serde(rename = "p(90)")]
    pub p90: Option<f64>,
    #[serde(rename = "p(95)")]
    pub p95: Option<f64>,
    #[serde(rename = "p(99)")]
    pub p99: Option<f64>,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl TrendValues {
    pub fn new(mut samples: Vec<f64>) -> Self {
        samples.retain(|v| v.is_finite());
        samples.sort_by(|a, b| a.total_cmp(b));

        let mut values = Self {
            count: samples.len(),
            avg: None,
            min: samples.first().copied(),
            med: None,
            max: samples.last().copied(),
            p90: None,
            p95: None,
            p99: None,
            sorted: samples,
        };

        if !values.sorted.is_empty() {
            values.avg = Some(statistical::mean(&values.sorted));
            values.med = Some(statistical::median(&values.sorted));
            values.p90 = values.percentile(90.);
            values.p95 = values.percentile(95.);
            values.p99 = values.percentile(99.);
        }
        values
    }

    /// Exact percentile, linearly interpolated between the two closest ranks.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let last = self.sorted.len().checked_sub(1)?;
        let rank = (p / 100.).clamp(0., 1.) * last as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let (low, high) = (self.sorted[lo], self.sorted[hi]);
        Some(low + (high - low) * (rank - lo as f64))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterValues {
    pub count: u64,
    pub per_second: f64,
}

impl CounterValues {
    pub fn new(count: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let per_second = if secs > 0. { count as f64 / secs } else { 0. };
        Self { count, per_second }
    }
}

/// Every series of a finalized run, keyed by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    elapsed: Duration,
    series: BTreeMap<String, SeriesValues>,
}

impl Snapshot {
    pub fn new(elapsed: Duration, series: BTreeMap<String, SeriesValues>) -> Self {
        Self { elapsed, series }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn get(&self, name: &str) -> Option<&SeriesValues> {
        self.series.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SeriesValues)> {
        self.series.iter()
    }

    pub fn into_series(self) -> BTreeMap<String, SeriesValues> {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_interpolate() {
        let trend = TrendValues::new((1..=100).map(f64::from).collect());
        assert_eq!(trend.count, 100);
        assert_eq!(trend.min, Some(1.));
        assert_eq!(trend.max, Some(100.));
        assert_eq!(trend.med, Some(50.5));
        assert_eq!(trend.avg, Some(50.5));
        assert_eq!(trend.percentile(0.), Some(1.));
        assert_eq!(trend.percentile(100.), Some(100.));

        let p95 = trend.p95.unwrap();
        assert!((p95 - 95.05).abs() < 1e-9, "p95 was {p95}");
    }

    #[test]
    fn slow_p95_fails_latency_threshold() {
        let mut samples = vec![200.; 90];
        samples.extend([1200.; 10]);
        let trend = SeriesValues::Trend(TrendValues::new(samples));

        let observed = trend.aggregate(Aggregation::Percentile(95.)).unwrap();
        assert_eq!(observed, 1200.);
        let expr: vidload_core::ThresholdExpr = "p(95)<1000".parse().unwrap();
        assert!(!expr.holds(observed));
    }

    #[test]
    fn empty_series_have_no_statistics() {
        let trend = SeriesValues::Trend(TrendValues::new(vec![]));
        assert_eq!(
            trend.aggregate(Aggregation::Percentile(95.)),
            Err(AggregateError::NoSamples)
        );

        let rate = SeriesValues::Rate(RateValues::new(0, 0));
        assert_eq!(rate.aggregate(Aggregation::Rate), Err(AggregateError::NoSamples));

        let counter = SeriesValues::Counter(CounterValues::new(0, Duration::from_secs(3)));
        assert_eq!(counter.aggregate(Aggregation::Count), Err(AggregateError::NoSamples));
    }

    #[test]
    fn mismatched_aggregation_is_unsupported() {
        let rate = SeriesValues::Rate(RateValues::new(1, 1));
        assert!(matches!(
            rate.aggregate(Aggregation::Percentile(95.)),
            Err(AggregateError::Unsupported {
                kind: SeriesKind::Rate,
                ..
            })
        ));
    }

    #[test]
    fn counters_only_count() {
        let counter = SeriesValues::Counter(CounterValues::new(30, Duration::from_secs(10)));
        assert_eq!(counter.aggregate(Aggregation::Count), Ok(30.));
        assert_eq!(
            counter.aggregate(Aggregation::Rate),
            Err(AggregateError::Unsupported {
                kind: SeriesKind::Counter,
                aggregation: "rate".into(),
            })
        );
    }
}
