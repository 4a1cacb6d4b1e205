use super::snapshot::{SeriesValues, Snapshot};
use crate::scheduler::ScheduleReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use vidload_core::ThresholdRule;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Failed to write summary to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Verdict for a single threshold expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ThresholdResult {
    pub fn evaluate(rule: &ThresholdRule, snapshot: &Snapshot) -> Self {
        let aggregated = match snapshot.get(&rule.metric) {
            Some(values) => values
                .aggregate(rule.expr.aggregation)
                .map_err(|err| err.to_string()),
            None => Err("metric was never recorded".to_string()),
        };

        let (observed, ok, reason) = match aggregated {
            Ok(observed) => (Some(observed), rule.expr.holds(observed), None),
            Err(reason) => (None, false, Some(reason)),
        };

        if !ok {
            debug!("Threshold {rule} crossed (observed {observed:?})");
        }

        Self {
            metric: rule.metric.clone(),
            expression: rule.expr.to_string(),
            observed,
            ok,
            reason,
        }
    }
}

/// Outcome of a whole plan: the finalized series plus the threshold verdicts.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub plan: String,
    pub started_at: String,
    pub duration_secs: f64,
    pub vus_max: usize,
    pub passed: bool,
    pub thresholds: Vec<ThresholdResult>,
    pub metrics: BTreeMap<String, SeriesValues>,
}

impl RunReport {
    pub fn new(
        plan: &str,
        schedule: &ScheduleReport,
        snapshot: Snapshot,
        rules: &[ThresholdRule],
    ) -> Self {
        let thresholds: Vec<_> = rules
            .iter()
            .map(|rule| ThresholdResult::evaluate(rule, &snapshot))
            .collect();
        let passed = thresholds.iter().all(|t| t.ok);

        let started_at = schedule
            .started_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| schedule.started_at.unix_timestamp().to_string());

        Self {
            plan: plan.to_string(),
            started_at,
            duration_secs: snapshot.elapsed().as_secs_f64(),
            vus_max: schedule.vus_max,
            passed,
            thresholds,
            metrics: snapshot.into_series(),
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| !t.ok)
    }

    /// Write the JSON summary into `dir`, creating it if needed.
    pub fn write_json(&self, dir: &Path, file_name: &str) -> Result<PathBuf, SummaryError> {
        let path = dir.join(file_name);
        let json = serde_json::to_vec_pretty(self)?;

        std::fs::create_dir_all(dir).map_err(|source| SummaryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| SummaryError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Summary written to {}", path.display());
        Ok(path)
    }
}

const RULE: &str = "================================================================================";

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "  {}", self.plan)?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "  started: {}  duration: {:.1}s  vus_max: {}",
            self.started_at, self.duration_secs, self.vus_max
        )?;
        writeln!(f)?;

        for (name, values) in &self.metrics {
            write!(f, "  {name:.<40}: ")?;
            match values {
                SeriesValues::Rate(rate) => match rate.rate {
                    Some(r) => writeln!(
                        f,
                        "{:.2}%  ✓ {}  ✗ {}",
                        r * 100.,
                        rate.passes,
                        rate.fails
                    )?,
                    None => writeln!(f, "no samples")?,
                },
                SeriesValues::Counter(counter) => {
                    writeln!(f, "{}  {:.2}/s", counter.count, counter.per_second)?
                }
                SeriesValues::Trend(trend) => match (trend.avg, trend.min, trend.med) {
                    (Some(avg), Some(min), Some(med)) => writeln!(
                        f,
                        "avg={avg:.2} min={min:.2} med={med:.2} max={:.2} p(90)={:.2} p(95)={:.2}",
                        trend.max.unwrap_or_default(),
                        trend.p90.unwrap_or_default(),
                        trend.p95.unwrap_or_default(),
                    )?,
                    _ => writeln!(f, "no samples")?,
                },
            }
        }

        if !self.thresholds.is_empty() {
            writeln!(f)?;
            writeln!(f, "  thresholds:")?;
            for t in &self.thresholds {
                let mark = if t.ok { '✓' } else { '✗' };
                match (t.observed, &t.reason) {
                    (Some(observed), _) => writeln!(
                        f,
                        "    {mark} {} {} (observed {observed:.4})",
                        t.metric, t.expression
                    )?,
                    (None, Some(reason)) => {
                        writeln!(f, "    {mark} {} {} ({reason})", t.metric, t.expression)?
                    }
                    (None, None) => writeln!(f, "    {mark} {} {}", t.metric, t.expression)?,
                }
            }
        }

        writeln!(f)?;
        let verdict = if self.passed { "PASSED" } else { "FAILED" };
        write!(f, "  result: {verdict}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use std::time::Duration;
    use time::OffsetDateTime;

    fn schedule() -> ScheduleReport {
        ScheduleReport {
            started_at: OffsetDateTime::now_utc(),
            elapsed: Duration::from_secs(10),
            vus_max: 5,
            scenarios: vec![],
        }
    }

    #[test]
    fn report_fails_on_any_crossed_threshold() {
        let metrics = Metrics::new();
        let errors = metrics.rate("errors").unwrap();
        errors.add(false);
        errors.add(false);
        errors.add(true);
        let latency = metrics.trend("latency").unwrap();
        latency.add(120.);

        let rules = [
            ThresholdRule::new("errors", "rate<0.05").unwrap(),
            ThresholdRule::new("latency", "p(95)<1000").unwrap(),
        ];
        let report = RunReport::new(
            "web",
            &schedule(),
            metrics.finalize(Duration::from_secs(10)),
            &rules,
        );

        assert!(!report.passed());
        let failed: Vec<_> = report.failed_thresholds().map(|t| t.metric.as_str()).collect();
        assert_eq!(failed, ["errors"]);
        assert!(report.to_string().contains("✗ errors rate<0.05"));
        assert!(report.to_string().ends_with("result: FAILED"));
    }

    #[test]
    fn summary_lands_in_results_dir() {
        let metrics = Metrics::new();
        metrics.counter("videos_uploaded").unwrap().increment(4);
        let report = RunReport::new(
            "upload",
            &schedule(),
            metrics.finalize(Duration::from_secs(10)),
            &[],
        );
        assert!(report.passed());

        let dir = std::env::temp_dir().join(format!("vidload-report-{}", std::process::id()));
        let path = report.write_json(&dir, "upload_summary.json").unwrap();
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();

        assert_eq!(written["plan"], "upload");
        assert_eq!(written["metrics"]["videos_uploaded"]["type"], "counter");
        assert_eq!(written["metrics"]["videos_uploaded"]["values"]["count"], 4);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
