use super::{Counter, Metrics, MetricsError, Rate, Trend};
use super::{HTTP_REQS, HTTP_REQ_DURATION, HTTP_REQ_FAILED};
use vidload_core::{RequestOutcome, Tag};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Feeds request outcomes into the built-in HTTP series.
///
/// When the scenario carries a tag, request count and failure rate are also recorded under
/// `http_reqs{key:value}` and `http_req_failed{key:value}` so thresholds can target one stage.
#[derive(Clone)]
pub struct OutcomeRecorder {
    reqs: Counter,
    duration: Trend,
    failed: Rate,
    tagged: Option<(Counter, Rate)>,
}

impl OutcomeRecorder {
    pub fn new(metrics: &Metrics, tag: Option<&Tag>) -> Result<Self, MetricsError> {
        let tagged = match tag {
            Some(tag) => Some((
                metrics.counter(&format!("{HTTP_REQS}{{{tag}}}"))?,
                metrics.rate(&format!("{HTTP_REQ_FAILED}{{{tag}}}"))?,
            )),
            None => None,
        };

        Ok(Self {
            reqs: metrics.counter(HTTP_REQS)?,
            duration: metrics.trend(HTTP_REQ_DURATION)?,
            failed: metrics.rate(HTTP_REQ_FAILED)?,
            tagged,
        })
    }

    pub fn record(&self, outcome: RequestOutcome) {
        trace!("{outcome}");

        self.reqs.increment(1);
        self.duration.add_duration(outcome.latency());
        self.failed.add(!outcome.success());

        if let Some((reqs, failed)) = &self.tagged {
            reqs.increment(1);
            failed.add(!outcome.success());
        }

        #[cfg(feature = "metrics")]
        {
            let action = outcome.action().as_str();
            metrics::counter!("vidload_http_reqs", "action" => action).increment(1);
            metrics::histogram!("vidload_http_req_duration", "action" => action)
                .record(outcome.latency().as_secs_f64());
            if !outcome.success() {
                metrics::counter!("vidload_http_req_failed", "action" => action).increment(1);
            }
        }
    }
}
