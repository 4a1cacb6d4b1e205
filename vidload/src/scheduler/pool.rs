use super::ScenarioReport;
use crate::metrics::{Counter, Metrics, MetricsError, OutcomeRecorder, ITERATIONS};
use crate::workload::{VirtualUser, Workload};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use vidload_core::ScenarioConfig;
#[allow(unused)]
use tracing::{debug, error, info, info_span, trace, warn, Instrument, Span};

pub(crate) type ShutdownFuture = Pin<Box<dyn Future<Output = ScenarioReport> + Send>>;

/// Type-erased set of virtual users belonging to one scenario.
pub(crate) trait Pool: Send {
    fn config(&self) -> &ScenarioConfig;

    fn set_concurrency(&mut self, concurrency: usize);

    fn concurrency(&self) -> usize;

    /// Signal every user to stop and wait for their in-flight iterations.
    fn shutdown(self: Box<Self>) -> ShutdownFuture;
}

pub(crate) struct UserPool<W> {
    config: ScenarioConfig,
    name: Arc<str>,
    workload: Arc<W>,
    recorder: OutcomeRecorder,
    iterations: Counter,
    stops: Vec<watch::Sender<bool>>,
    tasks: JoinSet<u64>,
    next_id: u64,
    peak: usize,
    span: Span,
}

impl<W> UserPool<W>
where
    W: Workload + Sync + 'static,
{
    pub fn new(config: ScenarioConfig, workload: W, metrics: &Metrics) -> Result<Self, MetricsError> {
        Ok(Self {
            span: info_span!("scenario", name = %config.name),
            name: config.name.as_str().into(),
            recorder: OutcomeRecorder::new(metrics, config.tag.as_ref())?,
            iterations: metrics.counter(ITERATIONS)?,
            config,
            workload: Arc::new(workload),
            stops: vec![],
            tasks: JoinSet::new(),
            next_id: 0,
            peak: 0,
        })
    }

    fn spawn_user(&mut self) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let user = VirtualUser::new(
            self.next_id,
            self.name.clone(),
            self.config.think_time,
            self.recorder.clone(),
            stop_rx,
        );
        self.next_id += 1;

        let workload = self.workload.clone();
        let iterations = self.iterations.clone();
        self.tasks
            .spawn(run_user(workload, user, iterations).instrument(self.span.clone()));
        self.stops.push(stop_tx);
    }
}

impl<W> Pool for UserPool<W>
where
    W: Workload + Sync + 'static,
{
    fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn set_concurrency(&mut self, concurrency: usize) {
        let current = self.stops.len();
        if concurrency == current {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        if current == 0 && self.next_id == 0 {
            info!("Scenario {} started", self.name);
        }

        if concurrency > current {
            while self.stops.len() < concurrency {
                self.spawn_user();
            }
        } else {
            // NOTE: Users finish their current request before exiting; nothing is aborted.
            for stop in self.stops.drain(concurrency..) {
                let _ = stop.send(true);
            }
        }

        self.peak = self.peak.max(concurrency);
        debug!("Scenario {} concurrency {current} -> {concurrency}", self.name);
    }

    fn concurrency(&self) -> usize {
        self.stops.len()
    }

    fn shutdown(mut self: Box<Self>) -> ShutdownFuture {
        let span = self.span.clone();
        let drain = async move {
            self.set_concurrency(0);

            let mut iterations = 0;
            while let Some(res) = self.tasks.join_next().await {
                match res {
                    Ok(count) => iterations += count,
                    Err(err) => error!("Virtual user of scenario {} failed: {err}", self.name),
                }
            }

            info!(
                "Scenario {} finished: {iterations} iterations, peak {} users",
                self.name, self.peak
            );
            ScenarioReport {
                name: self.config.name.clone(),
                iterations,
                peak_concurrency: self.peak,
            }
        };
        Box::pin(drain.instrument(span))
    }
}

async fn run_user<W: Workload>(workload: Arc<W>, mut user: VirtualUser, iterations: Counter) -> u64 {
    trace!("Virtual user {} of {} started", user.id(), user.scenario());
    while !user.is_stopping() {
        workload.iteration(&mut user).await;
        user.complete_iteration();
        iterations.increment(1);
    }
    trace!(
        "Virtual user {} of {} stopped after {} iterations",
        user.id(),
        user.scenario(),
        user.iterations()
    );
    user.iterations()
}
