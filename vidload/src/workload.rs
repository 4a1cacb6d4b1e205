//! The unit of work a virtual user repeats, and the per-user session it runs in.
use crate::metrics::{Metrics, MetricsError, OutcomeRecorder};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use vidload_core::{RequestOutcome, ThinkTime};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One iteration of a virtual user's loop.
///
/// The scheduler calls [`Workload::iteration`] repeatedly for as long as the user is part of
/// its scenario's concurrency. Iterations are expected to end with [`VirtualUser::think`].
#[trait_variant::make(Workload: Send)]
pub trait LocalWorkload {
    async fn iteration(&self, user: &mut VirtualUser);
}

/// Session state owned by a single virtual user.
///
/// Nothing here is shared with other users: the auth token and random source live and die with
/// the user.
pub struct VirtualUser {
    id: u64,
    scenario: Arc<str>,
    iterations: u64,
    token: Option<String>,
    think_time: ThinkTime,
    rng: SmallRng,
    recorder: OutcomeRecorder,
    stop: watch::Receiver<bool>,
}

impl VirtualUser {
    pub(crate) fn new(
        id: u64,
        scenario: Arc<str>,
        think_time: ThinkTime,
        recorder: OutcomeRecorder,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            scenario,
            iterations: 0,
            token: None,
            think_time,
            rng: SmallRng::from_entropy(),
            recorder,
            stop,
        }
    }

    /// A user outside any scheduler. It never receives a stop signal.
    pub fn detached(scenario: &str, metrics: &Metrics) -> Result<Self, MetricsError> {
        let (_, stop) = watch::channel(false);
        Ok(Self::new(
            0,
            scenario.into(),
            ThinkTime::default(),
            OutcomeRecorder::new(metrics, None)?,
            stop,
        ))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn with_think_time(mut self, think_time: ThinkTime) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Completed iterations.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub(crate) fn complete_iteration(&mut self) {
        self.iterations += 1;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Uniform draw in `[0, 1)`.
    pub fn draw(&mut self) -> f64 {
        self.rng.gen()
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    pub fn record(&self, outcome: RequestOutcome) {
        self.recorder.record(outcome);
    }

    /// Whether the scheduler has asked this user to finish.
    pub fn is_stopping(&self) -> bool {
        *self.stop.borrow()
    }

    /// Sleep for `duration`, waking early if the user is asked to stop.
    /// Returns `false` when the pause was cut short.
    pub async fn pause(&mut self, duration: Duration) -> bool {
        if self.is_stopping() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = stopped(&mut self.stop) => false,
        }
    }

    /// Pause for a think time drawn from the scenario's range.
    pub async fn think(&mut self) -> bool {
        let duration = self.think_time.sample(&mut self.rng);
        self.pause(duration).await
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            // NOTE: Sender gone without a stop signal, so no stop will ever come.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> (VirtualUser, watch::Sender<bool>) {
        let metrics = Metrics::new();
        let (tx, rx) = watch::channel(false);
        let user = VirtualUser::new(
            7,
            "smoke".into(),
            ThinkTime::new(Duration::from_secs(1), Duration::from_secs(3)),
            OutcomeRecorder::new(&metrics, None).unwrap(),
            rx,
        );
        (user, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn pause_runs_to_completion() {
        let (mut user, _tx) = user();
        let start = tokio::time::Instant::now();
        assert!(user.pause(Duration::from_secs(2)).await);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_cuts_pause_short() {
        let (mut user, tx) = user();
        let start = tokio::time::Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(true).unwrap();
        });

        assert!(!user.pause(Duration::from_secs(10)).await);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert!(user.is_stopping());
        assert!(!user.think().await);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_user_thinks_within_range() {
        let metrics = Metrics::new();
        let mut user = VirtualUser::detached("probe", &metrics).unwrap().with_seed(3);
        let start = tokio::time::Instant::now();
        assert!(user.think().await);
        let slept = start.elapsed();
        assert!(slept >= Duration::from_secs(1) && slept < Duration::from_secs(3));
    }

    #[test]
    fn draws_are_unit_interval() {
        let (user, _tx) = user();
        let mut user = user.with_seed(11);
        for _ in 0..1000 {
            let d = user.draw();
            assert!((0. ..1.).contains(&d));
        }
    }
}
