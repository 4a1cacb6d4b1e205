//! Scenario builder.
use std::time::Duration;
use vidload_core::{Executor, ScenarioConfig, Stage, Tag, ThinkTime};

/// A named concurrency profile bound to the workload its virtual users run.
///
/// ```ignore
/// use vidload::prelude::*;
/// use std::time::Duration;
///
/// let smoke = Scenario::new("smoke_test", WebCapacity::new(client, users, &metrics)?)
///     .constant(5, Duration::from_secs(120))
///     .tag("test_type", "smoke");
///
/// let moderate = Scenario::new("moderate_load", WebCapacity::new(client, users, &metrics)?)
///     .ramping(0, &[
///         Stage::new(Duration::from_secs(60), 50),
///         Stage::new(Duration::from_secs(180), 50),
///         Stage::new(Duration::from_secs(60), 0),
///     ])
///     .start_time(Duration::from_secs(120));
/// ```
pub struct Scenario<W> {
    workload: W,
    config: ScenarioConfig,
}

impl<W> Scenario<W> {
    pub fn new(name: &str, workload: W) -> Self {
        Self {
            workload,
            config: ScenarioConfig::new(name),
        }
    }

    /// Hold `vus` users for `duration`.
    pub fn constant(mut self, vus: usize, duration: Duration) -> Self {
        self.config.executor = Executor::constant(vus, duration);
        self
    }

    /// Start at `start_vus` and move linearly toward each stage's target over its duration.
    pub fn ramping(mut self, start_vus: usize, stages: &[Stage]) -> Self {
        self.config.executor = Executor::ramping(start_vus, stages);
        self
    }

    /// Offset from the run start at which this scenario begins.
    pub fn start_time(mut self, offset: Duration) -> Self {
        self.config.start_time = offset;
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.config.tag = Some(Tag::new(key, value));
        self
    }

    pub fn think_time(mut self, min: Duration, max: Duration) -> Self {
        self.config.think_time = ThinkTime::new(min, max);
        self
    }

    /// Replace the whole profile, e.g. with one read from a plan file.
    pub fn with_config(mut self, config: ScenarioConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn workload(&self) -> &W {
        &self.workload
    }

    pub(crate) fn into_parts(self) -> (ScenarioConfig, W) {
        (self.config, self.workload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_profile() {
        let scenario = Scenario::new("high_load", ())
            .ramping(
                0,
                &[
                    Stage::new(Duration::from_secs(60), 100),
                    Stage::new(Duration::from_secs(180), 100),
                    Stage::new(Duration::from_secs(60), 0),
                ],
            )
            .start_time(Duration::from_secs(420))
            .tag("test_type", "high")
            .think_time(Duration::from_secs(1), Duration::from_secs(3));

        let config = scenario.config();
        assert_eq!(config.name, "high_load");
        assert_eq!(config.end_offset(), Duration::from_secs(720));
        assert_eq!(config.executor.max_concurrency(), 100);
        assert_eq!(config.tag.as_ref().unwrap().to_string(), "test_type:high");
        assert_eq!(config.concurrency_at(Duration::from_secs(400)), 0);
        assert_eq!(config.concurrency_at(Duration::from_secs(450)), 50);
    }
}
