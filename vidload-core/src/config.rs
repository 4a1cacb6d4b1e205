use crate::{DEFAULT_THINK_MAX, DEFAULT_THINK_MIN};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Scenario name must not be empty.")]
    EmptyName,

    #[error("Scenario `{0}` declares no stages.")]
    NoStages(String),

    #[error("Scenario `{0}` has a zero duration.")]
    ZeroDuration(String),

    #[error("Scenario `{name}` has a think time minimum ({min:?}) above its maximum ({max:?}).")]
    InvalidThinkTime {
        name: String,
        min: Duration,
        max: Duration,
    },

    #[error("Scenario `{0}` is declared more than once.")]
    DuplicateScenario(String),

    #[error("Plan `{0}` declares no scenarios.")]
    EmptyPlan(String),
}

/// One segment of a ramping profile: move linearly to `target` users over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// How a scenario's concurrency evolves over its own timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "executor")]
pub enum Executor {
    /// A fixed number of virtual users for a fixed duration.
    #[serde(rename = "constant-vus")]
    ConstantVus {
        vus: usize,
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },

    /// Piecewise-linear concurrency starting at `start_vus`.
    #[serde(rename = "ramping-vus")]
    RampingVus {
        #[serde(default)]
        start_vus: usize,
        stages: Vec<Stage>,
    },
}

impl Executor {
    pub fn constant(vus: usize, duration: Duration) -> Self {
        Self::ConstantVus { vus, duration }
    }

    pub fn ramping(start_vus: usize, stages: &[Stage]) -> Self {
        Self::RampingVus {
            start_vus,
            stages: stages.to_vec(),
        }
    }

    /// Total length of the executor's timeline.
    pub fn duration(&self) -> Duration {
        match self {
            Executor::ConstantVus { duration, .. } => *duration,
            Executor::RampingVus { stages, .. } => stages.iter().map(|s| s.duration).sum(),
        }
    }

    /// Interpolated target at `elapsed` into the timeline, `None` once the timeline is over.
    ///
    /// The end of a stage belongs to the next stage, so at every interior boundary this returns
    /// exactly the target declared by the stage that just finished.
    pub fn target_at(&self, elapsed: Duration) -> Option<f64> {
        match self {
            Executor::ConstantVus { vus, duration } => {
                (elapsed < *duration).then_some(*vus as f64)
            }
            Executor::RampingVus { start_vus, stages } => {
                let mut from = *start_vus as f64;
                let mut stage_start = Duration::ZERO;
                for stage in stages {
                    let stage_end = stage_start + stage.duration;
                    if elapsed < stage_end {
                        let progress = (elapsed - stage_start).as_secs_f64()
                            / stage.duration.as_secs_f64();
                        return Some(from + (stage.target as f64 - from) * progress);
                    }
                    from = stage.target as f64;
                    stage_start = stage_end;
                }
                None
            }
        }
    }

    /// Number of virtual users that should be running `elapsed` into the timeline.
    pub fn concurrency_at(&self, elapsed: Duration) -> usize {
        self.target_at(elapsed)
            .map(|target| target.floor().max(0.) as usize)
            .unwrap_or(0)
    }

    pub fn max_concurrency(&self) -> usize {
        match self {
            Executor::ConstantVus { vus, .. } => *vus,
            Executor::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, usize::max),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Executor::ConstantVus {
            vus: 1,
            duration: Duration::ZERO,
        }
    }
}

/// Uniform range a virtual user pauses for between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkTime {
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl ThinkTime {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..self.max)
        }
    }
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self::new(DEFAULT_THINK_MIN, DEFAULT_THINK_MAX)
    }
}

/// Label attached to every request of a scenario, written `key:value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(flatten)]
    pub executor: Executor,
    /// Offset from the shared run start at which this scenario's timeline begins.
    #[serde(default, with = "humantime_serde")]
    pub start_time: Duration,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub think_time: ThinkTime,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            executor: Executor::default(),
            start_time: Duration::ZERO,
            tag: None,
            think_time: ThinkTime::default(),
        }
    }

    /// Offset from the run start at which this scenario's last stage completes.
    pub fn end_offset(&self) -> Duration {
        self.start_time + self.executor.duration()
    }

    /// Desired concurrency `run_elapsed` after the shared run start.
    pub fn concurrency_at(&self, run_elapsed: Duration) -> usize {
        run_elapsed
            .checked_sub(self.start_time)
            .map(|elapsed| self.executor.concurrency_at(elapsed))
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        match &self.executor {
            Executor::RampingVus { stages, .. } if stages.is_empty() => {
                return Err(ConfigError::NoStages(self.name.clone()))
            }
            executor if executor.duration().is_zero() => {
                return Err(ConfigError::ZeroDuration(self.name.clone()))
            }
            _ => {}
        }

        if self.think_time.min > self.think_time.max {
            return Err(ConfigError::InvalidThinkTime {
                name: self.name.clone(),
                min: self.think_time.min,
                max: self.think_time.max,
            });
        }

        Ok(())
    }
}
