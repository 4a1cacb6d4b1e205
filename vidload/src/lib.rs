//! Capacity harness for a video-upload web service.
//!
//! A [`Scheduler`] realizes each [`Scenario`]'s concurrency profile by spawning and draining
//! [`VirtualUser`]s. Every user loops over a [`Workload`] iteration, the request driver records
//! one [`RequestOutcome`](vidload_core::RequestOutcome) per HTTP exchange into the run's
//! [`Metrics`], and a [`RunReport`] judges the finalized series against the plan's thresholds.
pub mod driver;
pub mod metrics;
pub mod multipart;
pub mod scenario;
pub mod scheduler;
pub mod workload;

pub use metrics::{Metrics, RunReport};
pub use scenario::Scenario;
pub use scheduler::{ScheduleReport, Scheduler};
pub use workload::{VirtualUser, Workload};

pub mod prelude {
    pub use crate::driver::{TargetClient, UploadCapacity, WebCapacity};
    pub use crate::metrics::{Metrics, RunReport};
    pub use crate::scenario::Scenario;
    pub use crate::scheduler::Scheduler;
    pub use crate::workload::{VirtualUser, Workload};
    pub use vidload_core::{CredentialPool, Credentials, Stage, ThresholdRule};
}
