use std::path::PathBuf;
use thiserror::Error;
use vidload::driver::{DriverError, WorkloadError};
use vidload::metrics::SummaryError;
use vidload::scheduler::SchedulerError;
use vidload_core::{ConfigError, CredentialsError};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid plan: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Target is not usable: {0}")]
    Driver(#[from] DriverError),

    #[error("Failed to set up workload: {0}")]
    Workload(#[from] WorkloadError),

    #[error("Failed to schedule scenario: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("Failed to read plan file {}: {source}", path.display())]
    PlanFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plan file {}: {source}", path.display())]
    PlanParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
