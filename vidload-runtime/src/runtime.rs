//! Command line runtime.
//!
//! Loads a plan, builds one workload per scenario against the target, runs the scheduler and
//! judges the result.
use crate::plans::PlanSource;
use crate::RuntimeError;
use clap::Parser;
use std::path::PathBuf;
use vidload::driver::{TargetClient, UploadCapacity, WebCapacity};
use vidload::{Metrics, RunReport, Scenario, Scheduler};
use vidload_core::{
    CredentialPool, Credentials, Plan, WorkloadKind, DEFAULT_BASE_URL, DEFAULT_RESULTS_DIR,
};
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Capacity tests for the video upload service")]
struct VidloadCli {
    /// Root URL of the service under test.
    #[arg(short, long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// `web`, `upload`, or the path of a JSON plan.
    #[arg(short, long, default_value = "web")]
    plan: PlanSource,

    /// Directory receiving the JSON summary [default: the plan's, else `results`].
    #[arg(short, long)]
    results_dir: Option<PathBuf>,

    /// Skip writing the JSON summary.
    #[arg(long)]
    no_summary: bool,

    /// Credential as `email:password`; repeat to build a pool. Replaces every scenario's users.
    #[arg(short, long = "user")]
    users: Vec<Credentials>,
}

/// Default vidload runtime.
///
/// # Example
///
/// ```ignore
/// use vidload_runtime::VidloadRuntime;
///
/// #[tokio::main]
/// async fn main() -> Result<(), vidload_runtime::RuntimeError> {
///     let report = VidloadRuntime::new().with_args().run().await?;
///     println!("{report}");
///     Ok(())
/// }
/// ```
pub struct VidloadRuntime {
    base_url: String,
    plan: PlanSource,
    results_dir: Option<PathBuf>,
    write_summary: bool,
    users: Vec<Credentials>,
}

impl Default for VidloadRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl VidloadRuntime {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            plan: PlanSource::WebCapacity,
            results_dir: None,
            write_summary: true,
            users: vec![],
        }
    }

    /// Use the default CLI arguments.
    ///
    /// `-b`, `--base-url` (or `BASE_URL`) for the target, `-p`, `--plan` for the plan,
    /// `-r`, `--results-dir` and `--no-summary` for the JSON summary, and repeated
    /// `-u`, `--user email:password` for the credential pool.
    ///
    /// # Example
    /// ```ignore
    /// $ BASE_URL=http://staging:8000 vidload --plan upload
    /// $ vidload -p plans/soak.json -u qa1@anb.com:secret -u qa2@anb.com:secret
    /// ```
    pub fn with_args(mut self) -> Self {
        let args = VidloadCli::parse();
        self.base_url = args.base_url;
        self.plan = args.plan;
        self.results_dir = args.results_dir;
        self.write_summary = !args.no_summary;
        self.users = args.users;
        self
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn plan(mut self, plan: PlanSource) -> Self {
        self.plan = plan;
        self
    }

    /// Overrides the plan's results directory.
    pub fn results_dir(mut self, dir: PathBuf) -> Self {
        self.results_dir = Some(dir);
        self
    }

    pub fn write_summary(mut self, write: bool) -> Self {
        self.write_summary = write;
        self
    }

    pub fn users(mut self, users: &[Credentials]) -> Self {
        self.users = users.to_vec();
        self
    }

    #[instrument(name = "vidload", skip_all, fields(base_url = %self.base_url))]
    pub async fn run(self) -> Result<RunReport, RuntimeError> {
        let plan = self.plan.load().await?;
        let client = TargetClient::new(&self.base_url)?;
        let users = if self.users.is_empty() {
            None
        } else {
            Some(CredentialPool::new(self.users)?)
        };

        let report = execute(&plan, &client, users.as_ref()).await?;
        if self.write_summary {
            let dir = self
                .results_dir
                .or_else(|| plan.results_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));
            report.write_json(&dir, &plan.summary_file_name())?;
        }
        Ok(report)
    }
}

/// Run `plan` against `client`. `users` overrides every scenario's own credentials.
#[instrument(name = "plan", skip_all, fields(name = %plan.name))]
pub async fn execute(
    plan: &Plan,
    client: &TargetClient,
    users: Option<&CredentialPool>,
) -> Result<RunReport, RuntimeError> {
    plan.validate()?;

    let metrics = Metrics::new();
    let mut scheduler = Scheduler::new(metrics.clone());
    for entry in &plan.scenarios {
        let pool = match users {
            Some(pool) => pool.clone(),
            None if entry.users.is_empty() => CredentialPool::default(),
            None => CredentialPool::new(entry.users.clone())?,
        };

        let name = &entry.config.name;
        match entry.workload {
            WorkloadKind::WebCapacity => {
                let workload = WebCapacity::new(client.clone(), pool, &metrics)?;
                scheduler.add(Scenario::new(name, workload).with_config(entry.config.clone()))?;
            }
            WorkloadKind::UploadCapacity => {
                let workload = UploadCapacity::new(client.clone(), pool, &metrics)?;
                scheduler.add(Scenario::new(name, workload).with_config(entry.config.clone()))?;
            }
        }
    }

    info!(
        "Running plan {} against {} for {}",
        plan.name,
        client.base_url(),
        humantime::format_duration(plan.end_offset())
    );
    let schedule = scheduler.await;
    let snapshot = metrics.finalize(schedule.elapsed);
    let report = RunReport::new(&plan.name, &schedule, snapshot, &plan.threshold_rules());

    for failed in report.failed_thresholds() {
        warn!("Threshold crossed: {} {}", failed.metric, failed.expression);
    }
    Ok(report)
}
