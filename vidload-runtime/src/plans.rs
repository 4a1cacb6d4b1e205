//! Built-in capacity plans and plan loading.
use crate::RuntimeError;
use std::convert::Infallible;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use vidload_core::{
    Aggregation, Comparison, Credentials, Executor, Plan, PlanScenario, ScenarioConfig, Stage,
    Tag, ThinkTime, ThresholdExpr, WorkloadKind, UPLOAD_THINK_MAX, UPLOAD_THINK_MIN,
};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

const MINUTE: Duration = Duration::from_secs(60);

/// Where a plan comes from: one of the built-ins or a JSON file.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanSource {
    WebCapacity,
    UploadCapacity,
    File(PathBuf),
}

impl FromStr for PlanSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "web" | "web-capacity" => PlanSource::WebCapacity,
            "upload" | "upload-capacity" => PlanSource::UploadCapacity,
            path => PlanSource::File(PathBuf::from(path)),
        })
    }
}

impl PlanSource {
    pub async fn load(&self) -> Result<Plan, RuntimeError> {
        let plan = match self {
            PlanSource::WebCapacity => web_capacity(),
            PlanSource::UploadCapacity => upload_capacity(),
            PlanSource::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| RuntimeError::PlanFile {
                        path: path.clone(),
                        source,
                    })?;
                serde_json::from_str(&raw).map_err(|source| RuntimeError::PlanParse {
                    path: path.clone(),
                    source,
                })?
            }
        };
        debug!("Loaded plan {} with {} scenario(s)", plan.name, plan.scenarios.len());
        Ok(plan)
    }
}

/// Ramp to `peak` over a minute, hold for three, ramp down over a minute.
fn load_stage(name: &str, test_type: &str, peak: usize, start: Duration) -> PlanScenario {
    PlanScenario {
        config: ScenarioConfig {
            executor: Executor::ramping(
                0,
                &[
                    Stage::new(MINUTE, peak),
                    Stage::new(3 * MINUTE, peak),
                    Stage::new(MINUTE, 0),
                ],
            ),
            start_time: start,
            tag: Some(Tag::new("test_type", test_type)),
            ..ScenarioConfig::new(name)
        },
        workload: WorkloadKind::WebCapacity,
        users: vec![],
    }
}

fn expr(aggregation: Aggregation, comparison: Comparison, value: f64) -> ThresholdExpr {
    ThresholdExpr {
        aggregation,
        comparison,
        value,
    }
}

/// Web tier capacity: a 2 minute smoke test at 5 users, then back-to-back load stages
/// peaking at 50, 100 and 150 users. Runs 17 minutes.
pub fn web_capacity() -> Plan {
    let smoke = PlanScenario {
        config: ScenarioConfig {
            executor: Executor::constant(5, 2 * MINUTE),
            tag: Some(Tag::new("test_type", "smoke")),
            ..ScenarioConfig::new("smoke_test")
        },
        workload: WorkloadKind::WebCapacity,
        users: vec![],
    };

    Plan::new("web-capacity")
        .scenario(smoke)
        .scenario(load_stage("moderate_load", "moderate", 50, 2 * MINUTE))
        .scenario(load_stage("high_load", "high", 100, 7 * MINUTE))
        .scenario(load_stage("stress_test", "stress", 150, 12 * MINUTE))
        .threshold(
            "http_req_duration",
            expr(Aggregation::Percentile(95.), Comparison::Lt, 1000.),
        )
        .threshold("errors", expr(Aggregation::Rate, Comparison::Lt, 0.05))
        .threshold("http_req_failed", expr(Aggregation::Rate, Comparison::Lt, 0.05))
}

/// Upload path capacity: two users uploading continuously for 3 minutes.
pub fn upload_capacity() -> Plan {
    let upload = PlanScenario {
        config: ScenarioConfig {
            executor: Executor::constant(2, 3 * MINUTE),
            tag: Some(Tag::new("test_type", "upload_minimal")),
            think_time: ThinkTime::new(UPLOAD_THINK_MIN, UPLOAD_THINK_MAX),
            ..ScenarioConfig::new("upload_only")
        },
        workload: WorkloadKind::UploadCapacity,
        users: (1..=2)
            .map(|n| Credentials::new(&format!("test{n}@anb.com"), "Test123!"))
            .collect(),
    };

    Plan::new("upload-capacity")
        .scenario(upload)
        .threshold("upload_success", expr(Aggregation::Rate, Comparison::Gt, 0.70))
        .threshold(
            "upload_time_ms",
            expr(Aggregation::Percentile(95.), Comparison::Lt, 15000.),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_plans_are_valid() {
        let web = web_capacity();
        assert_eq!(web.validate(), Ok(()));
        assert_eq!(web.end_offset(), 17 * MINUTE);
        assert_eq!(web.threshold_rules().len(), 3);
        assert_eq!(web.summary_file_name(), "web-capacity_summary.json");

        let stress = &web.scenarios[3].config;
        assert_eq!(stress.concurrency_at(12 * MINUTE), 0);
        assert_eq!(stress.concurrency_at(13 * MINUTE), 150);
        assert_eq!(stress.concurrency_at(17 * MINUTE), 0);

        let upload = upload_capacity();
        assert_eq!(upload.validate(), Ok(()));
        assert_eq!(upload.end_offset(), 3 * MINUTE);
        assert_eq!(upload.scenarios[0].users.len(), 2);
        assert_eq!(upload.scenarios[0].config.think_time.min, UPLOAD_THINK_MIN);
    }

    #[test]
    fn builtin_thresholds_read_back() {
        let rules: Vec<String> = upload_capacity()
            .threshold_rules()
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(rules, ["upload_success rate>0.7", "upload_time_ms p(95)<15000"]);
    }

    #[test]
    fn plan_source_parses() {
        assert_eq!("web".parse::<PlanSource>(), Ok(PlanSource::WebCapacity));
        assert_eq!("upload-capacity".parse::<PlanSource>(), Ok(PlanSource::UploadCapacity));
        assert_eq!(
            "plans/soak.json".parse::<PlanSource>(),
            Ok(PlanSource::File(PathBuf::from("plans/soak.json")))
        );
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn builtin_plan_loads() {
        let plan = PlanSource::UploadCapacity.load().await.unwrap();
        assert_eq!(plan, upload_capacity());
        assert!(logs_contain("Loaded plan upload-capacity with 1 scenario(s)"));
    }

    #[tokio::test]
    async fn missing_plan_file_is_reported() {
        let source = PlanSource::File(PathBuf::from("/nonexistent/vidload-plan.json"));
        assert!(matches!(
            source.load().await,
            Err(RuntimeError::PlanFile { .. })
        ));
    }
}
