mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use mock_service::MockState;
    use std::time::Duration;
    use vidload_core::{
        Executor, Plan, PlanScenario, ScenarioConfig, ThinkTime, ThresholdExpr, WorkloadKind,
    };
    use vidload_runtime::{execute, plans::PlanSource, VidloadRuntime};

    fn quick_web_plan(vus: usize, secs: u64) -> Plan {
        let scenario = PlanScenario {
            config: ScenarioConfig {
                executor: Executor::constant(vus, Duration::from_secs(secs)),
                think_time: ThinkTime::new(Duration::from_millis(10), Duration::from_millis(50)),
                ..ScenarioConfig::new("smoke_test")
            },
            workload: WorkloadKind::WebCapacity,
            users: vec![],
        };
        Plan::new("quick-web")
            .scenario(scenario)
            .threshold("http_req_duration", "p(95)<1000".parse::<ThresholdExpr>().unwrap())
            .threshold("errors", "rate<0.05".parse::<ThresholdExpr>().unwrap())
            .threshold("iterations", "count>10".parse::<ThresholdExpr>().unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(20_000)]
    async fn healthy_service_passes() {
        let client = mock(MockState::new()).await.unwrap();
        let report = execute(&quick_web_plan(3, 2), &client, None).await.unwrap();

        assert!(report.passed(), "{report}");
        assert_eq!(report.vus_max, 3);
        assert!(report.metrics.contains_key("http_reqs"));
        assert!(report.metrics.contains_key("successful_requests"));
        assert!(report.thresholds.iter().all(|t| t.observed.is_some()));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(20_000)]
    async fn overloaded_service_fails_thresholds() {
        let client = mock(MockState::new().with_rate_limit(5)).await.unwrap();
        let report = execute(&quick_web_plan(4, 2), &client, None).await.unwrap();

        assert!(!report.passed());
        assert!(report.failed_thresholds().any(|t| t.metric == "errors"));
        assert!(report.to_string().contains("result: FAILED"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(20_000)]
    async fn runtime_loads_plan_file_and_writes_summary() {
        init();
        let addr = mock_service::spawn(MockState::new()).await.unwrap();

        let dir = std::env::temp_dir().join(format!("vidload-run-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let plan_path = dir.join("plan.json");
        std::fs::write(
            &plan_path,
            r#"{
                "name": "file plan",
                "scenarios": [{
                    "name": "smoke_test",
                    "executor": "ramping-vus",
                    "stages": [
                        { "duration": "1s", "target": 2 },
                        { "duration": "1s", "target": 0 }
                    ],
                    "think_time": { "min": "10ms", "max": "20ms" },
                    "tag": { "key": "test_type", "value": "smoke" },
                    "workload": "web-capacity"
                }],
                "thresholds": { "http_req_failed{test_type:smoke}": ["rate<0.05"] }
            }"#,
        )
        .unwrap();

        let report = VidloadRuntime::new()
            .base_url(&format!("http://{addr}"))
            .plan(PlanSource::File(plan_path))
            .results_dir(dir.clone())
            .run()
            .await
            .unwrap();
        assert!(report.passed(), "{report}");

        let summary: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join("file_plan_summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["plan"], "file plan");
        assert_eq!(summary["passed"], true);
        assert!(summary["metrics"]["http_reqs{test_type:smoke}"]["values"]["count"]
            .as_u64()
            .is_some_and(|n| n > 0));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn malformed_base_url_is_rejected_up_front() {
        let err = VidloadRuntime::new()
            .base_url("localhost:8000")
            .write_summary(false)
            .run()
            .await;
        assert!(err.is_err());
    }
}
