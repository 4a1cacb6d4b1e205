use crate::{ConfigError, Credentials, ScenarioConfig, ThresholdExpr, ThresholdRule};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// Which request mix a scenario's virtual users execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadKind {
    /// Light read traffic with an occasional login + authenticated listing.
    WebCapacity,
    /// Login, upload a synthetic video, then read back its processing status.
    UploadCapacity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanScenario {
    #[serde(flatten)]
    pub config: ScenarioConfig,
    pub workload: WorkloadKind,
    /// Accounts this scenario logs in with. Empty means the provisioned defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Credentials>,
}

/// A complete capacity run: scenarios sharing one run start, plus the thresholds that judge it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub scenarios: Vec<PlanScenario>,
    #[serde_as(as = "BTreeMap<_, Vec<DisplayFromStr>>")]
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<ThresholdExpr>>,
    /// Where the JSON summary goes unless the command line says otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
}

impl Plan {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scenarios: vec![],
            thresholds: BTreeMap::new(),
            results_dir: None,
        }
    }

    pub fn scenario(mut self, scenario: PlanScenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn threshold(mut self, metric: &str, expr: ThresholdExpr) -> Self {
        self.thresholds
            .entry(metric.to_string())
            .or_default()
            .push(expr);
        self
    }

    pub fn threshold_rules(&self) -> Vec<ThresholdRule> {
        self.thresholds
            .iter()
            .flat_map(|(metric, exprs)| {
                exprs.iter().map(|expr| ThresholdRule {
                    metric: metric.clone(),
                    expr: expr.clone(),
                })
            })
            .collect()
    }

    /// Offset from the run start at which the last scenario completes.
    pub fn end_offset(&self) -> Duration {
        self.scenarios
            .iter()
            .map(|s| s.config.end_offset())
            .max()
            .unwrap_or_default()
    }

    /// File name of the machine-readable summary for this plan.
    pub fn summary_file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{stem}_summary.json")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::EmptyPlan(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.config.validate()?;
            if !seen.insert(scenario.config.name.as_str()) {
                return Err(ConfigError::DuplicateScenario(scenario.config.name.clone()));
            }
        }
        Ok(())
    }
}
