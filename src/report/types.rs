use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runner::state::{CommandResultList, CommandResultReport, OutcomeReport};

/// Serializable record of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub name: String,
    pub outcome: OutcomeReport,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub results: Vec<CommandResultReport>,
}

/// Outcome counts over every executed command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub executed: usize,
    pub success: usize,
    pub warning: usize,
    pub error: usize,
    pub aborted: usize,
}

impl RunSummary {
    pub fn from_results(results: &CommandResultList) -> Self {
        let mut summary = Self {
            executed: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.outcome().to_report() {
                OutcomeReport::Success => summary.success += 1,
                OutcomeReport::Warning { .. } => summary.warning += 1,
                OutcomeReport::Error { .. } => summary.error += 1,
                OutcomeReport::Aborted => summary.aborted += 1,
            }
        }
        summary
    }
}

impl RunReport {
    pub fn new(
        run_id: impl Into<String>,
        name: impl Into<String>,
        results: &CommandResultList,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let ended_at = ended_at.max(started_at);
        Self {
            run_id: run_id.into(),
            name: name.into(),
            outcome: results.aggregate().to_report(),
            summary: RunSummary::from_results(results),
            started_at,
            ended_at,
            duration_ms: (ended_at - started_at).num_milliseconds().max(0) as u64,
            results: results.to_report(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            OutcomeReport::Success | OutcomeReport::Warning { .. }
        )
    }
}
