//! Pipeline run reports.

use crate::core::{ExecutionStatus, StepExecutionInfo};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;
use uuid::Uuid;

/// Summary of one pipeline run that did not fail.
///
/// Failed runs surface as errors instead; their summary is still logged and
/// emitted to the event sink.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// The pipeline name.
    pub pipeline: String,
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Overall status of the run.
    pub status: ExecutionStatus,
    /// Total run time, compensation included.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Step records, newest first.
    pub steps: Vec<StepExecutionInfo>,
}

impl PipelineReport {
    /// Returns true if every applicable step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if a step stopped the pipeline early.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.status.is_skipped()
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// Returns the record for the step at `index`, if it was recorded.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<&StepExecutionInfo> {
        self.steps.iter().find(|record| record.index == index)
    }

    /// Returns the records in execution order, oldest first.
    pub fn chronological(&self) -> impl Iterator<Item = &StepExecutionInfo> {
        self.steps.iter().rev()
    }

    /// Renders the step records as one comma separated line, newest first.
    #[must_use]
    pub fn steps_info(&self) -> String {
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Builds the payload of the `pipeline.completed` event.
    #[must_use]
    pub fn to_event_payload(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> PipelineReport {
        PipelineReport {
            pipeline: "checkout".to_string(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            status: ExecutionStatus::Skipped,
            elapsed: Duration::from_millis(40),
            steps: vec![
                StepExecutionInfo::skipped(2, "ship"),
                StepExecutionInfo::new(1, "charge", Duration::from_millis(30), ExecutionStatus::Skipped),
                StepExecutionInfo::new(0, "reserve", Duration::from_millis(10), ExecutionStatus::Success),
            ],
        }
    }

    #[test]
    fn test_report_status_helpers() {
        let report = sample_report();
        assert!(report.is_stopped());
        assert!(!report.is_success());
        assert_eq!(report.elapsed_ms(), 40);
    }

    #[test]
    fn test_report_record_lookup() {
        let report = sample_report();
        assert_eq!(report.record(0).map(|r| r.step.as_str()), Some("reserve"));
        assert!(report.record(7).is_none());

        let order: Vec<_> = report.chronological().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_steps_info() {
        let report = sample_report();
        assert_eq!(
            report.steps_info(),
            "{step=ship, execution_time_ms=0, status=skipped},\
             {step=charge, execution_time_ms=30, status=skipped},\
             {step=reserve, execution_time_ms=10, status=success}"
        );
    }

    #[test]
    fn test_event_payload() {
        let report = sample_report();
        let payload = report.to_event_payload().unwrap();
        assert_eq!(payload["pipeline"], "checkout");
        assert_eq!(payload["status"], "skipped");
        assert_eq!(payload["elapsed_ms"], 40);
        assert_eq!(payload["steps"].as_array().map(Vec::len), Some(3));
        assert_eq!(payload["run_id"], report.run_id.to_string());
    }
}
