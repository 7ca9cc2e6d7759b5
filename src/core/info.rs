//! Value object describing one remote job instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed status vocabulary for a remote execution.
///
/// Backends fold their own vocabularies into these four states via
/// [`ExecutionStatus::from_vendor`]; unstable/cancelled flavors count as
/// `Failed`. `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    NotStarted,
    InProgress,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::NotStarted => "NOT_STARTED",
            ExecutionStatus::InProgress => "IN_PROGRESS",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }

    /// Fold a vendor status string into the closed enumeration.
    pub fn from_vendor(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "created" | "pending" | "scheduled" | "waiting_for_resource" | "preparing" => {
                ExecutionStatus::NotStarted
            }
            "running" | "in_progress" => ExecutionStatus::InProgress,
            "success" | "succeeded" => ExecutionStatus::Success,
            _ => ExecutionStatus::Failed,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one remote execution, created by a backend client right
/// after triggering or reusing a job and refreshed only by re-querying the
/// backend. The orchestration core treats it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub id: String,
    pub url: String,
    pub name: String,
    pub status: ExecutionStatus,
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
}

impl ExecutionInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: String::new(),
            name: String::new(),
            status: ExecutionStatus::NotStarted,
            time_start: None,
            time_end: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// ISO-8601 start timestamp for output params; empty when unknown.
    pub fn date_str(&self) -> String {
        self.time_start
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default()
    }

    /// Elapsed time as `HH:MM:SS`. While the job is still running the
    /// current time stands in for the end timestamp; empty when the start
    /// timestamp is unknown.
    pub fn duration_str(&self) -> String {
        let Some(start) = self.time_start else {
            return String::new();
        };
        let end = self.time_end.unwrap_or_else(Utc::now);
        let seconds = (end - start).num_seconds().max(0);
        format!(
            "{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn terminality_matches_the_closed_vocabulary() {
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::NotStarted.is_terminal());
        assert!(!ExecutionStatus::InProgress.is_terminal());
    }

    #[test]
    fn vendor_statuses_fold_into_four_states() {
        assert_eq!(ExecutionStatus::from_vendor("pending"), ExecutionStatus::NotStarted);
        assert_eq!(ExecutionStatus::from_vendor("running"), ExecutionStatus::InProgress);
        assert_eq!(ExecutionStatus::from_vendor("success"), ExecutionStatus::Success);
        assert_eq!(ExecutionStatus::from_vendor("canceled"), ExecutionStatus::Failed);
        assert_eq!(ExecutionStatus::from_vendor("unstable"), ExecutionStatus::Failed);
    }

    #[test]
    fn duration_uses_start_and_end_timestamps() {
        let mut info = ExecutionInfo::new("1");
        assert_eq!(info.duration_str(), "");

        info.time_start = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        info.time_end = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 1, 30).unwrap());
        assert_eq!(info.duration_str(), "00:01:30");
        assert_eq!(info.date_str(), "2023-01-01T00:00:00Z");
    }
}
