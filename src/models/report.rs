//! Final run report returned by `GET /report`.
//!
//! The server only produces a report once a run is terminal, and it never
//! changes after that. Every section is optional on the wire and defaults
//! to empty so older servers still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Frozen summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    #[serde(default)]
    pub summary: ReportSummary,
    #[serde(default)]
    pub storage: StorageStats,
    /// Related-data statistics keyed by domain (e.g. "similar_books").
    #[serde(default)]
    pub related_data: BTreeMap<String, RelatedDataStats>,
    #[serde(default)]
    pub health: HealthCheck,
    #[serde(default)]
    pub failures: Vec<ReportFailure>,
    /// API endpoint the run imported into.
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    #[serde(default)]
    pub books_uploaded: u64,
    #[serde(default)]
    pub chapters_uploaded: u64,
    #[serde(default)]
    pub bytes_uploaded: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedDataStats {
    #[serde(default)]
    pub computed: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Named boolean checks, true when passing.
    #[serde(default)]
    pub checks: BTreeMap<String, bool>,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl HealthCheck {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty() && self.checks.values().all(|passed| *passed)
    }

    pub fn failing_checks(&self) -> impl Iterator<Item = &str> {
        self.checks
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFailure {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, with = "super::string_or_number")]
    pub stage: Option<String>,
    #[serde(default)]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_decodes_full_shape() {
        let report: PipelineReport = serde_json::from_value(serde_json::json!({
            "summary": {"total": 3, "completed": 1, "skipped": 1, "failed": 1, "durationSeconds": 61.2},
            "storage": {"booksUploaded": 1, "chaptersUploaded": 30, "bytesUploaded": 2048},
            "relatedData": {
                "similar_books": {"computed": 1, "skipped": 0, "failed": 0},
                "authors": {"computed": 1, "skipped": 1, "failed": 0}
            },
            "health": {"checks": {"chapters_present": true, "covers_present": false}, "issues": ["missing cover"]},
            "failures": [{"title": "Ulysses", "author": "James Joyce", "stage": 4, "error": "timeout"}],
            "apiEndpoint": "https://api.example-reader.com"
        }))
        .unwrap();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.storage.chapters_uploaded, 30);
        assert_eq!(report.related_data.len(), 2);
        assert!(!report.health.is_healthy());
        assert_eq!(
            report.health.failing_checks().collect::<Vec<_>>(),
            vec!["covers_present"]
        );
        assert_eq!(report.failures[0].stage.as_deref(), Some("4"));
    }

    #[test]
    fn test_report_tolerates_missing_sections() {
        let report: PipelineReport = serde_json::from_str("{}").unwrap();
        assert_eq!(report, PipelineReport::default());
        assert!(report.health.is_healthy());
    }
}
