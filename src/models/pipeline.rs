//! Pipeline run status models.
//!
//! These mirror the JSON returned by `/admin/pipeline/{id}/status` and
//! `/admin/pipeline/{id}/books`. A status is always a full snapshot of the
//! run; the client never merges one into another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::string_or_number;

/// Run-level status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Any value the server sends that is not listed above.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the run can make no further progress.
    ///
    /// `Unknown` is treated as live so monitoring keeps going.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-book status within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookState {
    #[default]
    Pending,
    Matching,
    Downloading,
    Processing,
    Uploading,
    Completed,
    Failed,
    Skipped,
    #[serde(other)]
    Unknown,
}

impl BookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matching => "matching",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }

    /// Book is done with, one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Book is actively being worked on.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Matching | Self::Downloading | Self::Processing | Self::Uploading
        )
    }

    /// Position in the per-book workflow, used for status sorting.
    pub fn workflow_rank(&self) -> u8 {
        match self {
            Self::Pending | Self::Unknown => 0,
            Self::Matching => 1,
            Self::Downloading => 2,
            Self::Processing => 3,
            Self::Uploading => 4,
            Self::Completed => 5,
            Self::Skipped => 6,
            Self::Failed => 7,
        }
    }
}

impl std::fmt::Display for BookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed, ordered stages of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    InputParsing = 1,
    EnvironmentPreparation = 2,
    BookMatching = 3,
    BookImport = 4,
    RelatedDataCalculation = 5,
    BooklistAssociation = 6,
    Validation = 7,
    ReportGeneration = 8,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::InputParsing,
        Stage::EnvironmentPreparation,
        Stage::BookMatching,
        Stage::BookImport,
        Stage::RelatedDataCalculation,
        Stage::BooklistAssociation,
        Stage::Validation,
        Stage::ReportGeneration,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Look up a stage by its 1-based ordinal.
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        let index = usize::try_from(ordinal.checked_sub(1)?).ok()?;
        Self::ALL.get(index).copied()
    }

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InputParsing => "Input Parsing",
            Self::EnvironmentPreparation => "Environment Preparation",
            Self::BookMatching => "Book Matching",
            Self::BookImport => "Book Import",
            Self::RelatedDataCalculation => "Related Data Calculation",
            Self::BooklistAssociation => "Booklist Association",
            Self::Validation => "Validation",
            Self::ReportGeneration => "Report Generation",
        }
    }
}

/// Run progress counters as computed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub failed: u64,
    /// Server-computed; displayed as-is, never recomputed locally.
    #[serde(default)]
    pub percentage: f64,
}

impl Progress {
    /// Books that have left the queue: completed + skipped + failed.
    pub fn processed(&self) -> u64 {
        self.completed
            .saturating_add(self.skipped)
            .saturating_add(self.failed)
    }

    /// Counts satisfy `completed + skipped + failed <= total`.
    pub fn is_consistent(&self) -> bool {
        self.processed() <= self.total
    }
}

/// The book the server is working on right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentBook {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub status: BookState,
}

/// Snapshot returned by `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub current_stage: Option<u32>,
    #[serde(default)]
    pub current_stage_name: Option<String>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub current_book: Option<CurrentBook>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub elapsed_seconds: f64,
}

impl PipelineRunStatus {
    /// Stage from the fixed table, if the ordinal is known.
    pub fn stage(&self) -> Option<Stage> {
        self.current_stage.and_then(Stage::from_ordinal)
    }

    /// Display label for the current stage.
    ///
    /// Falls back to the server-supplied name, then to a placeholder.
    pub fn stage_label(&self) -> String {
        if let Some(stage) = self.stage() {
            return stage.name().to_string();
        }
        match self.current_stage_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "Unknown stage".to_string(),
        }
    }

    /// Parsed start time, when the server sent an RFC 3339 timestamp.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.start_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One entry of `GET /books`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStatus {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub status: BookState,
    #[serde(default, with = "string_or_number")]
    pub book_id: Option<String>,
    #[serde(default)]
    pub chapters_count: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, with = "string_or_number")]
    pub stage: Option<String>,
}

/// Body of `GET /books`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookListResponse {
    #[serde(default)]
    pub books: Vec<BookStatus>,
}

/// Whether the status's current book appears in the book list with a
/// matching non-terminal status.
///
/// A run with no current book trivially matches.
pub fn current_book_matches(status: &PipelineRunStatus, books: &[BookStatus]) -> bool {
    let Some(current) = &status.current_book else {
        return true;
    };
    books
        .iter()
        .any(|book| book.title == current.title && !book.status.is_terminal())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_json() -> serde_json::Value {
        serde_json::json!({
            "id": "run-42",
            "status": "running",
            "currentStage": 3,
            "currentStageName": "matching books",
            "progress": {"total": 10, "completed": 6, "skipped": 1, "failed": 1, "percentage": 80},
            "currentBook": {"title": "Dune", "author": "Frank Herbert", "status": "matching"},
            "startTime": "2026-10-14T09:30:00Z",
            "elapsedSeconds": 192.5
        })
    }

    #[test]
    fn test_status_deserializes_wire_shape() {
        let status: PipelineRunStatus = serde_json::from_value(status_json()).unwrap();
        assert_eq!(status.id, "run-42");
        assert_eq!(status.status, RunStatus::Running);
        assert_eq!(status.stage(), Some(Stage::BookMatching));
        assert_eq!(status.progress.processed(), 8);
        assert_eq!(status.progress.percentage, 80.0);
        assert_eq!(
            status.current_book.as_ref().map(|b| b.status),
            Some(BookState::Matching)
        );
        assert!(status.started_at().is_some());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let run: RunStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(run, RunStatus::Unknown);
        assert!(!run.is_terminal());

        let book: BookStatus = serde_json::from_value(serde_json::json!({
            "title": "Emma",
            "status": "unexpected-value"
        }))
        .unwrap();
        assert_eq!(book.status, BookState::Unknown);
        assert_eq!(book.author, "");
    }

    #[test]
    fn test_terminal_run_statuses() {
        for status in [RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
        for status in [RunStatus::Pending, RunStatus::Running] {
            assert!(!status.is_terminal(), "{status} should not be terminal");
        }
    }

    #[test]
    fn test_stage_table() {
        assert_eq!(Stage::COUNT, 8);
        assert_eq!(Stage::from_ordinal(1), Some(Stage::InputParsing));
        assert_eq!(Stage::from_ordinal(8), Some(Stage::ReportGeneration));
        assert_eq!(Stage::from_ordinal(0), None);
        assert_eq!(Stage::from_ordinal(9), None);
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.ordinal() as usize, i + 1);
        }
    }

    #[test]
    fn test_stage_label_fallbacks() {
        let mut status: PipelineRunStatus = serde_json::from_value(status_json()).unwrap();
        assert_eq!(status.stage_label(), "Book Matching");

        status.current_stage = Some(12);
        assert_eq!(status.stage_label(), "matching books");

        status.current_stage_name = None;
        assert_eq!(status.stage_label(), "Unknown stage");
    }

    #[test]
    fn test_book_id_accepts_numbers() {
        let book: BookStatus = serde_json::from_value(serde_json::json!({
            "title": "Persuasion",
            "author": "Jane Austen",
            "status": "completed",
            "bookId": 1817,
            "chaptersCount": 24,
            "stage": 4
        }))
        .unwrap();
        assert_eq!(book.book_id.as_deref(), Some("1817"));
        assert_eq!(book.stage.as_deref(), Some("4"));
        assert_eq!(book.chapters_count, Some(24));
    }

    #[test]
    fn test_current_book_matches() {
        let status: PipelineRunStatus = serde_json::from_value(status_json()).unwrap();
        let mut books = vec![BookStatus {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            status: BookState::Matching,
            book_id: None,
            chapters_count: None,
            error: None,
            stage: None,
        }];
        assert!(current_book_matches(&status, &books));

        books[0].status = BookState::Completed;
        assert!(!current_book_matches(&status, &books));
        assert!(!current_book_matches(&status, &[]));
    }

    #[test]
    fn test_progress_consistency() {
        let progress = Progress {
            total: 3,
            completed: 2,
            skipped: 1,
            failed: 1,
            percentage: 100.0,
        };
        assert_eq!(progress.processed(), 4);
        assert!(!progress.is_consistent());
    }
}
