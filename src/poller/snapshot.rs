//! Observable state published by the poller.

use crate::models::{BookStatus, PipelineReport, PipelineRunStatus};

/// Lifecycle of the poller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PollerState {
    /// No run subscribed; no requests are made.
    #[default]
    Idle,
    /// Status and books are refreshed every interval.
    Polling { run_id: String },
    /// The run finished. `report` is filled in once fetched and never refetched.
    Terminal {
        run_id: String,
        report: Option<PipelineReport>,
    },
}

impl PollerState {
    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Polling { run_id } | Self::Terminal { run_id, .. } => Some(run_id),
        }
    }
}

/// What observers see.
///
/// Each field is replaced wholesale by the fetch that owns it; a failed
/// fetch only touches its own error field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollerSnapshot {
    pub run_id: Option<String>,
    pub status: Option<PipelineRunStatus>,
    pub books: Vec<BookStatus>,
    /// At least one book list fetch succeeded.
    pub books_loaded: bool,
    pub report: Option<PipelineReport>,
    /// Waiting for the first status response.
    pub loading: bool,
    /// Last status fetch error, cleared by the next successful one.
    pub error: Option<String>,
    pub books_error: Option<String>,
    pub report_error: Option<String>,
    pub cancel_error: Option<String>,
}

impl PollerSnapshot {
    /// Fresh snapshot for a run that has not been fetched yet.
    pub fn for_run(run_id: &str) -> Self {
        Self {
            run_id: Some(run_id.to_string()),
            loading: true,
            ..Default::default()
        }
    }

    /// Snapshot assembled from one-off fetches, for non-live rendering.
    pub fn from_parts(
        run_id: &str,
        status: Option<PipelineRunStatus>,
        books: Option<Vec<BookStatus>>,
    ) -> Self {
        Self {
            run_id: Some(run_id.to_string()),
            status,
            books_loaded: books.is_some(),
            books: books.unwrap_or_default(),
            ..Default::default()
        }
    }

    /// A status snapshot has been received.
    pub fn has_data(&self) -> bool {
        self.status.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.is_terminal())
    }

    /// Terminal and the report is cached; nothing more will change.
    pub fn is_settled(&self) -> bool {
        self.is_terminal() && self.report.is_some()
    }
}
