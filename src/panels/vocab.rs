//! Display vocabulary for run and book statuses.
//!
//! Both matches are exhaustive; an unrecognised status renders with the
//! pending style.

use console::{style, StyledObject};

use crate::models::{BookState, RunStatus};

/// Color family for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Active,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub label: &'static str,
    pub icon: &'static str,
    pub tone: Tone,
}

impl StatusStyle {
    const fn new(label: &'static str, icon: &'static str, tone: Tone) -> Self {
        Self { label, icon, tone }
    }

    pub fn paint<D>(&self, text: D) -> StyledObject<D> {
        let styled = style(text);
        match self.tone {
            Tone::Neutral => styled.dim(),
            Tone::Active => styled.cyan(),
            Tone::Success => styled.green(),
            Tone::Warning => styled.yellow(),
            Tone::Danger => styled.red(),
        }
    }

    /// Icon and label, colored.
    pub fn badge(&self) -> String {
        self.paint(format!("{} {}", self.icon, self.label)).to_string()
    }
}

const RUN_PENDING: StatusStyle = StatusStyle::new("Pending", "○", Tone::Neutral);
const BOOK_PENDING: StatusStyle = StatusStyle::new("Pending", "○", Tone::Neutral);

pub fn run_status_style(status: RunStatus) -> StatusStyle {
    match status {
        RunStatus::Pending | RunStatus::Unknown => RUN_PENDING,
        RunStatus::Running => StatusStyle::new("Running", "▶", Tone::Active),
        RunStatus::Completed => StatusStyle::new("Completed", "✓", Tone::Success),
        RunStatus::Failed => StatusStyle::new("Failed", "✗", Tone::Danger),
        RunStatus::Cancelled => StatusStyle::new("Cancelled", "■", Tone::Warning),
    }
}

pub fn book_status_style(state: BookState) -> StatusStyle {
    match state {
        BookState::Pending | BookState::Unknown => BOOK_PENDING,
        BookState::Matching => StatusStyle::new("Matching", "◔", Tone::Active),
        BookState::Downloading => StatusStyle::new("Downloading", "↓", Tone::Active),
        BookState::Processing => StatusStyle::new("Processing", "◑", Tone::Active),
        BookState::Uploading => StatusStyle::new("Uploading", "↑", Tone::Active),
        BookState::Completed => StatusStyle::new("Completed", "✓", Tone::Success),
        BookState::Failed => StatusStyle::new("Failed", "✗", Tone::Danger),
        BookState::Skipped => StatusStyle::new("Skipped", "↷", Tone::Warning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookStatus;

    #[test]
    fn test_unknown_book_status_renders_as_pending() {
        let book: BookStatus = serde_json::from_value(serde_json::json!({
            "title": "Middlemarch",
            "author": "George Eliot",
            "status": "unexpected-value"
        }))
        .unwrap();
        assert_eq!(book_status_style(book.status), book_status_style(BookState::Pending));
    }

    #[test]
    fn test_unknown_run_status_renders_as_pending() {
        assert_eq!(run_status_style(RunStatus::Unknown), run_status_style(RunStatus::Pending));
    }

    #[test]
    fn test_terminal_tones() {
        assert_eq!(run_status_style(RunStatus::Completed).tone, Tone::Success);
        assert_eq!(run_status_style(RunStatus::Failed).tone, Tone::Danger);
        assert_eq!(book_status_style(BookState::Skipped).tone, Tone::Warning);
        assert_eq!(book_status_style(BookState::Uploading).tone, Tone::Active);
    }
}
