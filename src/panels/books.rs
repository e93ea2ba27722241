//! Per-book list with local filtering and sorting.

use std::cmp::Ordering;

use console::style;
use serde::{Deserialize, Serialize};

use super::vocab::book_status_style;
use crate::models::{BookState, BookStatus};
use crate::utils::truncate_string;

const TITLE_WIDTH: usize = 40;
const AUTHOR_WIDTH: usize = 24;

/// Which books to show.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BookFilter {
    #[default]
    All,
    /// Not yet finished (pending or in progress).
    Active,
    Pending,
    Completed,
    Failed,
    Skipped,
}

impl BookFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn matches(&self, state: BookState) -> bool {
        match self {
            Self::All => true,
            Self::Active => !state.is_terminal(),
            Self::Pending => matches!(state, BookState::Pending | BookState::Unknown),
            Self::Completed => state == BookState::Completed,
            Self::Failed => state == BookState::Failed,
            Self::Skipped => state == BookState::Skipped,
        }
    }
}

/// Display order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BookSort {
    /// Order as returned by the server.
    #[default]
    Server,
    Title,
    Author,
    Status,
}

impl BookSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Title => "title",
            Self::Author => "author",
            Self::Status => "status",
        }
    }

    fn compare(&self, a: &BookStatus, b: &BookStatus) -> Ordering {
        match self {
            Self::Server => Ordering::Equal,
            Self::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            Self::Author => a
                .author
                .to_lowercase()
                .cmp(&b.author.to_lowercase())
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
            Self::Status => a.status.workflow_rank().cmp(&b.status.workflow_rank()),
        }
    }
}

/// Per-status tallies over the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BookCounts {
    pub fn tally(books: &[BookStatus]) -> Self {
        let mut counts = Self {
            total: books.len(),
            ..Default::default()
        };
        for book in books {
            match book.status {
                BookState::Pending | BookState::Unknown => counts.pending += 1,
                BookState::Matching
                | BookState::Downloading
                | BookState::Processing
                | BookState::Uploading => counts.in_progress += 1,
                BookState::Completed => counts.completed += 1,
                BookState::Failed => counts.failed += 1,
                BookState::Skipped => counts.skipped += 1,
            }
        }
        counts
    }
}

/// Local view state for the book list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookListView {
    pub filter: BookFilter,
    pub sort: BookSort,
    /// Maximum rows rendered; `None` shows all.
    pub limit: Option<usize>,
}

impl BookListView {
    pub fn new(filter: BookFilter, sort: BookSort) -> Self {
        Self {
            filter,
            sort,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter, then stable-sort. Server order is kept among equal keys.
    pub fn apply<'a>(&self, books: &'a [BookStatus]) -> Vec<&'a BookStatus> {
        let mut visible: Vec<&BookStatus> = books
            .iter()
            .filter(|book| self.filter.matches(book.status))
            .collect();
        if self.sort != BookSort::Server {
            visible.sort_by(|a, b| self.sort.compare(a, b));
        }
        visible
    }

    /// [`apply`](Self::apply), then cut to `limit`.
    pub fn shown<'a>(&self, books: &'a [BookStatus]) -> Vec<&'a BookStatus> {
        let mut visible = self.apply(books);
        if let Some(limit) = self.limit {
            visible.truncate(limit);
        }
        visible
    }

    /// Tallies over the unfiltered list.
    pub fn counts(&self, books: &[BookStatus]) -> BookCounts {
        BookCounts::tally(books)
    }

    pub fn render(&self, books: &[BookStatus]) -> String {
        let visible = self.apply(books);
        let counts = self.counts(books);

        let mut out = format!(
            "{} ({} of {} · filter: {} · sort: {})\n",
            style("BOOKS").cyan().bold(),
            visible.len(),
            counts.total,
            self.filter.as_str(),
            self.sort.as_str()
        );
        out.push_str(&format!(
            "  {} pending · {} in progress · {} completed · {} skipped · {} failed\n",
            counts.pending, counts.in_progress, counts.completed, counts.skipped, counts.failed
        ));

        if visible.is_empty() {
            out.push_str(&format!("  {}\n", style("No books match this filter").dim()));
            return out;
        }

        let shown = self.limit.unwrap_or(visible.len()).min(visible.len());
        for book in &visible[..shown] {
            out.push_str(&render_book_line(book));
        }
        if shown < visible.len() {
            out.push_str(&format!(
                "  {}\n",
                style(format!("… {} more", visible.len() - shown)).dim()
            ));
        }
        out
    }
}

fn render_book_line(book: &BookStatus) -> String {
    let status = book_status_style(book.status);
    let mut line = format!(
        "  {} {:<title_w$} {:<author_w$} {}",
        status.paint(status.icon),
        truncate_string(&book.title, TITLE_WIDTH),
        style(truncate_string(&book.author, AUTHOR_WIDTH)).dim(),
        status.paint(status.label),
        title_w = TITLE_WIDTH,
        author_w = AUTHOR_WIDTH,
    );
    if let Some(chapters) = book.chapters_count {
        line.push_str(&format!("  {} ch", chapters));
    }
    if let Some(error) = &book.error {
        let stage = book
            .stage
            .as_deref()
            .map(|s| format!(" [stage {}]", s))
            .unwrap_or_default();
        line.push_str(&format!("\n      {}{}", style(error).red(), stage));
    }
    line.push('\n');
    line
}
