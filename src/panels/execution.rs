//! Execution panel: the live view of one pipeline run.

use console::style;
use tracing::debug;

use super::books::BookListView;
use super::progress::render_progress;
use super::vocab::{book_status_style, run_status_style};
use crate::models::{current_book_matches, PipelineRunStatus, Stage};
use crate::poller::PollerSnapshot;
use crate::utils::format_duration;

/// What the panel can show for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    /// Nothing subscribed.
    Idle,
    /// Subscribed, first response not in yet.
    Loading,
    /// An error and no data to fall back on.
    Unavailable { error: String },
    /// Data is present; `stale_error` is set when the latest fetch failed.
    Ready { stale_error: Option<String> },
}

impl PanelState {
    pub fn from_snapshot(snapshot: &PollerSnapshot) -> Self {
        if snapshot.run_id.is_none() {
            return Self::Idle;
        }
        match (&snapshot.status, &snapshot.error) {
            (Some(_), error) => Self::Ready {
                stale_error: error.clone(),
            },
            (None, Some(error)) => Self::Unavailable {
                error: error.clone(),
            },
            (None, None) if snapshot.loading => Self::Loading,
            (None, None) => Self::Idle,
        }
    }
}

/// How the caller can act on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Live view with key bindings.
    Keys,
    /// One-shot output; actions are separate commands.
    Commands,
}

/// Header line: run id, status badge, elapsed time.
pub fn render_status_summary(status: &PipelineRunStatus) -> String {
    let run_style = run_status_style(status.status);
    let mut line = format!(
        "{} {}  {}  elapsed {}",
        style("RUN").cyan().bold(),
        style(&status.id).bold(),
        run_style.badge(),
        format_duration(status.elapsed_seconds)
    );
    if let Some(started) = status.started_at() {
        line.push_str(&format!(
            "  started {}",
            started.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    line.push('\n');
    line
}

fn render_stage(status: &PipelineRunStatus) -> String {
    let label = status.stage_label();
    match status.current_stage {
        Some(n) => format!("Stage {}/{}: {}\n", n, Stage::COUNT, label),
        None => format!("Stage -/{}: {}\n", Stage::COUNT, label),
    }
}

pub fn render_execution(
    snapshot: &PollerSnapshot,
    view: &BookListView,
    interaction: Interaction,
) -> String {
    match PanelState::from_snapshot(snapshot) {
        PanelState::Idle => format!("{}\n", style("No pipeline run selected").dim()),
        PanelState::Loading => format!(
            "{} Loading run {}...\n",
            style("…").dim(),
            snapshot.run_id.as_deref().unwrap_or_default()
        ),
        PanelState::Unavailable { error } => {
            let hint = match interaction {
                Interaction::Keys => "press r to retry",
                Interaction::Commands => "rerun the command to retry",
            };
            format!(
                "{} Could not load run {}: {}\n  {}\n",
                style("✗").red(),
                snapshot.run_id.as_deref().unwrap_or_default(),
                error,
                style(hint).dim()
            )
        }
        PanelState::Ready { stale_error } => {
            render_ready(snapshot, view, interaction, stale_error.as_deref())
        }
    }
}

fn render_ready(
    snapshot: &PollerSnapshot,
    view: &BookListView,
    interaction: Interaction,
    stale_error: Option<&str>,
) -> String {
    let Some(status) = &snapshot.status else {
        return String::new();
    };

    let mut out = String::new();
    if let Some(error) = stale_error {
        out.push_str(&format!(
            "{} Last update failed: {} (showing previous data)\n",
            style("!").yellow(),
            error
        ));
    }
    out.push_str(&render_status_summary(status));
    out.push_str(&render_stage(status));

    if let Some(current) = &status.current_book {
        let book_style = book_status_style(current.status);
        out.push_str(&format!(
            "Current: {} by {}  {}",
            style(&current.title).bold(),
            current.author,
            book_style.badge()
        ));
        if snapshot.books_loaded && !current_book_matches(status, &snapshot.books) {
            debug!(run_id = %status.id, title = %current.title, "Current book not active in book list");
            out.push_str(&format!("  {}", style("(not in active book list)").dim()));
        }
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&render_progress(&status.progress));
    out.push('\n');

    if let Some(error) = &snapshot.books_error {
        out.push_str(&format!(
            "{} Book list update failed: {}\n",
            style("!").yellow(),
            error
        ));
    }
    if snapshot.books_loaded {
        out.push_str(&view.render(&snapshot.books));
    } else if snapshot.books_error.is_none() {
        out.push_str(&format!("{}\n", style("Loading books...").dim()));
    }

    if let Some(error) = &snapshot.cancel_error {
        out.push_str(&format!("\n{} Cancel failed: {}\n", style("✗").red(), error));
    }
    if let Some(error) = &snapshot.report_error {
        out.push_str(&format!(
            "\n{} Report not available yet: {}\n",
            style("!").yellow(),
            error
        ));
    }

    if interaction == Interaction::Keys {
        let hint = if status.is_terminal() {
            "r refresh · q quit"
        } else {
            "r refresh · c cancel run · q quit"
        };
        out.push_str(&format!("\n{}\n", style(hint).dim()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookState, BookStatus, CurrentBook, Progress, RunStatus};

    fn status(run_status: RunStatus) -> PipelineRunStatus {
        PipelineRunStatus {
            id: "run-42".to_string(),
            status: run_status,
            current_stage: Some(4),
            current_stage_name: None,
            progress: Progress {
                total: 10,
                completed: 6,
                skipped: 1,
                failed: 1,
                percentage: 80.0,
            },
            current_book: Some(CurrentBook {
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                status: BookState::Downloading,
            }),
            start_time: None,
            elapsed_seconds: 245.0,
        }
    }

    fn books() -> Vec<BookStatus> {
        vec![BookStatus {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            status: BookState::Downloading,
            book_id: Some("17".to_string()),
            chapters_count: None,
            error: None,
            stage: None,
        }]
    }

    fn ready(run_status: RunStatus) -> PollerSnapshot {
        PollerSnapshot::from_parts("run-42", Some(status(run_status)), Some(books()))
    }

    #[test]
    fn test_panel_states() {
        assert_eq!(
            PanelState::from_snapshot(&PollerSnapshot::default()),
            PanelState::Idle
        );
        assert_eq!(
            PanelState::from_snapshot(&PollerSnapshot::for_run("run-42")),
            PanelState::Loading
        );

        let mut failed = PollerSnapshot::for_run("run-42");
        failed.loading = false;
        failed.error = Some("HTTP 500: boom".to_string());
        assert_eq!(
            PanelState::from_snapshot(&failed),
            PanelState::Unavailable {
                error: "HTTP 500: boom".to_string()
            }
        );

        let mut stale = ready(RunStatus::Running);
        stale.error = Some("HTTP 502: bad gateway".to_string());
        assert_eq!(
            PanelState::from_snapshot(&stale),
            PanelState::Ready {
                stale_error: Some("HTTP 502: bad gateway".to_string())
            }
        );
    }

    #[test]
    fn test_unavailable_offers_retry() {
        console::set_colors_enabled(false);
        let mut failed = PollerSnapshot::for_run("run-42");
        failed.loading = false;
        failed.error = Some("connection refused".to_string());

        let live = render_execution(&failed, &BookListView::default(), Interaction::Keys);
        assert!(live.contains("Could not load run run-42: connection refused"));
        assert!(live.contains("press r to retry"));

        let once = render_execution(&failed, &BookListView::default(), Interaction::Commands);
        assert!(once.contains("rerun the command to retry"));
    }

    #[test]
    fn test_ready_panel_contents() {
        console::set_colors_enabled(false);
        let out = render_execution(
            &ready(RunStatus::Running),
            &BookListView::default(),
            Interaction::Keys,
        );
        assert!(out.contains("RUN run-42"));
        assert!(out.contains("elapsed 4m 05s"));
        assert!(out.contains("Stage 4/8: Book Import"));
        assert!(out.contains("Current: Dune by Frank Herbert"));
        assert!(!out.contains("not in active book list"));
        assert!(out.contains("8/10 processed (80%)"));
        assert!(out.contains("BOOKS"));
        assert!(out.contains("c cancel run"));
    }

    #[test]
    fn test_stale_error_shown_above_data() {
        console::set_colors_enabled(false);
        let mut snap = ready(RunStatus::Running);
        snap.error = Some("HTTP 500: internal error".to_string());
        let out = render_execution(&snap, &BookListView::default(), Interaction::Keys);
        let warning = out.find("Last update failed: HTTP 500: internal error").unwrap();
        let header = out.find("RUN run-42").unwrap();
        assert!(warning < header);
        assert!(out.contains("Dune"));
    }

    #[test]
    fn test_current_book_mismatch_annotated() {
        console::set_colors_enabled(false);
        let mut snap = ready(RunStatus::Running);
        snap.books[0].status = BookState::Completed;
        let out = render_execution(&snap, &BookListView::default(), Interaction::Commands);
        assert!(out.contains("(not in active book list)"));
    }

    #[test]
    fn test_terminal_run_hides_cancel_hint() {
        console::set_colors_enabled(false);
        let out = render_execution(
            &ready(RunStatus::Completed),
            &BookListView::default(),
            Interaction::Keys,
        );
        assert!(out.contains("r refresh · q quit"));
        assert!(!out.contains("cancel run"));
    }

    #[test]
    fn test_unknown_stage_falls_back_to_name() {
        console::set_colors_enabled(false);
        let mut s = status(RunStatus::Running);
        s.current_stage = Some(12);
        s.current_stage_name = Some("Warmup".to_string());
        assert_eq!(render_stage(&s), "Stage 12/8: Warmup\n");

        s.current_stage = None;
        s.current_stage_name = None;
        assert_eq!(render_stage(&s), "Stage -/8: Unknown stage\n");
    }
}
