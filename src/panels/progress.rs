//! Progress rendering.

use console::style;

use crate::models::Progress;

const BAR_WIDTH: usize = 30;

/// Figures shown in the progress panel.
///
/// `percentage` is the server's value; it is never derived from the counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub processed: u64,
    pub total: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub percentage: f64,
    pub consistent: bool,
}

impl From<&Progress> for ProgressView {
    fn from(progress: &Progress) -> Self {
        Self {
            processed: progress.processed(),
            total: progress.total,
            completed: progress.completed,
            skipped: progress.skipped,
            failed: progress.failed,
            percentage: progress.percentage,
            consistent: progress.is_consistent(),
        }
    }
}

impl ProgressView {
    /// `8/10 processed (80%)`
    pub fn headline(&self) -> String {
        format!(
            "{}/{} processed ({}%)",
            self.processed, self.total, self.percentage
        )
    }

    fn bar(&self, width: usize) -> String {
        let fraction = if self.percentage.is_finite() {
            (self.percentage / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let filled = (fraction * width as f64).round() as usize;
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}

/// Bar, headline and breakdown for a run's progress.
pub fn render_progress(progress: &Progress) -> String {
    let view = ProgressView::from(progress);
    let mut out = format!(
        "[{}] {}\n",
        style(view.bar(BAR_WIDTH)).cyan(),
        view.headline()
    );
    out.push_str(&format!(
        "  {} completed · {} skipped · {} failed\n",
        style(view.completed).green(),
        style(view.skipped).yellow(),
        style(view.failed).red()
    ));
    if !view.consistent {
        out.push_str(&format!(
            "  {} server counts exceed total\n",
            style("!").yellow()
        ));
    }
    out
}
