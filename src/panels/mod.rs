//! Text renderers for the console's panels.
//!
//! Renderers are pure and return `String`. Styling goes through
//! `console::style`, which drops colors when output is not a terminal.

pub mod books;
pub mod environment;
pub mod execution;
pub mod options;
pub mod progress;
pub mod report;
pub mod vocab;

pub use books::{BookCounts, BookFilter, BookListView, BookSort};
pub use environment::render_environment;
pub use execution::{render_execution, render_status_summary, Interaction, PanelState};
pub use options::{OptionsError, WatchOptions};
pub use progress::{render_progress, ProgressView};
pub use report::render_report;
pub use vocab::{book_status_style, run_status_style, StatusStyle, Tone};
