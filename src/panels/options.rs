//! Options step: how the live view polls and presents a run.

use std::time::Duration;

use thiserror::Error;

use super::books::{BookFilter, BookListView, BookSort};
use crate::config::{Settings, MIN_POLL_INTERVAL_MS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Poll interval must be at least {min}ms (got {got}ms)")]
    IntervalTooShort { got: u64, min: u64 },
}

/// Settings for `pipeline watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: Duration,
    pub filter: BookFilter,
    pub sort: BookSort,
    /// Leave the live view once the run is terminal and the report is in.
    pub exit_on_terminal: bool,
}

impl WatchOptions {
    /// Combine command-line values with configured defaults.
    ///
    /// An explicit `interval_ms` below the minimum is an error; the
    /// configured interval is already floored by [`Settings`].
    pub fn resolve(
        settings: &Settings,
        interval_ms: Option<u64>,
        filter: BookFilter,
        sort: BookSort,
        exit_on_terminal: bool,
    ) -> Result<Self, OptionsError> {
        let interval = match interval_ms {
            Some(ms) if ms < MIN_POLL_INTERVAL_MS => {
                return Err(OptionsError::IntervalTooShort {
                    got: ms,
                    min: MIN_POLL_INTERVAL_MS,
                })
            }
            Some(ms) => Duration::from_millis(ms),
            None => settings.poll_interval(),
        };
        Ok(Self {
            interval,
            filter,
            sort,
            exit_on_terminal,
        })
    }

    pub fn book_view(&self) -> BookListView {
        BookListView::new(self.filter, self.sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_defaults_to_settings() {
        let settings = Settings {
            poll_interval_ms: 5000,
            ..Settings::default()
        };
        let options =
            WatchOptions::resolve(&settings, None, BookFilter::All, BookSort::Server, true).unwrap();
        assert_eq!(options.interval, Duration::from_millis(5000));
    }

    #[test]
    fn test_explicit_interval_validated() {
        let settings = Settings::default();
        assert_eq!(
            WatchOptions::resolve(&settings, Some(100), BookFilter::All, BookSort::Server, true),
            Err(OptionsError::IntervalTooShort { got: 100, min: 250 })
        );

        let options = WatchOptions::resolve(
            &settings,
            Some(250),
            BookFilter::Failed,
            BookSort::Title,
            false,
        )
        .unwrap();
        assert_eq!(options.interval, Duration::from_millis(250));
        assert_eq!(
            options.book_view(),
            BookListView::new(BookFilter::Failed, BookSort::Title)
        );
    }
}
