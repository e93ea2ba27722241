//! Client-side mirror of one pipeline run.
//!
//! [`PipelinePoller`] fetches a run's status and book list immediately on
//! subscription, then again every interval while the run is live. Once a
//! terminal status arrives the report is fetched once and cached, and the
//! loop stops itself. Teardown is a single token cancel: results of
//! requests still in flight are discarded when they land.

mod snapshot;

pub use snapshot::{PollerSnapshot, PollerState};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ApiError, PipelineApi};
use crate::config::MIN_POLL_INTERVAL_MS;
use crate::models::{BookStatus, PipelineReport, PipelineRunStatus, RunStatus};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Shorter intervals passed to [`PipelinePoller::new`] are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(MIN_POLL_INTERVAL_MS);

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Run {0} is not being watched")]
    NotSubscribed(String),
    #[error("Run {run_id} is already {status}")]
    RunTerminal { run_id: String, status: RunStatus },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Progress of the one-time report fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFetch {
    NotRequested,
    InFlight,
    Cached,
}

/// What the loop does on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    Poll,
    FetchReport,
    Wait,
    Done,
}

struct Inner {
    /// Bumped on every subscribe; results tagged with an older value are dropped.
    generation: u64,
    state: PollerState,
    report: ReportFetch,
    token: Option<CancellationToken>,
}

struct Shared {
    tx: watch::Sender<PollerSnapshot>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Polls one pipeline run at a time.
///
/// Must be used from within a Tokio runtime; the poll loop is a spawned task.
pub struct PipelinePoller<A> {
    api: Arc<A>,
    interval: Duration,
    shared: Arc<Shared>,
}

impl<A: PipelineApi + 'static> PipelinePoller<A> {
    pub fn new(api: Arc<A>, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            warn!(
                requested = ?interval,
                min = ?MIN_POLL_INTERVAL,
                "Poll interval too short; using minimum"
            );
        }
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (tx, _rx) = watch::channel(PollerSnapshot::default());
        Self {
            api,
            interval,
            shared: Arc::new(Shared {
                tx,
                inner: Mutex::new(Inner {
                    generation: 0,
                    state: PollerState::Idle,
                    report: ReportFetch::NotRequested,
                    token: None,
                }),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receiver for snapshot updates.
    pub fn watch(&self) -> watch::Receiver<PollerSnapshot> {
        self.shared.tx.subscribe()
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.shared.tx.borrow().clone()
    }

    pub fn state(&self) -> PollerState {
        self.shared.lock().state.clone()
    }

    /// Start watching `run_id`, replacing any current subscription.
    ///
    /// `None` tears down and leaves the poller idle.
    pub fn subscribe(&self, run_id: Option<String>) -> watch::Receiver<PollerSnapshot> {
        let ctx = {
            let mut inner = self.shared.lock();
            if let Some(token) = inner.token.take() {
                token.cancel();
            }
            inner.generation += 1;
            inner.report = ReportFetch::NotRequested;

            match run_id {
                None => {
                    if let Some(previous) = inner.state.run_id() {
                        info!(run_id = previous, "Stopped watching pipeline run");
                    }
                    inner.state = PollerState::Idle;
                    self.shared.tx.send_replace(PollerSnapshot::default());
                    None
                }
                Some(run_id) => {
                    let token = CancellationToken::new();
                    inner.token = Some(token.clone());
                    inner.state = PollerState::Polling {
                        run_id: run_id.clone(),
                    };
                    self.shared.tx.send_replace(PollerSnapshot::for_run(&run_id));
                    Some(RunContext {
                        api: Arc::clone(&self.api),
                        shared: Arc::clone(&self.shared),
                        run_id: Arc::from(run_id.as_str()),
                        generation: inner.generation,
                        token,
                    })
                }
            }
        };

        if let Some(ctx) = ctx {
            info!(
                run_id = %ctx.run_id,
                interval = ?self.interval,
                "Watching pipeline run"
            );
            tokio::spawn(run_loop(ctx, self.interval));
        }
        self.watch()
    }

    /// Stop polling. Requests already in flight complete and are discarded.
    pub fn unsubscribe(&self) {
        let _ = self.subscribe(None);
    }

    /// Fetch status and books now, outside the regular cadence.
    pub async fn refresh(&self, run_id: &str) -> Result<(), PollerError> {
        let ctx = self.context_for(run_id)?;
        ctx.poll_once().await;
        Ok(())
    }

    /// Ask the server to cancel the run, then re-fetch its status.
    ///
    /// The local status only changes when that fetch reports it.
    pub async fn cancel(&self, run_id: &str) -> Result<(), PollerError> {
        let ctx = self.context_for(run_id)?;
        if let Some(status) = ctx.terminal_status() {
            return Err(PollerError::RunTerminal {
                run_id: run_id.to_string(),
                status,
            });
        }

        info!(run_id, "Requesting pipeline cancellation");
        if let Err(e) = self.api.cancel(run_id).await {
            warn!(run_id, error = %e, "Cancel request failed");
            let message = e.to_string();
            ctx.update(|_, snap| snap.cancel_error = Some(message));
            return Err(e.into());
        }

        ctx.update(|_, snap| snap.cancel_error = None);
        ctx.poll_once().await;
        Ok(())
    }

    fn context_for(&self, run_id: &str) -> Result<RunContext<A>, PollerError> {
        let inner = self.shared.lock();
        match (&inner.token, inner.state.run_id()) {
            (Some(token), Some(current)) if current == run_id && !token.is_cancelled() => {
                Ok(RunContext {
                    api: Arc::clone(&self.api),
                    shared: Arc::clone(&self.shared),
                    run_id: Arc::from(run_id),
                    generation: inner.generation,
                    token: token.clone(),
                })
            }
            _ => Err(PollerError::NotSubscribed(run_id.to_string())),
        }
    }
}

impl<A> Drop for PipelinePoller<A> {
    fn drop(&mut self) {
        if let Some(token) = self.shared.lock().token.take() {
            token.cancel();
        }
    }
}

/// Everything one subscription's tasks need.
struct RunContext<A> {
    api: Arc<A>,
    shared: Arc<Shared>,
    run_id: Arc<str>,
    generation: u64,
    token: CancellationToken,
}

impl<A> Clone for RunContext<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            shared: Arc::clone(&self.shared),
            run_id: Arc::clone(&self.run_id),
            generation: self.generation,
            token: self.token.clone(),
        }
    }
}

impl<A: PipelineApi + 'static> RunContext<A> {
    /// Apply `f` if this subscription is still the current one.
    fn update(&self, f: impl FnOnce(&mut Inner, &mut PollerSnapshot)) -> bool {
        let mut guard = self.shared.lock();
        if guard.generation != self.generation || self.token.is_cancelled() {
            return false;
        }
        let inner = &mut *guard;
        self.shared.tx.send_modify(|snap| f(inner, snap));
        true
    }

    fn terminal_status(&self) -> Option<RunStatus> {
        let inner = self.shared.lock();
        if !matches!(inner.state, PollerState::Terminal { .. }) {
            return None;
        }
        let snap = self.shared.tx.borrow();
        snap.status
            .as_ref()
            .map(|s| s.status)
            .filter(RunStatus::is_terminal)
    }

    fn next_action(&self) -> TickAction {
        let inner = self.shared.lock();
        if inner.generation != self.generation {
            return TickAction::Done;
        }
        match (&inner.state, inner.report) {
            (PollerState::Polling { .. }, _) => TickAction::Poll,
            (PollerState::Terminal { .. }, ReportFetch::NotRequested) => TickAction::FetchReport,
            (PollerState::Terminal { .. }, ReportFetch::InFlight) => TickAction::Wait,
            (PollerState::Terminal { .. }, ReportFetch::Cached) | (PollerState::Idle, _) => {
                TickAction::Done
            }
        }
    }

    /// Fetch status and books concurrently and apply both.
    async fn poll_once(&self) {
        let (status, books) = tokio::join!(
            self.api.get_status(&self.run_id),
            self.api.get_books(&self.run_id)
        );
        let terminal = self.apply_status(status);
        self.apply_books(books);
        if terminal {
            self.fetch_report().await;
        }
    }

    /// Returns whether the applied status is terminal.
    ///
    /// Once terminal, late results from overlapping ticks are dropped.
    fn apply_status(&self, result: Result<PipelineRunStatus, ApiError>) -> bool {
        match result {
            Ok(status) => {
                let terminal = status.is_terminal();
                let run_status = status.status;
                let mut stale = false;
                let applied = self.update(|inner, snap| {
                    match &inner.state {
                        PollerState::Terminal { .. } if !terminal => {
                            stale = true;
                            return;
                        }
                        PollerState::Polling { run_id } if terminal => {
                            inner.state = PollerState::Terminal {
                                run_id: run_id.clone(),
                                report: None,
                            };
                        }
                        _ => {}
                    }
                    snap.loading = false;
                    snap.error = None;
                    snap.status = Some(status);
                });
                if stale {
                    debug!(
                        run_id = %self.run_id,
                        status = %run_status,
                        "Dropped status that arrived after the run finished"
                    );
                }
                if applied && terminal {
                    info!(run_id = %self.run_id, status = %run_status, "Pipeline run finished");
                }
                applied && terminal
            }
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Status fetch failed");
                let message = e.to_string();
                self.update(|inner, snap| {
                    if matches!(inner.state, PollerState::Terminal { .. }) {
                        return;
                    }
                    snap.loading = false;
                    snap.error = Some(message);
                });
                false
            }
        }
    }

    fn apply_books(&self, result: Result<Vec<BookStatus>, ApiError>) {
        match result {
            Ok(books) => {
                debug!(run_id = %self.run_id, count = books.len(), "Book list updated");
                self.update(|_, snap| {
                    snap.books = books;
                    snap.books_loaded = true;
                    snap.books_error = None;
                });
            }
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Book list fetch failed");
                let message = e.to_string();
                self.update(|_, snap| snap.books_error = Some(message));
            }
        }
    }

    /// Fetch the report unless it is cached or already being fetched.
    async fn fetch_report(&self) {
        let claimed = {
            let mut inner = self.shared.lock();
            if inner.generation == self.generation && inner.report == ReportFetch::NotRequested {
                inner.report = ReportFetch::InFlight;
                true
            } else {
                false
            }
        };
        if !claimed {
            return;
        }

        match self.api.get_report(&self.run_id).await {
            Ok(report) => {
                self.update(|inner, snap| {
                    inner.report = ReportFetch::Cached;
                    if let PollerState::Terminal { report: slot, .. } = &mut inner.state {
                        *slot = Some(report.clone());
                    }
                    snap.report = Some(report);
                    snap.report_error = None;
                });
                info!(run_id = %self.run_id, "Pipeline report cached");
            }
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Report fetch failed; will retry");
                let message = e.to_string();
                self.update(|inner, snap| {
                    inner.report = ReportFetch::NotRequested;
                    snap.report_error = Some(message);
                });
            }
        }
    }
}

/// Immediate fetch, then one tick per interval until terminal or cancelled.
async fn run_loop<A: PipelineApi + 'static>(ctx: RunContext<A>, interval: Duration) {
    let first = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.poll_once().await }
    });
    tokio::select! {
        _ = ctx.token.cancelled() => return,
        _ = first => {}
    }

    // Ticks are scheduled on the clock, not on completion, so a slow
    // fetch may overlap the next one. Last response wins.
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ctx.token.cancelled() => break,
            _ = ticker.tick() => match ctx.next_action() {
                TickAction::Poll => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move { ctx.poll_once().await });
                }
                TickAction::FetchReport => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move { ctx.fetch_report().await });
                }
                TickAction::Wait => {}
                TickAction::Done => break,
            },
        }
    }
    debug!(run_id = %ctx.run_id, "Poll loop exited");
}
