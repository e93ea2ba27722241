//! Live view of a pipeline run.

use std::io::{stdout, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use console::{style, Term};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::super::helpers::raw_lines;
use crate::client::AdminClient;
use crate::models::RunStatus;
use crate::panels::{
    render_execution, render_report, render_status_summary, run_status_style, Interaction,
    ProgressView, WatchOptions,
};
use crate::poller::{PipelinePoller, PollerError, PollerSnapshot};

const KEY_POLL: Duration = Duration::from_millis(200);

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Refresh,
    RequestCancel,
    ConfirmCancel,
    AbortCancel,
    Ignore,
}

fn action_for(key: KeyEvent, confirming: bool) -> KeyAction {
    let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
    if ctrl_c {
        return KeyAction::Quit;
    }
    if confirming {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::ConfirmCancel,
            _ => KeyAction::AbortCancel,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('r') => KeyAction::Refresh,
        KeyCode::Char('c') => KeyAction::RequestCancel,
        _ => KeyAction::Ignore,
    }
}

/// A failed or cancelled run exits non-zero.
fn run_failed(status: Option<RunStatus>) -> bool {
    matches!(status, Some(RunStatus::Failed | RunStatus::Cancelled))
}

fn exit_code(snapshot: &PollerSnapshot) -> ExitCode {
    if run_failed(snapshot.status.as_ref().map(|s| s.status)) {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Restores the terminal when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(stdout(), cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

/// Forward key presses from a blocking reader thread.
fn spawn_key_reader(stop: CancellationToken) -> mpsc::Receiver<KeyEvent> {
    let (tx, rx) = mpsc::channel(16);
    tokio::task::spawn_blocking(move || {
        while !stop.is_cancelled() {
            match event::poll(KEY_POLL) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if tx.blocking_send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to poll terminal events");
                    break;
                }
            }
        }
    });
    rx
}

/// Follow a run until it settles or the operator quits.
pub async fn cmd_watch(
    client: Arc<AdminClient>,
    run_id: &str,
    options: WatchOptions,
) -> anyhow::Result<ExitCode> {
    let poller = PipelinePoller::new(client, options.interval);
    let rx = poller.subscribe(Some(run_id.to_string()));

    let result = if Term::stdout().is_term() {
        watch_live(&poller, rx, run_id, &options).await
    } else {
        watch_plain(rx, &options).await
    };
    poller.unsubscribe();

    let snapshot = result?;
    if snapshot.is_settled() {
        if let Some(status) = &snapshot.status {
            print!("{}", render_status_summary(status));
        }
        if let Some(report) = &snapshot.report {
            print!("{}", render_report(report));
        }
    }
    Ok(exit_code(&snapshot))
}

async fn watch_live(
    poller: &PipelinePoller<AdminClient>,
    mut rx: watch::Receiver<PollerSnapshot>,
    run_id: &str,
    options: &WatchOptions,
) -> anyhow::Result<PollerSnapshot> {
    let view = options.book_view();
    let stop = CancellationToken::new();
    let _stop_guard = stop.clone().drop_guard();

    let guard = RawModeGuard::enable()?;
    let mut keys = spawn_key_reader(stop.clone());
    let mut stdout = stdout();
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;

    let mut confirming = false;
    let mut notice: Option<String> = None;

    loop {
        let snapshot = rx.borrow_and_update().clone();

        // Move cursor to top and clear from there down
        execute!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )?;
        let mut frame = render_execution(&snapshot, &view, Interaction::Keys);
        if confirming {
            frame.push_str(&format!(
                "\n{} Cancel run {}? Press y to confirm, any other key to keep it running\n",
                style("?").yellow().bold(),
                run_id
            ));
        }
        if let Some(message) = &notice {
            frame.push_str(&format!("\n{}\n", message));
        }
        write!(stdout, "{}", raw_lines(&frame))?;
        stdout.flush()?;

        if options.exit_on_terminal && snapshot.is_settled() {
            drop(guard);
            return Ok(snapshot);
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            key = keys.recv() => {
                let Some(key) = key else {
                    debug!("Key reader stopped");
                    break;
                };
                match action_for(key, confirming) {
                    KeyAction::Quit => break,
                    KeyAction::Refresh => {
                        notice = None;
                        if let Err(e) = poller.refresh(run_id).await {
                            notice = Some(format!("{} {}", style("✗").red(), e));
                        }
                    }
                    KeyAction::RequestCancel => {
                        notice = None;
                        if snapshot.is_terminal() {
                            notice = Some(format!("{} Run has already finished", style("!").yellow()));
                        } else {
                            confirming = true;
                        }
                    }
                    KeyAction::ConfirmCancel => {
                        confirming = false;
                        notice = match poller.cancel(run_id).await {
                            Ok(()) => Some(format!("{} Cancellation requested", style("✓").green())),
                            // The panel shows the cancel error.
                            Err(PollerError::Api(_)) => None,
                            Err(e) => Some(format!("{} {}", style("!").yellow(), e)),
                        };
                    }
                    KeyAction::AbortCancel => confirming = false,
                    KeyAction::Ignore => {}
                }
            }
        }
    }

    drop(guard);
    println!();
    let snapshot = rx.borrow().clone();
    Ok(snapshot)
}

/// Non-terminal output: one line per status change.
async fn watch_plain(
    mut rx: watch::Receiver<PollerSnapshot>,
    options: &WatchOptions,
) -> anyhow::Result<PollerSnapshot> {
    let mut last_printed: Option<String> = None;

    loop {
        let snapshot = rx.borrow_and_update().clone();
        let line = plain_line(&snapshot);
        if line.is_some() && line != last_printed {
            if let Some(text) = &line {
                print!("{}", text);
            }
            last_printed = line;
        }

        if options.exit_on_terminal && snapshot.is_settled() {
            return Ok(snapshot);
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(snapshot);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                return Ok(rx.borrow().clone());
            }
        }
    }
}

fn plain_line(snapshot: &PollerSnapshot) -> Option<String> {
    if let Some(error) = &snapshot.error {
        return Some(format!("{} {}\n", style("!").yellow(), error));
    }
    let status = snapshot.status.as_ref()?;
    Some(format!(
        "{} · {} · {}\n",
        run_status_style(status.status).badge(),
        status.stage_label(),
        ProgressView::from(&status.progress).headline()
    ))
}
