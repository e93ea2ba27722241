//! One-shot pipeline commands.

use std::process::ExitCode;

use anyhow::Context;
use console::style;

use super::super::helpers::confirm;
use crate::client::{AdminClient, PipelineApi};
use crate::panels::{
    render_execution, render_report, render_status_summary, BookFilter, BookListView, BookSort,
    Interaction,
};
use crate::poller::PollerSnapshot;

/// Fetch status and books once and render the execution panel.
pub async fn cmd_status(client: &AdminClient, run_id: &str, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        let status = client
            .get_status(run_id)
            .await
            .with_context(|| format!("Failed to fetch status of run {}", run_id))?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(ExitCode::SUCCESS);
    }

    let (status, books) = tokio::join!(client.get_status(run_id), client.get_books(run_id));
    let mut snapshot = PollerSnapshot::for_run(run_id);
    snapshot.loading = false;
    match status {
        Ok(status) => snapshot.status = Some(status),
        Err(e) => snapshot.error = Some(e.to_string()),
    }
    match books {
        Ok(books) => {
            snapshot.books = books;
            snapshot.books_loaded = true;
        }
        Err(e) => snapshot.books_error = Some(e.to_string()),
    }

    print!(
        "{}",
        render_execution(&snapshot, &BookListView::default(), Interaction::Commands)
    );
    Ok(if snapshot.has_data() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub async fn cmd_books(
    client: &AdminClient,
    run_id: &str,
    filter: BookFilter,
    sort: BookSort,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let books = client
        .get_books(run_id)
        .await
        .with_context(|| format!("Failed to fetch books of run {}", run_id))?;

    let mut view = BookListView::new(filter, sort);
    if let Some(limit) = limit {
        view = view.with_limit(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&view.shown(&books))?);
    } else {
        print!("{}", view.render(&books));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn cmd_report(client: &AdminClient, run_id: &str, json: bool) -> anyhow::Result<ExitCode> {
    let report = client
        .get_report(run_id)
        .await
        .with_context(|| format!("Failed to fetch report of run {}", run_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(ExitCode::SUCCESS)
}

/// Request cancellation, then show what the server reports afterwards.
pub async fn cmd_cancel(client: &AdminClient, run_id: &str, yes: bool) -> anyhow::Result<ExitCode> {
    let before = client
        .get_status(run_id)
        .await
        .with_context(|| format!("Failed to fetch status of run {}", run_id))?;
    if before.is_terminal() {
        println!(
            "{} Run {} is already {}",
            style("!").yellow(),
            run_id,
            before.status
        );
        return Ok(ExitCode::FAILURE);
    }

    if !yes && !confirm(&format!("Cancel run {} ({})?", run_id, before.stage_label()))? {
        println!("{} Cancelled", style("!").yellow());
        return Ok(ExitCode::FAILURE);
    }

    client
        .cancel(run_id)
        .await
        .with_context(|| format!("Failed to cancel run {}", run_id))?;
    println!("{} Cancellation requested", style("✓").green());

    let after = client
        .get_status(run_id)
        .await
        .with_context(|| format!("Failed to fetch status of run {}", run_id))?;
    print!("{}", render_status_summary(&after));
    if !after.is_terminal() {
        println!(
            "{} The server has not stopped the run yet; `libradmin pipeline watch {}` to follow it",
            style("·").dim(),
            run_id
        );
    }
    Ok(ExitCode::SUCCESS)
}
