//! Admin token commands.

use std::io::{self, BufRead};
use std::process::ExitCode;

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::credentials::{TokenSource, TOKEN_ENV};

/// Save a token, reading it from stdin when not given.
pub fn cmd_login(settings: &Settings, token: Option<String>) -> anyhow::Result<ExitCode> {
    let store = settings.credential_store();
    let token = match token {
        Some(token) => token,
        None => {
            eprintln!("Paste the admin token and press Enter:");
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read token from stdin")?;
            line
        }
    };

    store.save(&token)?;
    let path = settings.credentials_path();
    println!("{} Token saved to {}", style("✓").green(), path.display());
    if store.source() == TokenSource::Environment {
        println!(
            "{} {} is set and takes precedence over the saved token",
            style("!").yellow(),
            TOKEN_ENV
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_logout(settings: &Settings) -> anyhow::Result<ExitCode> {
    let store = settings.credential_store();
    if store.clear()? {
        println!("{} Saved token removed", style("✓").green());
    } else {
        println!("{} No saved token", style("·").dim());
    }
    if store.source() == TokenSource::Environment {
        println!("{} {} is still set", style("!").yellow(), TOKEN_ENV);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_status(settings: &Settings) -> anyhow::Result<ExitCode> {
    let store = settings.credential_store();
    match store.source() {
        TokenSource::Environment => {
            println!("{} Using token from {}", style("✓").green(), TOKEN_ENV);
        }
        TokenSource::File => {
            let saved = store
                .saved_at()
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "{} Using saved token from {} (saved {})",
                style("✓").green(),
                settings.credentials_path().display(),
                saved
            );
        }
        TokenSource::None => {
            println!(
                "{} No token configured; run `libradmin auth login` or set {}",
                style("✗").red(),
                TOKEN_ENV
            );
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}
