//! Shared helper functions for CLI commands.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use console::style;
use tracing::info;

use crate::client::AdminClient;
use crate::config::Settings;
use crate::environment::{Environment, EnvironmentContext, SwitchRequest};

/// Ask a yes/no question on stdin. Anything but `y` is a no.
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Ask the operator to type `expected` back.
pub fn confirm_typed(prompt: &str, expected: &str) -> anyhow::Result<bool> {
    println!("{}", prompt);
    print!("Type '{}' to continue: ", expected);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim() == expected)
}

/// Environment context for API commands.
///
/// With `--env`, the selection applies to this process only and goes
/// through the same confirmation step as a persisted switch.
pub fn environment_for_command(
    settings: &Settings,
    override_env: Option<Environment>,
    yes: bool,
) -> anyhow::Result<EnvironmentContext> {
    let persisted = settings.environment_context();
    let Some(target) = override_env else {
        return Ok(persisted);
    };

    let ctx = EnvironmentContext::new(settings.environment_urls(), persisted.current());
    match ctx.request_switch(target)? {
        SwitchRequest::Unchanged(_) | SwitchRequest::Switched(_) => {}
        SwitchRequest::NeedsConfirmation(pending) => {
            if !yes {
                let _ = pending.cancel();
                bail!(
                    "Refusing to target {} without --yes (use `libradmin env switch {}` to change the saved environment)",
                    target,
                    target
                );
            }
            pending.confirm(&ctx)?;
        }
    }
    Ok(ctx)
}

/// Build the admin client for the selected environment.
pub fn admin_client(
    settings: &Settings,
    override_env: Option<Environment>,
    yes: bool,
) -> anyhow::Result<Arc<AdminClient>> {
    let environment = environment_for_command(settings, override_env, yes)?;
    let current = environment.current();
    info!(environment = %current, base_url = %environment.base_url(), "Using environment");
    if current.requires_confirmation() {
        eprintln!(
            "{} Targeting {} ({})",
            style("!").yellow(),
            style(current.as_str()).yellow().bold(),
            environment.base_url()
        );
    }

    let client = AdminClient::new(
        Arc::new(environment),
        Arc::new(settings.credential_store()),
        settings.request_timeout(),
    )
    .context("Failed to create API client")?;
    Ok(Arc::new(client))
}

/// Line endings for raw terminal mode, where `\n` does not return the carriage.
pub fn raw_lines(text: &str) -> String {
    text.replace('\n', "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            data_dir: dir.path().to_path_buf(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_override_to_local_does_not_persist() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let ctx = environment_for_command(&settings, Some(Environment::Local), false).unwrap();
        assert_eq!(ctx.current(), Environment::Local);
        assert!(!settings.environment_state_path().exists());
    }

    #[test]
    fn test_production_override_requires_yes() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        let err = environment_for_command(&settings, Some(Environment::Production), false)
            .unwrap_err();
        assert!(err.to_string().contains("--yes"));

        let ctx = environment_for_command(&settings, Some(Environment::Production), true).unwrap();
        assert_eq!(ctx.current(), Environment::Production);
        assert_eq!(ctx.base_url(), settings.production_url);
        // The saved selection is untouched.
        assert_eq!(settings.environment_context().current(), Environment::Local);
    }

    #[test]
    fn test_raw_lines() {
        assert_eq!(raw_lines("a\nb\n"), "a\r\nb\r\n");
    }
}
