//! Environment selection commands.

use std::process::ExitCode;

use console::style;

use super::super::helpers::confirm_typed;
use crate::config::Settings;
use crate::environment::{Environment, SwitchRequest};
use crate::panels::render_environment;

/// Show both environments and the active one.
pub fn cmd_env_show(settings: &Settings) -> anyhow::Result<ExitCode> {
    let ctx = settings.environment_context();
    print!("{}", render_environment(&ctx));
    Ok(ExitCode::SUCCESS)
}

/// Switch the saved environment.
pub fn cmd_env_switch(
    settings: &Settings,
    target: Environment,
    yes: bool,
) -> anyhow::Result<ExitCode> {
    let ctx = settings.environment_context();

    match ctx.request_switch(target)? {
        SwitchRequest::Unchanged(env) => {
            println!("{} Already using {}", style("·").dim(), env);
        }
        SwitchRequest::Switched(env) => {
            println!("{} Switched to {} ({})", style("✓").green(), env, ctx.base_url());
        }
        SwitchRequest::NeedsConfirmation(pending) => {
            let confirmed = yes
                || confirm_typed(
                    &format!(
                        "{} Switching from {} to {} ({}). Requests will affect live data.",
                        style("!").yellow(),
                        pending.from(),
                        style(pending.target().as_str()).yellow().bold(),
                        ctx.url_for(pending.target())
                    ),
                    pending.target().as_str(),
                )?;

            if !confirmed {
                let kept = pending.cancel();
                println!("{} Cancelled, still using {}", style("!").yellow(), kept);
                return Ok(ExitCode::FAILURE);
            }
            let env = pending.confirm(&ctx)?;
            println!("{} Switched to {} ({})", style("✓").green(), env, ctx.base_url());
        }
    }
    Ok(ExitCode::SUCCESS)
}
