//! Environment step: which backend the console talks to.

use console::style;

use crate::environment::{Environment, EnvironmentContext};

pub fn render_environment(ctx: &EnvironmentContext) -> String {
    let current = ctx.current();
    let mut out = format!("{}\n", style("ENVIRONMENT").cyan().bold());
    for env in [Environment::Local, Environment::Production] {
        let marker = if env == current {
            style("●").green().to_string()
        } else {
            style("○").dim().to_string()
        };
        let name = format!("{:<10}", env.as_str());
        let name = if env == current {
            style(name).bold().to_string()
        } else {
            name
        };
        out.push_str(&format!("  {} {} {}", marker, name, ctx.url_for(env)));
        if env.requires_confirmation() {
            out.push_str(&format!("  {}", style("(confirmation required)").dim()));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentUrls;

    #[test]
    fn test_marks_active_environment() {
        console::set_colors_enabled(false);
        let ctx = EnvironmentContext::new(
            EnvironmentUrls {
                local: "http://localhost:8000".to_string(),
                production: "https://api.example-reader.com".to_string(),
            },
            Environment::Production,
        );
        let out = render_environment(&ctx);
        assert!(out.contains("○ local      http://localhost:8000"));
        assert!(out.contains("● production https://api.example-reader.com  (confirmation required)"));
    }
}
