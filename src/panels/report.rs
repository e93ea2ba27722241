//! Final report panel.

use console::style;

use crate::models::PipelineReport;
use crate::utils::{format_duration, format_number, format_size};

pub fn render_report(report: &PipelineReport) -> String {
    let summary = &report.summary;
    let mut out = format!("{}\n", style("PIPELINE REPORT").cyan().bold());
    out.push_str(&format!(
        "  {} books · {} completed · {} skipped · {} failed · took {}\n",
        format_number(summary.total),
        style(format_number(summary.completed)).green(),
        style(format_number(summary.skipped)).yellow(),
        style(format_number(summary.failed)).red(),
        format_duration(summary.duration_seconds)
    ));
    if let Some(endpoint) = &report.api_endpoint {
        out.push_str(&format!("  API endpoint: {}\n", endpoint));
    }

    let storage = &report.storage;
    out.push_str(&format!("\n{}\n", style("Storage").bold()));
    out.push_str(&format!(
        "  {} books · {} chapters · {} uploaded\n",
        format_number(storage.books_uploaded),
        format_number(storage.chapters_uploaded),
        format_size(storage.bytes_uploaded)
    ));

    if !report.related_data.is_empty() {
        out.push_str(&format!("\n{}\n", style("Related data").bold()));
        let width = report.related_data.keys().map(|k| k.len()).max().unwrap_or(0);
        for (domain, stats) in &report.related_data {
            out.push_str(&format!(
                "  {:<width$}  {} computed · {} skipped · {} failed\n",
                domain,
                format_number(stats.computed),
                format_number(stats.skipped),
                format_number(stats.failed),
                width = width
            ));
        }
    }

    let health = &report.health;
    out.push_str(&format!("\n{}", style("Health").bold()));
    if health.is_healthy() {
        out.push_str(&format!(" {}\n", style("✓ all checks passed").green()));
    } else {
        out.push_str(&format!(" {}\n", style("✗ issues found").red()));
    }
    for (name, passed) in &health.checks {
        let mark = if *passed {
            style("✓").green()
        } else {
            style("✗").red()
        };
        out.push_str(&format!("  {} {}\n", mark, name));
    }
    for issue in &health.issues {
        out.push_str(&format!("  {} {}\n", style("!").yellow(), issue));
    }

    if !report.failures.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            style("Failures").red().bold(),
            report.failures.len()
        ));
        for failure in &report.failures {
            let stage = failure
                .stage
                .as_deref()
                .map(|s| format!(" [stage {}]", s))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {} by {}{}\n      {}\n",
                failure.title,
                failure.author,
                stage,
                style(&failure.error).red()
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_full_report() {
        console::set_colors_enabled(false);
        let report: PipelineReport = serde_json::from_value(serde_json::json!({
            "summary": {"total": 1200, "completed": 1100, "skipped": 60, "failed": 40, "durationSeconds": 3723.0},
            "storage": {"booksUploaded": 1100, "chaptersUploaded": 30500, "bytesUploaded": 2_500_000_000u64},
            "relatedData": {
                "similar_books": {"computed": 1000, "skipped": 100, "failed": 0},
                "authors": {"computed": 300, "skipped": 0, "failed": 2}
            },
            "health": {"checks": {"all_uploaded": false, "db_reachable": true}, "issues": ["40 books failed"]},
            "failures": [{"title": "Ulysses", "author": "James Joyce", "stage": 4, "error": "timeout"}],
            "apiEndpoint": "https://api.example-reader.com"
        }))
        .unwrap();

        let out = render_report(&report);
        assert!(out.contains("1,200 books · 1,100 completed · 60 skipped · 40 failed · took 1h 02m 03s"));
        assert!(out.contains("API endpoint: https://api.example-reader.com"));
        assert!(out.contains("1,100 books · 30,500 chapters · 2.5 GB uploaded"));
        assert!(out.contains("similar_books  1,000 computed"));
        assert!(out.contains("✗ issues found"));
        assert!(out.contains("✗ all_uploaded"));
        assert!(out.contains("✓ db_reachable"));
        assert!(out.contains("! 40 books failed"));
        assert!(out.contains("Failures (1)"));
        assert!(out.contains("Ulysses by James Joyce [stage 4]"));
    }

    #[test]
    fn test_render_empty_report() {
        console::set_colors_enabled(false);
        let out = render_report(&PipelineReport::default());
        assert!(out.contains("0 books · 0 completed"));
        assert!(out.contains("✓ all checks passed"));
        assert!(!out.contains("Related data"));
        assert!(!out.contains("Failures"));
    }
}
