//! Rendering of run results for stdout.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use crate::cli::OutputFormat;
use crate::prune::PruneOutcome;

/// Renders `outcome` in the requested format.
pub fn render(outcome: &PruneOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcome)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(outcome).context("Failed to serialize result")
        }
    }
}

fn render_text(outcome: &PruneOutcome) -> String {
    let plan = &outcome.classification;
    let mut out = String::new();

    let _ = writeln!(out, "Repository: {} ({} images)", outcome.repository, plan.total);
    for stats in &plan.rules {
        let _ = writeln!(
            out,
            "  {:<16} kept {:>5}  delete {:>5}",
            stats.rule, stats.kept, stats.deleted
        );
    }
    let _ = writeln!(out, "  {:<16} {:>10}", "unmatched", plan.unmatched);
    let _ = writeln!(out, "  {:<16} {:>10}", "retained", plan.retained());
    let _ = writeln!(out);

    if plan.is_empty() {
        let _ = writeln!(out, "No images to delete");
        return out;
    }

    if outcome.dry_run {
        let _ = writeln!(out, "Dry run: {} image(s) would be deleted:", plan.to_delete.len());
        for digest in &plan.to_delete {
            let _ = writeln!(out, "  {digest}");
        }
        return out;
    }

    if let Some(ref report) = outcome.report {
        let _ = writeln!(out, "Deleted {} image(s):", report.deleted.len());
        for digest in &report.deleted {
            let _ = writeln!(out, "  {digest}");
        }
    }

    out
}
