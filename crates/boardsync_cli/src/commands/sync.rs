//! Sync command implementation.

use crate::settings::{CliError, Settings};
use crate::{OutputFormat, SyncArgs};
use boardsync_engine::RunSummary;

/// Runs the sync command.
pub fn run(settings: &Settings, args: &SyncArgs, dry_run: bool) -> Result<(), CliError> {
    let engine = settings.engine(args, dry_run)?;
    let summary = engine.run()?;
    print!("{}", render(&summary, args.format)?);
    Ok(())
}

/// Renders a run summary.
pub fn render(summary: &RunSummary, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(summary)?)),
        OutputFormat::Text => {
            let mut out = String::new();
            let verb = if summary.dry_run { "Would sync" } else { "Synced" };
            out.push_str(&format!(
                "{verb} {} postings against {} records\n",
                summary.source_records, summary.destination_records
            ));
            out.push_str(&format!("  Created:       {}\n", summary.created));
            out.push_str(&format!("  Updated:       {}\n", summary.updated));
            out.push_str(&format!("  Unchanged:     {}\n", summary.unchanged));
            out.push_str(&format!("  Marked stale:  {}\n", summary.marked_stale));
            out.push_str(&format!("  Already stale: {}\n", summary.already_stale));
            out.push_str(&format!("  Failed:        {}\n", summary.failed()));
            for failure in &summary.failures {
                out.push_str(&format!(
                    "    {} {}: {}\n",
                    failure.operation, failure.key, failure.error
                ));
            }
            out.push_str(&format!("  Duration:      {} ms\n", summary.duration_ms));
            Ok(out)
        }
    }
}
