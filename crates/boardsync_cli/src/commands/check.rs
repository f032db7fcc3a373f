//! Check command implementation.

use crate::settings::{CliError, Settings};
use boardsync_client::CheckReport;
use std::path::Path;

/// Runs the check command.
pub fn run(settings: &Settings, schema: Option<&Path>) -> Result<(), CliError> {
    let store = settings.store(schema)?;
    let report = store.check()?;
    print!("{}", render(&report, &settings.database_id));
    if !report.is_complete() {
        return Err(CliError::IncompleteDatabase {
            missing: report.missing_properties,
        });
    }
    Ok(())
}

/// Renders a check report.
pub fn render(report: &CheckReport, database_id: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Token:     ok ({})\n",
        report.bot_name.as_deref().unwrap_or("unnamed integration")
    ));
    out.push_str(&format!(
        "Database:  {} ({database_id})\n",
        report.database_title.as_deref().unwrap_or("untitled")
    ));
    if report.missing_properties.is_empty() {
        out.push_str("Properties: all mapped properties present\n");
    } else {
        for name in &report.missing_properties {
            out.push_str(&format!("Properties: missing {name:?}\n"));
        }
    }
    out
}
