//! Plan command implementation.

use crate::settings::{CliError, Settings};
use crate::{OutputFormat, SyncArgs};
use boardsync_core::{ChangeCounts, Decision};
use boardsync_engine::Plan;
use serde::Serialize;

/// One planned decision.
#[derive(Debug, Serialize)]
pub struct PlannedOutcome {
    /// Record key.
    pub key: String,
    /// What sync would do.
    pub decision: Decision,
}

/// The plan as reported.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    /// Records in the listing.
    pub source_records: usize,
    /// Keyed records in the database.
    pub destination_records: usize,
    /// Group sizes.
    pub counts: ChangeCounts,
    /// Per-key decisions; unchanged keys are omitted.
    pub outcomes: Vec<PlannedOutcome>,
}

impl From<&Plan> for PlanReport {
    fn from(plan: &Plan) -> Self {
        Self {
            source_records: plan.source_records,
            destination_records: plan.destination_records,
            counts: plan.changes.counts(),
            outcomes: plan
                .changes
                .outcomes()
                .into_iter()
                .filter(|(_, decision)| *decision != Decision::Unchanged)
                .map(|(key, decision)| PlannedOutcome {
                    key: key.to_string(),
                    decision,
                })
                .collect(),
        }
    }
}

/// Runs the plan command.
pub fn run(settings: &Settings, args: &SyncArgs) -> Result<(), CliError> {
    let engine = settings.engine(args, true)?;
    let plan = engine.plan()?;
    print!("{}", render(&PlanReport::from(&plan), args.format)?);
    Ok(())
}

fn label(decision: Decision) -> &'static str {
    match decision {
        Decision::Create => "create",
        Decision::Update => "update",
        Decision::Unchanged => "keep",
        Decision::MarkStale => "stale",
    }
}

/// Renders a plan report.
pub fn render(report: &PlanReport, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(report)?)),
        OutputFormat::Text => {
            let mut out = String::new();
            for outcome in &report.outcomes {
                out.push_str(&format!("{:<7} {}\n", label(outcome.decision), outcome.key));
            }
            let counts = &report.counts;
            out.push_str(&format!(
                "Plan: {} to create, {} to update, {} to mark stale, {} unchanged\n",
                counts.creates, counts.updates, counts.stale_marks, counts.unchanged
            ));
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_core::{DestinationRecord, SourceRecord};
    use boardsync_core::ChangeSet;

    fn plan() -> Plan {
        let changes = ChangeSet {
            creates: vec![SourceRecord::new("J1", "Engineer", "Tokyo", "Hardware")],
            updates: Vec::new(),
            stale_marks: vec![DestinationRecord::new("p2", "J2")],
            unchanged: vec!["J3".into()],
        };
        Plan {
            source_records: 2,
            destination_records: 2,
            changes,
        }
    }

    #[test]
    fn report_omits_unchanged_keys() {
        let report = PlanReport::from(&plan());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.counts.unchanged, 1);
    }

    #[test]
    fn text_plan() {
        let text = render(&PlanReport::from(&plan()), OutputFormat::Text).unwrap();
        assert_eq!(
            text,
            "create  J1\nstale   J2\nPlan: 1 to create, 0 to update, 1 to mark stale, 1 unchanged\n"
        );
    }

    #[test]
    fn json_plan() {
        let json = render(&PlanReport::from(&plan()), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outcomes"][1]["decision"], "mark_stale");
        assert_eq!(value["counts"]["creates"], 1);
    }
}
