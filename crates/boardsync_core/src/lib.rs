//! # Boardsync Core
//!
//! Record model and reconciliation engine for boardsync.
//!
//! This crate provides:
//! - Source and destination record types
//! - Fixed normalization tables for locations, departments and seniority
//! - Keyed destination snapshots
//! - The `reconcile` diff and its change sets
//! - Stale-marking policy
//! - Create/update field sets and page body rendering
//!
//! ## Key Invariants
//!
//! - A key appears at most once per listing and once per snapshot
//! - `reconcile` is pure: no I/O, no clock, deterministic output
//! - Records are never deleted, only annotated as stale
//! - Updates only write source-derived fields

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod content;
mod error;
mod field;
mod normalize;
mod patch;
mod reconcile;
mod record;
mod snapshot;
mod stale;

pub use content::{render_content, ContentBlock};
pub use error::{CoreError, CoreResult};
pub use field::{values_match, Field, FieldMap, FieldValue};
pub use normalize::{
    classify_experience, is_tracked_location, normalize_department, normalize_location,
    truncate_chars, DEPARTMENT_TABLE, LOCATION_TABLE, MAX_PASSTHROUGH_LEN, MAX_SECTION_LEN,
};
pub use patch::{create_fields, update_fields, INITIAL_STATUS};
pub use reconcile::{
    reconcile, ChangeCounts, ChangeDetection, ChangeSet, Decision, PlannedUpdate,
    ReconcileOptions,
};
pub use record::{ContentSections, DestinationRecord, ExperienceLevel, Section, SourceRecord};
pub use snapshot::Snapshot;
pub use stale::{StalePolicy, DEFAULT_MARKER_TEXT};
