//! # Boardsync Source
//!
//! Upstream job board adapters for boardsync.
//!
//! This crate provides:
//! - The `SourceAdapter` trait
//! - A Greenhouse board adapter with location filtering and optional
//!   per-posting detail fetches
//! - HTML-to-text conversion and section extraction
//!
//! A failed detail fetch keeps the posting with its listing data, so a
//! transient error never makes a live posting look closed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod error;
mod extract;
mod greenhouse;

pub use adapter::SourceAdapter;
pub use error::{SourceFetchError, SourceResult};
pub use extract::{extract_sections, extract_years, html_to_text, unescape_entities};
pub use greenhouse::{
    FetchReport, GreenhouseConfig, GreenhouseSource, DEFAULT_BOARD, GREENHOUSE_API_BASE,
};
