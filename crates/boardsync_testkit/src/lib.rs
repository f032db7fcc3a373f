//! # Boardsync Testkit
//!
//! Test utilities for boardsync.
//!
//! This crate provides:
//! - Fixtures for records, clocks and upstream payloads
//! - Property-based test generators using proptest
//! - An in-memory destination store with failure injection
//! - A scripted source adapter and an event-recording sink
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boardsync_testkit::prelude::*;
//!
//! #[test]
//! fn creates_new_postings() {
//!     let store = MemoryStore::new();
//!     let source = StaticSource::new(vec![source_record("J1", "Engineer")]);
//!     let engine = SyncEngine::new(fast_config(), source, store).with_clock(fixed_clock());
//!     assert_eq!(engine.run().unwrap().created, 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod sink;
pub mod source;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::sink::*;
    pub use crate::source::*;
    pub use crate::store::*;
}

pub use fixtures::*;
pub use generators::*;
pub use sink::*;
pub use source::*;
pub use store::*;
