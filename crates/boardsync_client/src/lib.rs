//! # Boardsync Client
//!
//! Resilient request layer and destination store for boardsync.
//!
//! This crate provides:
//! - Transport abstraction with a blocking `ureq` implementation and a
//!   scripted mock
//! - Retry with exponential backoff, per-attempt timeouts and response
//!   validation
//! - Error classification (transport, protocol, remote, exhausted)
//! - The `DestinationStore` trait and its Notion implementation
//!
//! ## Key Invariants
//!
//! - Transport and protocol failures are retried up to the attempt budget
//! - Permanent remote errors are returned after a single attempt
//! - Exhaustion preserves the last underlying cause
//! - Credentials never appear in `Debug` output or logs

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod notion;
mod resilient;
mod schema;
mod store;
mod transport;

pub use config::{ApiToken, ClientConfig, RetryConfig};
pub use error::{ClientError, ClientResult, TransportErrorKind, PERMANENT_REMOTE_CODES};
pub use http::{parse_retry_after, UreqTransport};
pub use notion::{encode_blocks, CheckReport, NotionConfig, NotionStore, NOTION_API_BASE, NOTION_VERSION};
pub use resilient::{ClientStats, RequestKind, RequestState, ResilientClient};
pub use schema::{PropertyKind, PropertySchema, PropertySpec, MAX_RICH_TEXT_LEN};
pub use store::DestinationStore;
pub use transport::{Method, MockTransport, Request, Response, Transport};
