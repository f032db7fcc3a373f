//! Error types for source adapters.

use boardsync_client::ClientError;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceFetchError>;

/// The listing could not be obtained. A run that hits this writes nothing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceFetchError {
    /// The listing endpoint failed after retries.
    #[error("listing unavailable: {0}")]
    Unavailable(#[from] ClientError),

    /// The listing was fetched but could not be understood.
    #[error("malformed listing: {0}")]
    Malformed(String),
}
