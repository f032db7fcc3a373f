//! Error types for reconciliation.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the pure reconciliation layer.
///
/// Every variant is fatal to a run: they indicate a broken contract in one of
/// the collaborators, not a transient condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The source listing produced a record without a key.
    #[error("source record {title:?} has a blank key")]
    BlankKey {
        /// Title of the offending record.
        title: String,
    },

    /// The source listing produced the same key twice in one pass.
    #[error("duplicate source key {key:?} in listing")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// The destination snapshot holds two records for one key.
    #[error("destination holds records {first_id} and {second_id} for key {key:?}")]
    DuplicateDestinationKey {
        /// The shared key.
        key: String,
        /// Store id of the record seen first.
        first_id: String,
        /// Store id of the record seen second.
        second_id: String,
    },
}

impl CoreError {
    /// Returns the key involved in the error.
    pub fn key(&self) -> &str {
        match self {
            CoreError::BlankKey { .. } => "",
            CoreError::DuplicateKey { key } => key,
            CoreError::DuplicateDestinationKey { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::DuplicateKey { key: "J1".into() };
        assert_eq!(err.to_string(), "duplicate source key \"J1\" in listing");
        assert_eq!(err.key(), "J1");

        let err = CoreError::DuplicateDestinationKey {
            key: "J2".into(),
            first_id: "page-a".into(),
            second_id: "page-b".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("page-a"));
        assert!(msg.contains("page-b"));
        assert_eq!(err.key(), "J2");

        let err = CoreError::BlankKey {
            title: "Engineer".into(),
        };
        assert_eq!(err.to_string(), "source record \"Engineer\" has a blank key");
        assert_eq!(err.key(), "");
    }
}
