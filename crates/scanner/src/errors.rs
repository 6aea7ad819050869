//! Errors raised by a discovery cycle.

use navigator::{NavigatorId, RetryPolicy, SourceError};
use thiserror::Error;

/// Failure of one discovery cycle.
///
/// A failed cycle yields no heads and does not touch webhooks.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A repository-source or registrar call failed.
    #[error("Discovery for {navigator} failed: {source}")]
    Source {
        navigator: NavigatorId,
        #[source]
        source: SourceError,
    },

    /// The cycle task was cancelled or panicked.
    #[error("Discovery task for {navigator} aborted: {message}")]
    Aborted {
        navigator: NavigatorId,
        message: String,
    },

    /// A fixture file could not be read or parsed.
    #[error("Fixture '{path}' is unusable: {message}")]
    Fixture { path: String, message: String },
}

impl ScanError {
    /// Whether repeating the cycle may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ScanError::Source { source, .. } => source.retry_policy(),
            ScanError::Aborted { .. } => RetryPolicy::Retryable { after: None },
            ScanError::Fixture { .. } => RetryPolicy::NonRetryable,
        }
    }
}
