//! Error and retry-policy types for the navigator domain.
//!
//! [`NavigatorError`] covers configuration the domain refuses to accept.
//! [`SourceError`] is what the port implementations in [`crate::ports`] return
//! when a collaborator (hosting-service API, webhook registrar) fails.
//!
//! [`RetryPolicy`] is a cross-cutting concern: the core never retries on its own,
//! but every collaborator error states whether the caller may.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by collaborator error types to let the orchestration layer decide
/// whether to re-run a discovery cycle.
///
/// - `Retryable` errors: API timeouts, transient rate-limit responses.
/// - `NonRetryable` errors: unknown owner, rejected credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means the caller
        /// applies its own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without a configuration change.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Errors raised when building navigator configuration.
///
/// Composition and discovery never fail; these errors only occur at the
/// construction boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigatorError {
    /// A required field is missing or a value cannot be accepted.
    ///
    /// Produced by: [`crate::Navigator::new`] with a blank repository owner.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A filter trait was constructed with a pattern that does not compile.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern, verbatim.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Failures reported by [`crate::ports`] implementations.
///
/// A `SourceError` during enumeration fails the whole discovery cycle; the core
/// keeps no partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The hosting service could not be reached or answered with a server error.
    #[error("Transport failure: {message}")]
    Transport {
        /// Human-readable description from the collaborator.
        message: String,
        /// Whether the caller may retry.
        retry: RetryPolicy,
    },

    /// The owner or repository does not exist (or is invisible to the credentials).
    #[error("Not found: {what}")]
    NotFound {
        /// Which resource was missing.
        what: String,
    },

    /// The credentials were rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable description from the collaborator.
        message: String,
    },
}

impl SourceError {
    /// Returns the retry policy the caller should apply.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            SourceError::Transport { retry, .. } => retry.clone(),
            SourceError::NotFound { .. } | SourceError::Unauthorized { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_carry_their_retry_policy() {
        let err = SourceError::Transport {
            message: "rate limited".to_string(),
            retry: RetryPolicy::Retryable {
                after: Some(Duration::from_secs(30)),
            },
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(30))
            }
        );
    }

    #[test]
    fn missing_resources_are_not_retryable() {
        let err = SourceError::NotFound {
            what: "owner cloudbeers".to_string(),
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }
}
