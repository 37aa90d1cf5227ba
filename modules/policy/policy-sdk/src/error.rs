//! Error types for the policy engine API.

use thiserror::Error;

/// Infrastructure failures during evaluation.
///
/// These never express denial: a refused operation is a
/// [`crate::models::Decision::Deny`] value, not an error. Callers must treat
/// every variant here as deny (fail closed), never as allow.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The relationship index could not answer a lookup.
    #[error("relationship index unavailable: {0}")]
    Index(String),

    /// Evaluation exceeded the configured deadline.
    #[error("evaluation timed out after {0}ms")]
    Timeout(u64),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result of collapsing a decision for a single-row operation.
///
/// Read denials surface as [`AccessError::NotFound`] so callers cannot tell
/// a denied row from a missing one. Write denials surface as
/// [`AccessError::Forbidden`], since the caller has already proven it can
/// see the row.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The row does not exist, or this principal may not know whether it does.
    #[error("not found")]
    NotFound,

    /// The operation is not permitted for this principal.
    #[error("forbidden")]
    Forbidden,

    /// The rule catalog has no entry for this (resource, action) pair.
    #[error("access policy misconfigured")]
    PolicyMisconfigured,

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PolicyError> for AccessError {
    fn from(err: PolicyError) -> Self {
        match err {
            // A timed-out evaluation is a deny, not an outage.
            PolicyError::Timeout(_) => Self::Forbidden,
            PolicyError::Index(msg) | PolicyError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// Failures of token-scoped guest access.
///
/// [`TokenError::Invalid`] deliberately covers unknown, expired and
/// already-settled tokens alike, so a caller probing the endpoint learns
/// nothing about which of those it hit.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token grants nothing.
    #[error("verification link is invalid or has expired")]
    Invalid,

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PolicyError> for TokenError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Timeout(_) => Self::Invalid,
            PolicyError::Index(msg) | PolicyError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn timeout_collapses_to_forbidden() {
        let err: AccessError = PolicyError::Timeout(250).into();
        assert!(matches!(err, AccessError::Forbidden));
    }

    #[test]
    fn index_outage_is_internal_not_a_denial_code() {
        let err: AccessError = PolicyError::Index("connection refused".to_owned()).into();
        assert!(matches!(err, AccessError::Internal(_)));
    }

    #[test]
    fn token_error_message_does_not_distinguish_causes() {
        assert_eq!(
            TokenError::Invalid.to_string(),
            "verification link is invalid or has expired"
        );
    }
}
