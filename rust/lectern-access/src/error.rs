//! Error types for access resolution.
//!
//! A denial is not an error: it is an [`AccessDecision`] with `has_access`
//! unset. Errors are reserved for references that do not resolve to
//! purchasable content and for collaborators that fail to answer. The latter
//! must never be folded into a denial.
//!
//! [`AccessDecision`]: crate::AccessDecision

use crate::{ContentRef, Lookup, LookupError};
use serde::Serialize;
use std::time::Duration;

/// Errors that can occur while resolving access.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The reference does not map to any purchasable record.
    #[error("Content {reference} is not claimable")]
    NotClaimable {
        /// The reference that failed to resolve, e.g. `course:c1` or
        /// `video:v1`.
        reference: String,
    },

    /// A collaborator failed to answer.
    #[error("The {lookup} lookup failed: {source}")]
    Collaborator {
        /// Which collaborator failed.
        lookup: Lookup,
        /// The collaborator's own error.
        #[source]
        source: LookupError,
    },

    /// The whole resolution exceeded the configured timeout.
    #[error("Access resolution timed out after {0:?}")]
    TimedOut(Duration),

    /// A video was resolved on a resolver built without a video index.
    #[error("No video index is configured")]
    VideoIndexMissing,
}

impl AccessError {
    /// The content reference does not resolve.
    pub fn not_claimable(content: &ContentRef) -> Self {
        Self::NotClaimable {
            reference: content.to_string(),
        }
    }

    /// Wrap a collaborator failure.
    pub fn collaborator(lookup: Lookup, source: LookupError) -> Self {
        Self::Collaborator { lookup, source }
    }

    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AccessError::NotClaimable { .. } => ErrorCode::NotClaimable,
            AccessError::Collaborator { .. } => ErrorCode::CollaboratorFailure,
            AccessError::TimedOut(_) => ErrorCode::TimedOut,
            AccessError::VideoIndexMissing => ErrorCode::Misconfigured,
        }
    }

    /// Whether this is the [`AccessError::NotClaimable`] case.
    pub fn is_not_claimable(&self) -> bool {
        matches!(self, AccessError::NotClaimable { .. })
    }

    /// Whether an infrastructure failure, rather than the content reference,
    /// caused this error.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            AccessError::Collaborator { .. } | AccessError::TimedOut(_)
        )
    }

    /// HTTP-style status a caller would answer with.
    pub fn status_code(&self) -> u16 {
        self.code().status_code()
    }
}

/// Error codes for access resolution failures.
///
/// Each code maps to an HTTP status code via [`ErrorCode::status_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 404 Not Found
    /// The content reference does not resolve.
    NotClaimable,

    // 500 Internal Server Error
    /// The resolver is missing a collaborator it was asked to use.
    Misconfigured,

    // 503 Service Unavailable
    /// A collaborator failed.
    CollaboratorFailure,

    // 504 Gateway Timeout
    /// Resolution exceeded its deadline.
    TimedOut,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::NotClaimable => 404,
            ErrorCode::Misconfigured => 500,
            ErrorCode::CollaboratorFailure => 503,
            ErrorCode::TimedOut => 504,
        }
    }
}
