// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for tier operations.

use std::fmt::{Display, Formatter};

/// An error from a snapshot tier operation.
///
/// Opaque wrapper around whatever the tier implementation failed with. Use
/// [`std::error::Error::source()`] to reach the underlying cause.
///
/// # Example
///
/// ```
/// use hotset_tier::Error;
///
/// let error = Error::from_message("connection reset");
/// assert!(error.to_string().contains("connection reset"));
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for snapshot tier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a [`StoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// The requested record does not exist and the store treats that as a failure.
    NotFound,
    /// The store could not be reached or failed to answer.
    Unavailable,
}

impl Display for StoreErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// An error from the canonical store.
///
/// Unlike snapshot tier failures, which are treated as misses, store failures are
/// reported to the caller.
///
/// # Example
///
/// ```
/// use hotset_tier::{StoreError, StoreErrorKind};
///
/// let error = StoreError::unavailable("database offline");
/// assert_eq!(error.kind(), StoreErrorKind::Unavailable);
/// ```
#[ohno::error]
#[display("canonical store request failed: {kind}")]
pub struct StoreError {
    kind: StoreErrorKind,
}

impl StoreError {
    /// Creates an error for a record the store refused to produce.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StoreErrorKind::NotFound)
    }

    /// Creates an error for a store that could not serve the request.
    pub fn unavailable(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Unavailable, cause)
    }

    /// The category of the failure.
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_cause_message() {
        let error = Error::from_message("display test");
        let display_str = format!("{error}");
        assert!(
            display_str.contains("display test"),
            "display output should contain the cause message, got: {display_str}"
        );
    }

    #[test]
    fn store_error_reports_kind() {
        let error = StoreError::unavailable("socket closed");
        assert_eq!(error.kind(), StoreErrorKind::Unavailable);

        let display_str = error.to_string();
        assert!(display_str.contains("unavailable"), "got: {display_str}");
        assert!(display_str.contains("socket closed"), "got: {display_str}");

        assert_eq!(StoreError::not_found().kind(), StoreErrorKind::NotFound);
    }
}
