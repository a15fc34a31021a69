//! Parse/fetch error taxonomy for region adapters.
//!
//! The engine's failure handling hinges on one distinction: transient
//! errors (network weather) fail the task so the queue redelivers it,
//! while permanent errors (the page no longer matches the adapter's
//! expectations) are logged with the page body and dropped, because
//! retrying cannot fix a code/site-contract mismatch.

use thiserror::Error;

/// Whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network/timeout failure; the same request may succeed later.
    Transient,
    /// The page shape no longer matches the adapter; retrying cannot help.
    Permanent,
}

/// Errors produced by region adapters.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Outbound request failed (connection, DNS, HTTP error status).
    #[error("network failure fetching {url}: {reason}")]
    Network {
        /// URL that was being fetched
        url: String,
        /// Underlying failure description
        reason: String,
    },

    /// Outbound request hit the fixed fetch timeout.
    #[error("timed out fetching {url}")]
    Timeout {
        /// URL that was being fetched
        url: String,
    },

    /// An expected form field was absent from a fetched page. The site
    /// serves these inconsistently under load, so this is retryable.
    #[error("expected form field '{field}' missing from page")]
    MissingFormField {
        /// Name of the missing field
        field: String,
    },

    /// The page structure did not match what the adapter expects (e.g.
    /// table header labels changed). Carries the page body for diagnosis.
    #[error("unexpected page shape: {reason}")]
    UnexpectedShape {
        /// Why the page was rejected
        reason: String,
        /// Full page content, logged for diagnosis
        page: String,
    },
}

impl RegionError {
    /// Classify the error for the engine's retry decision.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::MissingFormField { .. } => {
                ErrorKind::Transient
            }
            Self::UnexpectedShape { .. } => ErrorKind::Permanent,
        }
    }

    /// Convenience check for `ErrorKind::Transient`.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<reqwest::Error> for RegionError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map_or_else(|| "<unknown>".to_string(), ToString::to_string);
        if err.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network {
                url,
                reason: err.to_string(),
            }
        }
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, RegionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        let err = RegionError::Timeout {
            url: "http://example.gov/search".to_string(),
        };
        assert!(err.is_transient());

        let err = RegionError::MissingFormField {
            field: "DFH_STATE_TOKEN".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_shape_mismatch_is_permanent() {
        let err = RegionError::UnexpectedShape {
            reason: "first header row was 'Name', expected 'DIN'".to_string(),
            page: "<html></html>".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert!(!err.is_transient());
    }
}
