use thiserror::Error;

/// Failure talking to the remote spreadsheet
///
/// The variants separate "the thing is not there" from "the service could
/// not be reached" from "the service answered with something unexpected",
/// so callers can decide per kind how to respond.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Worksheet or range does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure or timeout
    #[error("connection error: {0}")]
    Connectivity(String),

    /// Credentials missing, expired or rejected
    #[error("authorization error: {0}")]
    Auth(String),

    /// Payload did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other non-success answer
    #[error("spreadsheet API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True for failures that might succeed if repeated later
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connectivity(_) => true,
            StoreError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Malformed(err.to_string())
        } else {
            StoreError::Connectivity(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(StoreError::NotFound("x".into()).is_not_found());
        assert!(!StoreError::NotFound("x".into()).is_transient());
        assert!(StoreError::Connectivity("reset".into()).is_transient());
        assert!(StoreError::Api { status: 503, message: String::new() }.is_transient());
        assert!(StoreError::Api { status: 429, message: String::new() }.is_transient());
        assert!(!StoreError::Api { status: 403, message: String::new() }.is_transient());
        assert!(!StoreError::Malformed("bad".into()).is_transient());
        assert!(!StoreError::Auth("expired".into()).is_transient());
    }

    #[test]
    fn messages_carry_detail() {
        let err = StoreError::NotFound("worksheet '01-01-2024_01-07-2024'".into());
        assert_eq!(err.to_string(), "not found: worksheet '01-01-2024_01-07-2024'");
    }
}
