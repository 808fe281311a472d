//! Shared error type for the engine
//!
//! Every failure an engine operation can produce maps onto one stable
//! [`ErrorKind`], so callers branch on the kind rather than on message text.

use thiserror::Error;

/// Engine error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Referenced article, learning path or progress record is absent
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already enrolled in learning path {0}")]
    AlreadyEnrolled(String),

    #[error("Not enrolled in learning path {0}")]
    NotEnrolled(String),

    /// Authenticated caller does not own the target resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport or backing-store failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Discriminant of [`EngineError`] without the detail payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyEnrolled,
    NotEnrolled,
    Forbidden,
    InvalidInput,
    StoreUnavailable,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::AlreadyEnrolled(_) => ErrorKind::AlreadyEnrolled,
            EngineError::NotEnrolled(_) => ErrorKind::NotEnrolled,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// HTTP status the REST layer answers with for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyEnrolled | ErrorKind::NotEnrolled | ErrorKind::InvalidInput => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::StoreUnavailable => 503,
        }
    }

    /// Precondition failures are reported to the caller and never retried
    pub fn is_precondition(&self) -> bool {
        !matches!(self, EngineError::StoreUnavailable(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EngineError::NotFound("article a".into()).status_code(), 404);
        assert_eq!(EngineError::AlreadyEnrolled("p".into()).status_code(), 400);
        assert_eq!(EngineError::NotEnrolled("p".into()).status_code(), 400);
        assert_eq!(EngineError::InvalidInput("userEmail".into()).status_code(), 400);
        assert_eq!(EngineError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(EngineError::StoreUnavailable("down".into()).status_code(), 503);
    }

    #[test]
    fn test_store_errors_are_not_preconditions() {
        assert!(EngineError::NotEnrolled("p".into()).is_precondition());
        assert!(!EngineError::StoreUnavailable("down".into()).is_precondition());
    }
}
