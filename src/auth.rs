//! Caller identity checks
//!
//! Token verification happens upstream; the engine only receives the
//! verified email and checks it against the principal a request acts for.
//! Emails are keys across users, progress records and article authors, so
//! every stored email goes through [`normalize_email`] first.

use crate::types::{EngineError, Result};

/// Canonical form of an email used as a storage key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    email: String,
}

impl Caller {
    pub fn new(email: impl AsRef<str>) -> Self {
        Self {
            email: normalize_email(email.as_ref()),
        }
    }

    /// Canonical email of the caller
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Succeeds only when `target_email` names the caller
    ///
    /// Returns the canonical email to store in place of `target_email`.
    pub fn authorize(&self, target_email: &str) -> Result<&str> {
        let target = normalize_email(target_email);
        if target.is_empty() {
            return Err(EngineError::InvalidInput("userEmail is required".into()));
        }
        if self.email != target {
            return Err(EngineError::Forbidden(format!(
                "{} may not act for {}",
                self.email, target
            )));
        }
        Ok(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_authorize_returns_canonical_email() {
        let caller = Caller::new("Ana@X.com");
        assert_eq!(caller.authorize(" ana@x.COM ").unwrap(), "ana@x.com");
        assert_eq!(caller.email(), "ana@x.com");
    }

    #[test]
    fn test_authorize_mismatch() {
        let caller = Caller::new("ana@x.com");

        let err = caller.authorize("bo@x.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = caller.authorize("  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
