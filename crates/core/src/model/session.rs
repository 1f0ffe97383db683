use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session id cannot be empty")]
    EmptyId,
}

//
// ─── SESSION ID ────────────────────────────────────────────────────────────────
//

/// Opaque identifier for a viewing session.
///
/// Progress is scoped per session, not per authenticated user identity. The
/// value carries no structure the domain relies on; it only has to be stable
/// and non-empty.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id from an opaque token.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyId` if the token is empty or whitespace-only.
    pub fn new(token: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── IDENTITY ──────────────────────────────────────────────────────────────────
//

/// A logged-in actor as the progress domain sees it.
///
/// The admin flag gates content management in the calling layer; it is
/// irrelevant to progress tracking itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub session_id: SessionId,
    pub is_admin: bool,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
