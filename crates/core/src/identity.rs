//! Caller identity, pre-validated by the upstream gateway.

use crate::id::UserId;

/// Authenticated identity for a request.
///
/// The delivery layer guarantees this is present before any domain route
/// runs; the domain never sees an unauthenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: UserId,
    email: String,
}

impl Identity {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
