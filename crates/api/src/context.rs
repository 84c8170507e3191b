use stockdesk_core::Identity;

/// Per-request context inserted by the identity middleware.
///
/// This is immutable and is present for all domain routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    identity: Identity,
}

impl RequestContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}
