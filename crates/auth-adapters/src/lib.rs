//! Identity adapters. Credential mechanics (the auth provider itself) are
//! out of scope; these adapters only answer "who is the current viewer".

use std::sync::RwLock;

use tracing::info;

use domains::ports::IdentityProvider;

/// A fixed identity, set once at construction. Handy for workers and tests.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    uid: Option<String>,
}

impl StaticIdentity {
    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self { uid: Some(uid.into()) }
    }

    pub fn anonymous() -> Self {
        Self { uid: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_viewer_id(&self) -> Option<String> {
        self.uid.clone()
    }
}

/// An identity that follows sign-in/sign-out during a run. The external
/// auth provider calls `sign_in`/`sign_out`; the core only ever reads.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    uid: RwLock<Option<String>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, uid: impl Into<String>) {
        let uid = uid.into();
        info!(uid, "viewer signed in");
        *self.uid.write().expect("identity lock poisoned") = Some(uid);
    }

    pub fn sign_out(&self) {
        info!("viewer signed out");
        *self.uid.write().expect("identity lock poisoned") = None;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_viewer_id(&self) -> Option<String> {
        self.uid.read().expect("identity lock poisoned").clone()
    }
}
