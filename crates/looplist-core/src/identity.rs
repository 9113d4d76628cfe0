//! Caller identity.
//!
//! The store never authenticates anyone. It asks an `IdentityProvider` who is
//! calling and uses the answer for attribution and ownership checks.

use crate::types::Id;
use std::sync::RwLock;

/// Resolves the currently signed-in user, if any.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<Id>;
}

/// A fixed identity, e.g. from a CLI flag.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: Option<Id>,
}

impl StaticIdentity {
    pub fn user(user_id: Id) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<Id> {
        self.user_id.clone()
    }
}

/// A switchable session.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user_id: RwLock<Option<Id>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: Id) {
        *self.write() = Some(user_id);
    }

    pub fn sign_out(&self) {
        *self.write() = None;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Id>> {
        // A poisoned lock still holds a valid Option<Id>.
        self.user_id
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user_id(&self) -> Option<Id> {
        self.user_id
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
