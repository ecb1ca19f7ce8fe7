use serde::{Deserialize, Serialize};

use quotedesk_core::UserId;

use crate::Role;

/// Identity supplied by the surrounding transport for every call.
///
/// Construction is intentionally decoupled from HTTP and token validation:
/// callers derive this from whatever session mechanism they use and the
/// engine only consults `user_id` and `role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether a record owned by `owner_id` is visible to this caller.
    pub fn can_access(&self, owner_id: UserId) -> bool {
        self.role.can_cross_owners() || self.user_id == owner_id
    }
}
