//! Authenticated actor context.
//!
//! The routing/authentication layer sits outside this workspace; it verifies
//! a bearer token and hands every engine call an [`Actor`]. Automated work
//! runs under the reserved system identity.

use common::UserId;
use serde::{Deserialize, Serialize};

/// Role attached to an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access, including room management.
    Admin,
    /// Front-desk staff: check-in, check-out, payments, room status.
    Staff,
    /// A client who can reserve rooms and see their own bookings.
    Guest,
    /// Reserved for automated actions such as the expiry sweeper.
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Guest => "guest",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated caller: who they are and what they are allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// The reserved identity automated actions are attributed to.
    pub fn system() -> Self {
        Self {
            id: UserId::system(),
            role: Role::System,
        }
    }

    /// True for roles that operate the front desk (admin or staff).
    pub fn is_operator(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Staff)
    }

    /// True only for administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_roles() {
        assert!(Actor::new(UserId::new(), Role::Admin).is_operator());
        assert!(Actor::new(UserId::new(), Role::Staff).is_operator());
        assert!(!Actor::new(UserId::new(), Role::Guest).is_operator());
        assert!(!Actor::system().is_operator());
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Actor::new(UserId::new(), Role::Admin).is_admin());
        assert!(!Actor::new(UserId::new(), Role::Staff).is_admin());
    }

    #[test]
    fn system_actor_uses_reserved_identity() {
        let actor = Actor::system();
        assert!(actor.id.is_system());
        assert_eq!(actor.role, Role::System);
    }
}
