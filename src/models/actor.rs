use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Business,
    Courier,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "business" => Ok(Role::Business),
            "courier" => Ok(Role::Courier),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Resolved caller identity. Identity/session mechanics live outside this
/// service; the transport layer hands us `(user_id, role)` and nothing more.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
