use serde::{Deserialize, Serialize};

/// Roles in ascending precedence order, so `Ord` gives the session-role
/// pick directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    JuniorAgent,
    CreditControl,
    Supervisor,
    Developer,
}

/// The active session role for a multi-role user: highest precedence wins.
/// Role switching mid-session is not supported.
pub fn active_role(roles: &[UserRole]) -> Option<UserRole> {
    roles.iter().copied().max()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub phone: String,
    pub roles: Vec<UserRole>,
    pub password_digest: String,
}
