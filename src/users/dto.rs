use serde::Serialize;

use super::repo_types::User;

/// Account projection returned to the signed-in user. Internal fields such as
/// the row id are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub name: String,
    pub email: String,
    pub credits: i32,
    pub convert_credits: i32,
}

impl From<User> for UserDetails {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            email: u.email,
            credits: u.credits,
            convert_credits: u.convert_credits,
        }
    }
}
