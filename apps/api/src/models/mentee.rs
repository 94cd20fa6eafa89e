use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of the collaborator-owned `profiles` collection, as read here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct MenteeProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub email: String,
}

impl MenteeProfile {
    /// Name shown on the admin dashboard; falls back to the email address.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.email.as_str())
    }
}
