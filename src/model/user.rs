use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Capability;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Budi Santoso")]
    pub name: String,
    #[schema(example = "budi")]
    pub username: String,
    #[schema(example = "budi@example.com")]
    pub email: String,
    #[schema(example = 3)]
    pub role_id: u8,
    /// Code printed on the member card and read by the scanner.
    #[schema(example = "3f1c0b6e2a5d4c7f9e8b1a2d3c4e5f60")]
    pub qr_token: String,
    pub is_active: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn capability(&self) -> Option<Capability> {
        Capability::from_id(self.role_id)
    }
}
