use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Member joined with the owning user so lists show a name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Member {
    #[schema(example = 12)]
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "Siti Aminah")]
    pub name: String,
    #[schema(example = "siti@example.com")]
    pub email: String,
    #[schema(example = "+6281234567890", nullable = true)]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<String>, format = "date", example = "2015-04-20")]
    pub birth_date: Option<NaiveDate>,
    #[schema(example = "female", nullable = true)]
    pub gender: Option<String>,
    pub guardian_name: Option<String>,
    #[schema(example = "active")]
    pub status: String,
    #[schema(value_type = String, format = "date", example = "2026-01-05")]
    pub joined_at: NaiveDate,
}
