use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Course {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Kids Beginner")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "beginner")]
    pub level: String,
    #[schema(example = 600000.0)]
    pub price: f64,
    /// Meetings included in one enrolment.
    #[schema(example = 8)]
    pub total_sessions: u32,
    pub is_active: bool,
}
