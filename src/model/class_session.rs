use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A recurring class of a course, taught by one coach; schedules are its
/// concrete occurrences.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ClassSession {
    #[schema(example = 7)]
    pub id: u64,
    pub course_id: u64,
    #[schema(example = "Kids Beginner")]
    pub course_name: String,
    pub coach_id: Option<u64>,
    pub coach_name: Option<String>,
    #[schema(example = "Saturday Morning A")]
    pub name: String,
    #[schema(example = "Pool 2")]
    pub location: Option<String>,
    #[schema(example = 12)]
    pub capacity: u32,
}
