use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One recorded scan. Never updated; only an admin may delete it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEvent {
    #[schema(example = 1001)]
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "Siti Aminah")]
    pub user_name: String,
    pub schedule_id: Option<u64>,
    pub enrolment_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeAttendance {
    pub id: u64,
    pub user_id: u64,
    pub user_name: String,
    pub session_id: u64,
    pub session_name: String,
    #[schema(value_type = String, format = "date-time")]
    pub scanned_at: DateTime<Utc>,
    #[schema(example = "late")]
    pub status: String,
}
