use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::employee_rules::SessionThresholds;

/// Named staff shift with the thresholds used to grade a check-in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeSession {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Morning shift")]
    pub name: String,
    #[schema(value_type = String, example = "06:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "12:00:00")]
    pub end_time: NaiveTime,
    #[schema(value_type = String, example = "06:15:00")]
    pub late_threshold: NaiveTime,
    #[schema(value_type = Option<String>, example = "07:00:00")]
    pub alpha_threshold: Option<NaiveTime>,
}

impl EmployeeSession {
    pub fn thresholds(&self) -> SessionThresholds {
        SessionThresholds {
            start: self.start_time,
            end: self.end_time,
            late_threshold: self.late_threshold,
            alpha_threshold: self.alpha_threshold,
        }
    }
}
