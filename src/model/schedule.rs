use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleStatus {
    Published,
    OnGoing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Schedule {
    #[schema(example = 31)]
    pub id: u64,
    pub class_session_id: u64,
    #[schema(example = "Saturday Morning A")]
    pub class_session_name: String,
    pub coach_id: Option<u64>,
    pub coach_name: Option<String>,
    #[schema(value_type = String, format = "date", example = "2026-10-17")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "09:30:00")]
    pub end_time: NaiveTime,
    pub location: Option<String>,
    #[schema(example = "published")]
    pub status: String,
}

impl Schedule {
    /// Unknown values in the column are read as `published`.
    pub fn status(&self) -> ScheduleStatus {
        ScheduleStatus::from_str(&self.status).unwrap_or(ScheduleStatus::Published)
    }
}
