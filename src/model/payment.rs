use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Qris,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payment {
    #[schema(example = 80)]
    pub id: u64,
    pub enrolment_id: u64,
    pub member_id: u64,
    pub member_name: String,
    pub course_id: u64,
    pub course_name: String,
    #[schema(example = 600000.0)]
    pub amount: f64,
    #[schema(value_type = String, format = "date")]
    pub paid_on: NaiveDate,
    #[schema(example = "transfer")]
    pub method: String,
    #[schema(example = "paid")]
    pub status: String,
    pub note: Option<String>,
}
