use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExpenseCategory {
    Salary,
    PoolRent,
    Equipment,
    Marketing,
    Operational,
    Other,
}

impl ExpenseCategory {
    pub fn label(self) -> &'static str {
        match self {
            ExpenseCategory::Salary => "Salary",
            ExpenseCategory::PoolRent => "Pool rent",
            ExpenseCategory::Equipment => "Equipment",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Operational => "Operational",
            ExpenseCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Expense {
    #[schema(example = 9)]
    pub id: u64,
    #[schema(example = "pool_rent")]
    pub category: String,
    #[schema(example = 2500000.0)]
    pub amount: f64,
    #[schema(value_type = String, format = "date")]
    pub spent_on: NaiveDate,
    pub description: Option<String>,
}
