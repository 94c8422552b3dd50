use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::expense::{Expense, ExpenseCategory},
    utils::{
        db_utils::{ExpensePage, Filters, Pagination, delete_by_id, fetch_page, update_by_id},
        time,
    },
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const EXPENSE_COLUMNS: &str = "id, category, amount, spent_on, description";
const EXPENSE_FROM: &str = "FROM expenses";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateExpense {
    pub category: ExpenseCategory,
    #[schema(example = 2500000.0)]
    pub amount: f64,
    #[schema(value_type = Option<String>, format = "date")]
    pub spent_on: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateExpense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub spent_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

const EXPENSE_UPDATABLE: [&str; 4] = ["category", "amount", "spent_on", "description"];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<ExpenseCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ExpenseQuery),
    responses((status = 200, description = "Paginated expense list", body = ExpensePage)),
    tag = "Expenses",
    security(("bearer_auth" = []))
)]
pub async fn list_expenses(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExpenseQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Expenses, Action::Read)?;

    let mut v = Validator::new();
    v.opt_date_in_range("from", query.from)
        .opt_date_in_range("to", query.to);
    v.finish()?;

    let mut filters = Filters::new();
    filters
        .opt_str("category = ?", query.category.as_ref().map(|c| c.as_ref()))
        .opt_date("spent_on >= ?", query.from)
        .opt_date("spent_on <= ?", query.to)
        .search(&["description"], query.search.as_deref());

    let page = fetch_page::<Expense>(
        pool.get_ref(),
        EXPENSE_COLUMNS,
        EXPENSE_FROM,
        &filters,
        "spent_on DESC, id DESC",
        Pagination::new(query.page, query.per_page),
        "Expense",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses/{id}",
    params(("id", Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense", body = Expense),
        (status = 404, description = "Expense not found")
    ),
    tag = "Expenses",
    security(("bearer_auth" = []))
)]
pub async fn get_expense(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Expenses, Action::Read)?;

    let expense = sqlx::query_as::<_, Expense>(&format!("SELECT {EXPENSE_COLUMNS} {EXPENSE_FROM} WHERE id = ?"))
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("fetch expense", e))?
        .ok_or_else(|| ApiError::not_found("Expense"))?;

    Ok(HttpResponse::Ok().json(expense))
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpense,
    responses(
        (status = 201, description = "Expense recorded", body = Created),
        (status = 422, description = "Validation failed")
    ),
    tag = "Expenses",
    security(("bearer_auth" = []))
)]
pub async fn create_expense(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateExpense>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Expenses, Action::Write)?;

    let mut v = Validator::new();
    v.positive("amount", payload.amount);
    if let Some(description) = &payload.description {
        v.max_len("description", description, 255);
    }
    v.finish()?;

    let result = sqlx::query("INSERT INTO expenses (category, amount, spent_on, description) VALUES (?, ?, ?, ?)")
        .bind(payload.category.as_ref())
        .bind(payload.amount)
        .bind(payload.spent_on.unwrap_or_else(|| time::today(config.timezone)))
        .bind(payload.description.as_deref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("insert expense", e))?;

    let id = result.last_insert_id();
    info!(expense_id = id, category = %payload.category, amount = payload.amount, "Expense recorded");
    Ok(created("Expense", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    params(("id", Path, description = "Expense id")),
    request_body = UpdateExpense,
    responses(
        (status = 200, description = "Expense updated", body = Object, example = json!({"message": "Expense updated successfully"})),
        (status = 404, description = "Expense not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Expenses",
    security(("bearer_auth" = []))
)]
pub async fn update_expense(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateExpense>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Expenses, Action::Write)?;

    let mut v = Validator::new();
    if let Some(amount) = payload.amount {
        v.positive("amount", amount);
    }
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "expenses",
        "Expense",
        &payload.into_inner(),
        &EXPENSE_UPDATABLE,
        path.into_inner(),
    )
    .await?;

    Ok(message("Expense updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    params(("id", Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense deleted"),
        (status = 404, description = "Expense not found")
    ),
    tag = "Expenses",
    security(("bearer_auth" = []))
)]
pub async fn delete_expense(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Expenses, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "expenses", "Expense", id).await?;
    info!(expense_id = id, deleted_by = auth.user_id, "Expense deleted");
    Ok(message("Expense deleted successfully"))
}
