use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::employee_session::EmployeeSession,
    service::employee_rules::SessionThresholds,
    utils::db_utils::{EmployeeSessionPage, Filters, PageQuery, Pagination, delete_by_id, fetch_page, update_by_id},
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

const SESSION_COLUMNS: &str = "id, name, start_time, end_time, late_threshold, alpha_threshold";
const SESSION_FROM: &str = "FROM employee_sessions";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployeeSession {
    #[schema(example = "Morning shift")]
    pub name: String,
    #[schema(value_type = String, example = "06:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "12:00:00")]
    pub end_time: NaiveTime,
    #[schema(value_type = String, example = "06:15:00")]
    pub late_threshold: NaiveTime,
    /// Without it every scan after the late threshold is `late`.
    #[schema(value_type = Option<String>, example = "07:00:00")]
    pub alpha_threshold: Option<NaiveTime>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateEmployeeSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub late_threshold: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub alpha_threshold: Option<NaiveTime>,
}

const SESSION_UPDATABLE: [&str; 5] = ["name", "start_time", "end_time", "late_threshold", "alpha_threshold"];

fn check_thresholds(v: &mut Validator, thresholds: &SessionThresholds) {
    for (field, problem) in thresholds.problems() {
        v.add(field, problem);
    }
}

pub(crate) async fn find_session(pool: &MySqlPool, id: u64) -> Result<EmployeeSession, ApiError> {
    sqlx::query_as::<_, EmployeeSession>(&format!("SELECT {SESSION_COLUMNS} {SESSION_FROM} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("fetch employee session", e))?
        .ok_or_else(|| ApiError::not_found("Employee session"))
}

pub(crate) async fn all_sessions(pool: &MySqlPool) -> Result<Vec<EmployeeSession>, ApiError> {
    sqlx::query_as::<_, EmployeeSession>(&format!(
        "SELECT {SESSION_COLUMNS} {SESSION_FROM} ORDER BY start_time ASC"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::database("fetch employee sessions", e))
}

#[utoipa::path(
    get,
    path = "/api/v1/employee-sessions",
    params(PageQuery),
    responses((status = 200, description = "Paginated employee sessions", body = EmployeeSessionPage)),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
pub async fn list_employee_sessions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeSessions, Action::Read)?;

    let page = fetch_page::<EmployeeSession>(
        pool.get_ref(),
        SESSION_COLUMNS,
        SESSION_FROM,
        &Filters::new(),
        "start_time ASC",
        Pagination::new(query.page, query.per_page),
        "Employee session",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/employee-sessions/{id}",
    params(("id", Path, description = "Employee session id")),
    responses(
        (status = 200, description = "Employee session", body = EmployeeSession),
        (status = 404, description = "Employee session not found")
    ),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
pub async fn get_employee_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeSessions, Action::Read)?;
    let session = find_session(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    post,
    path = "/api/v1/employee-sessions",
    request_body = CreateEmployeeSession,
    responses(
        (status = 201, description = "Employee session created", body = Created),
        (status = 422, description = "Thresholds out of order")
    ),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
pub async fn create_employee_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployeeSession>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeSessions, Action::Write)?;

    let mut v = Validator::new();
    v.required("name", &payload.name).max_len("name", &payload.name, 80);
    check_thresholds(
        &mut v,
        &SessionThresholds {
            start: payload.start_time,
            end: payload.end_time,
            late_threshold: payload.late_threshold,
            alpha_threshold: payload.alpha_threshold,
        },
    );
    v.finish()?;

    let result = sqlx::query(
        r#"
        INSERT INTO employee_sessions (name, start_time, end_time, late_threshold, alpha_threshold)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.late_threshold)
    .bind(payload.alpha_threshold)
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert employee session", e))?;

    let id = result.last_insert_id();
    info!(employee_session_id = id, created_by = auth.user_id, "Employee session created");
    Ok(created("Employee session", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/employee-sessions/{id}",
    params(("id", Path, description = "Employee session id")),
    request_body = UpdateEmployeeSession,
    responses(
        (status = 200, description = "Employee session updated", body = Object, example = json!({"message": "Employee session updated successfully"})),
        (status = 404, description = "Employee session not found"),
        (status = 422, description = "Thresholds out of order")
    ),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
pub async fn update_employee_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployeeSession>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeSessions, Action::Write)?;
    let id = path.into_inner();
    let existing = find_session(pool.get_ref(), id).await?;

    // the merged session has to stay ordered, not just the sent fields
    let mut v = Validator::new();
    v.required_if_present("name", payload.name.as_deref());
    check_thresholds(
        &mut v,
        &SessionThresholds {
            start: payload.start_time.unwrap_or(existing.start_time),
            end: payload.end_time.unwrap_or(existing.end_time),
            late_threshold: payload.late_threshold.unwrap_or(existing.late_threshold),
            alpha_threshold: payload.alpha_threshold.or(existing.alpha_threshold),
        },
    );
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "employee_sessions",
        "Employee session",
        &payload.into_inner(),
        &SESSION_UPDATABLE,
        id,
    )
    .await?;

    Ok(message("Employee session updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employee-sessions/{id}",
    params(("id", Path, description = "Employee session id")),
    responses(
        (status = 200, description = "Employee session and its check-ins deleted"),
        (status = 404, description = "Employee session not found")
    ),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeSessions, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "employee_sessions", "Employee session", id).await?;
    info!(employee_session_id = id, deleted_by = auth.user_id, "Employee session deleted");
    Ok(message("Employee session deleted successfully"))
}
