use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::schedule::{Schedule, ScheduleStatus},
    utils::db_utils::{Filters, Pagination, SchedulePage, delete_by_id, fetch_page, update_by_id},
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

pub(crate) const SCHEDULE_COLUMNS: &str = r#"
    s.id, s.class_session_id, cs.name AS class_session_name, s.coach_id, u.name AS coach_name,
    s.date, s.start_time, s.end_time, s.location, s.status
"#;
pub(crate) const SCHEDULE_FROM: &str = r#"
    FROM schedules s
    JOIN class_sessions cs ON cs.id = s.class_session_id
    LEFT JOIN coaches c ON c.id = s.coach_id
    LEFT JOIN users u ON u.id = c.user_id
"#;

/// Schedules of the class sessions a member is (or was) enrolled in.
pub(crate) const MEMBER_SCHEDULE_CLAUSE: &str = "s.class_session_id IN (SELECT e.class_session_id FROM enrolments e WHERE e.member_id = ? AND e.status <> 'cancelled')";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSchedule {
    pub class_session_id: u64,
    /// Defaults to the class session's coach.
    pub coach_id: Option<u64>,
    #[schema(value_type = String, format = "date", example = "2026-10-24")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "09:30:00")]
    pub end_time: NaiveTime,
    /// Defaults to the class session's location.
    pub location: Option<String>,
    pub status: Option<ScheduleStatus>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateSchedule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

const SCHEDULE_UPDATABLE: [&str; 5] = ["coach_id", "date", "start_time", "end_time", "location"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleStatusUpdate {
    pub status: ScheduleStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub class_session_id: Option<u64>,
    pub coach_id: Option<u64>,
    pub status: Option<ScheduleStatus>,
    /// First date, inclusive (YYYY-MM-DD)
    pub from: Option<NaiveDate>,
    /// Last date, inclusive (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

pub(crate) async fn find_schedule(pool: &MySqlPool, id: u64, member: Option<u64>) -> Result<Schedule, ApiError> {
    let mut filters = Filters::new();
    filters.opt_u64("s.id = ?", Some(id)).opt_u64(MEMBER_SCHEDULE_CLAUSE, member);
    let sql = format!("SELECT {SCHEDULE_COLUMNS} {SCHEDULE_FROM}{}", filters.where_sql());

    filters
        .bind_as(sqlx::query_as::<_, Schedule>(&sql))
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("fetch schedule", e))?
        .ok_or_else(|| ApiError::not_found("Schedule"))
}

fn check_times(v: &mut Validator, start: NaiveTime, end: NaiveTime) {
    v.check("end_time", start < end, "The end time must be after the start time.");
}

#[utoipa::path(
    get,
    path = "/api/v1/schedules",
    params(ScheduleQuery),
    responses((status = 200, description = "Paginated schedule list, members see their own classes only", body = SchedulePage)),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
pub async fn list_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ScheduleQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Schedules, Action::Read)?;

    let mut v = Validator::new();
    v.opt_date_in_range("from", query.from)
        .opt_date_in_range("to", query.to);
    v.finish()?;

    let mut filters = Filters::new();
    filters
        .opt_u64(MEMBER_SCHEDULE_CLAUSE, auth.member_scope()?)
        .opt_u64("s.class_session_id = ?", query.class_session_id)
        .opt_u64("s.coach_id = ?", query.coach_id)
        .opt_str("s.status = ?", query.status.as_ref().map(|s| s.as_ref()))
        .opt_date("s.date >= ?", query.from)
        .opt_date("s.date <= ?", query.to);

    let page = fetch_page::<Schedule>(
        pool.get_ref(),
        SCHEDULE_COLUMNS,
        SCHEDULE_FROM,
        &filters,
        "s.date DESC, s.start_time ASC",
        Pagination::new(query.page, query.per_page),
        "Schedule",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/schedules/{id}",
    params(("id", Path, description = "Schedule id")),
    responses(
        (status = 200, description = "Schedule", body = Schedule),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
pub async fn get_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Schedules, Action::Read)?;
    let schedule = find_schedule(pool.get_ref(), path.into_inner(), auth.member_scope()?).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

#[utoipa::path(
    post,
    path = "/api/v1/schedules",
    request_body = CreateSchedule,
    responses(
        (status = 201, description = "Schedule created", body = Created),
        (status = 422, description = "Validation failed")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
pub async fn create_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSchedule>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Schedules, Action::Write)?;

    let mut v = Validator::new();
    check_times(&mut v, payload.start_time, payload.end_time);

    let class_session = sqlx::query_as::<_, (Option<u64>, Option<String>)>(
        "SELECT coach_id, location FROM class_sessions WHERE id = ?",
    )
    .bind(payload.class_session_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("fetch class session", e))?;

    if class_session.is_none() {
        v.add("class_session_id", "The selected class session is invalid.");
    }
    v.finish()?;
    let (default_coach, default_location) = class_session.unwrap_or_default();

    let status = payload.status.unwrap_or(ScheduleStatus::Published);
    let result = sqlx::query(
        r#"
        INSERT INTO schedules (class_session_id, coach_id, date, start_time, end_time, location, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.class_session_id)
    .bind(payload.coach_id.or(default_coach))
    .bind(payload.date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.location.clone().or(default_location))
    .bind(status.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert schedule", e))?;

    let id = result.last_insert_id();
    info!(schedule_id = id, date = %payload.date, created_by = auth.user_id, "Schedule created");
    Ok(created("Schedule", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/schedules/{id}",
    params(("id", Path, description = "Schedule id")),
    request_body = UpdateSchedule,
    responses(
        (status = 200, description = "Schedule updated", body = Object, example = json!({"message": "Schedule updated successfully"})),
        (status = 404, description = "Schedule not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
pub async fn update_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSchedule>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Schedules, Action::Write)?;
    let id = path.into_inner();

    let existing = find_schedule(pool.get_ref(), id, None).await?;

    // a single changed time is checked against the stored other one
    let mut v = Validator::new();
    check_times(
        &mut v,
        payload.start_time.unwrap_or(existing.start_time),
        payload.end_time.unwrap_or(existing.end_time),
    );
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "schedules",
        "Schedule",
        &payload.into_inner(),
        &SCHEDULE_UPDATABLE,
        id,
    )
    .await?;

    Ok(message("Schedule updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/schedules/{id}/status",
    params(("id", Path, description = "Schedule id")),
    request_body = ScheduleStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = Object, example = json!({"message": "Schedule status changed to completed"})),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
pub async fn update_schedule_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ScheduleStatusUpdate>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Schedules, Action::Write)?;
    let id = path.into_inner();

    let result = sqlx::query("UPDATE schedules SET status = ? WHERE id = ?")
        .bind(payload.status.as_ref())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("update schedule status", e))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Schedule"));
    }

    info!(schedule_id = id, status = %payload.status, changed_by = auth.user_id, "Schedule status changed");
    Ok(message(format!("Schedule status changed to {}", payload.status)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/schedules/{id}",
    params(("id", Path, description = "Schedule id")),
    responses(
        (status = 200, description = "Schedule deleted"),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
pub async fn delete_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Schedules, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "schedules", "Schedule", id).await?;
    info!(schedule_id = id, deleted_by = auth.user_id, "Schedule deleted");
    Ok(message("Schedule deleted successfully"))
}
