use crate::{
    api::employee_sessions::{all_sessions, find_session},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::{attendance::EmployeeAttendance, role::Capability},
    service::employee_rules::{EmployeeStatus, session_for_time},
    utils::{
        db_utils::{EmployeeAttendancePage, Filters, Pagination, fetch_page},
        qr_lookup,
        time,
    },
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmployeeScanRequest {
    pub code: String,
    /// Picked from the scan time when omitted.
    pub session_id: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeScanResult {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "Budi Santoso")]
    pub name: String,
    pub session_id: u64,
    #[schema(example = "Morning shift")]
    pub session_name: String,
    #[schema(example = "18 Oct 2026 06:12:40")]
    pub scanned_at: String,
    pub status: EmployeeStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeAttendanceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Coaches always see their own check-ins
    pub user_id: Option<u64>,
    pub session_id: Option<u64>,
    pub status: Option<EmployeeStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[utoipa::path(
    post,
    path = "/api/v1/employee-attendance/scan",
    request_body = EmployeeScanRequest,
    responses(
        (status = 201, description = "Check-in graded and stored", body = EmployeeScanResult),
        (status = 403, description = "Card belongs to a member or an inactive account"),
        (status = 404, description = "Unknown code or session"),
        (status = 409, description = "Already checked in to this session today"),
        (status = 422, description = "No session covers the scan time")
    ),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_scan", skip_all, fields(scanner = auth.user_id))]
pub async fn scan_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<EmployeeScanRequest>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeAttendance, Action::Write)?;

    let mut v = Validator::new();
    v.required("code", &payload.code).max_len("code", &payload.code, 64);
    v.finish()?;

    let subject = qr_lookup::resolve(pool.get_ref(), &payload.code)
        .await
        .map_err(|e| ApiError::database("resolve qr code", e))?
        .ok_or_else(|| ApiError::NotFound("QR code not recognised".into()))?;

    if !subject.capability().is_some_and(Capability::is_staff) {
        return Err(ApiError::Forbidden("Only staff check in to employee sessions".into()));
    }
    if !subject.is_active {
        return Err(ApiError::Forbidden(format!("{} is not active", subject.name)));
    }

    let tz = config.timezone;
    let now = Utc::now();
    let local_time = time::local_time(now, tz);

    let session = match payload.session_id {
        Some(id) => find_session(pool.get_ref(), id).await?,
        None => {
            let sessions = all_sessions(pool.get_ref()).await?;
            match session_for_time(&sessions, local_time, |s| s.thresholds()) {
                Some(found) => found.clone(),
                None => {
                    let mut v = Validator::new();
                    v.add("session_id", "No employee session covers the current time.");
                    v.finish()?;
                    return Err(ApiError::BadRequest("No matching session".into()));
                }
            }
        }
    };

    let today = time::local_date(now, tz);
    let (start, end) = time::utc_range(today, today, tz).ok_or_else(|| ApiError::BadRequest("Date out of range".into()))?;
    let already = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM employee_attendances
        WHERE user_id = ? AND session_id = ? AND scanned_at >= ? AND scanned_at < ?
        "#,
    )
    .bind(subject.user_id)
    .bind(session.id)
    .bind(start)
    .bind(end)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("check employee check-in", e))?;

    if already > 0 {
        return Err(ApiError::Conflict(format!(
            "{} already checked in to {} today",
            subject.name, session.name
        )));
    }

    let status = session.thresholds().classify(local_time);
    let result = sqlx::query(
        "INSERT INTO employee_attendances (user_id, session_id, scanned_at, status) VALUES (?, ?, ?, ?)",
    )
    .bind(subject.user_id)
    .bind(session.id)
    .bind(now)
    .bind(status.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert employee check-in", e))?;

    let id = result.last_insert_id();
    info!(
        user_id = subject.user_id,
        session_id = session.id,
        status = %status,
        "Employee check-in recorded"
    );

    Ok(HttpResponse::Created().json(EmployeeScanResult {
        id,
        user_id: subject.user_id,
        name: subject.name,
        session_id: session.id,
        session_name: session.name,
        scanned_at: time::format_scan_time(now, tz),
        status,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/employee-attendance",
    params(EmployeeAttendanceQuery),
    responses((status = 200, description = "Paginated staff check-ins, newest first", body = EmployeeAttendancePage)),
    tag = "Employee attendance",
    security(("bearer_auth" = []))
)]
pub async fn list_employee_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<EmployeeAttendanceQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::EmployeeAttendance, Action::Read)?;
    let user_id = if auth.capability == Capability::Coach {
        Some(auth.user_id)
    } else {
        query.user_id
    };

    let mut v = Validator::new();
    v.opt_date_in_range("from", query.from)
        .opt_date_in_range("to", query.to);
    v.finish()?;

    let tz = config.timezone;
    let mut filters = Filters::new();
    filters
        .opt_u64("ea.user_id = ?", user_id)
        .opt_u64("ea.session_id = ?", query.session_id)
        .opt_str("ea.status = ?", query.status.as_ref().map(|s| s.as_ref()))
        .opt_timestamp(
            "ea.scanned_at >= ?",
            query.from.and_then(|d| time::utc_range(d, d, tz)).map(|(start, _)| start),
        )
        .opt_timestamp(
            "ea.scanned_at < ?",
            query.to.and_then(|d| time::utc_range(d, d, tz)).map(|(_, end)| end),
        );

    let page = fetch_page::<EmployeeAttendance>(
        pool.get_ref(),
        "ea.id, ea.user_id, u.name AS user_name, ea.session_id, es.name AS session_name, ea.scanned_at, ea.status",
        r#"
        FROM employee_attendances ea
        JOIN users u ON u.id = ea.user_id
        JOIN employee_sessions es ON es.id = ea.session_id
        "#,
        &filters,
        "ea.scanned_at DESC",
        Pagination::new(query.page, query.per_page),
        "Employee check-in",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}
