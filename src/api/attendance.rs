use std::collections::{BTreeMap, BTreeSet};

use crate::{
    api::{
        message,
        schedules::{MEMBER_SCHEDULE_CLAUSE, SCHEDULE_COLUMNS, SCHEDULE_FROM},
    },
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::{attendance::AttendanceEvent, schedule::Schedule},
    service::{
        attendance_rules::{AttendanceStatus, ScheduleFacts, classify_with_rule},
        calendar::{CalendarDay, build_calendar},
    },
    utils::{
        db_utils::{AttendancePage, Filters, Pagination, delete_by_id, fetch_page},
        qr_lookup::{self, ScanSubject},
        time,
    },
    validation::{Validator, parse_date, parse_month},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Months, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

/// Longest range the history view will classify in one request.
const MAX_HISTORY_DAYS: i64 = 366;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Text read from the member or coach card.
    #[schema(example = "3f1c0b6e2a5d4c7f9e8b1a2d3c4e5f60")]
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResult {
    pub user_id: u64,
    #[schema(example = "Siti Aminah")]
    pub name: String,
    #[schema(example = "member")]
    pub role: String,
    /// Scan time in the business timezone.
    #[schema(example = "18 Oct 2026 08:05:00")]
    pub scanned_at: String,
    /// Scans by this user today, including this one.
    #[schema(example = 1)]
    pub today_count: i64,
    /// Today's class the scan was linked to, if any.
    pub schedule_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    /// Defaults to the caller; members may only pass their own id
    pub user_id: Option<u64>,
    /// YYYY-MM
    #[param(example = "2026-10")]
    pub month: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceCalendar {
    pub user_id: u64,
    #[schema(example = "2026-10")]
    pub month: String,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub user_id: Option<u64>,
    /// YYYY-MM-DD, defaults to the first day of this month
    pub from: Option<String>,
    /// YYYY-MM-DD, defaults to today
    pub to: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub attendance: AttendanceStatus,
    /// Name of the rule that decided the status.
    #[schema(example = "date_passed")]
    pub rule: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Members always see their own scans
    pub user_id: Option<u64>,
    pub schedule_id: Option<u64>,
    /// First local date, inclusive
    pub from: Option<NaiveDate>,
    /// Last local date, inclusive
    pub to: Option<NaiveDate>,
}

/// Whose attendance is being looked at.
#[derive(Debug, Clone, Copy)]
struct Subject {
    user_id: u64,
    member_id: Option<u64>,
    coach_id: Option<u64>,
}

async fn load_subject(pool: &MySqlPool, user_id: u64) -> Result<Subject, ApiError> {
    let (user_id, member_id, coach_id) = sqlx::query_as::<_, (u64, Option<u64>, Option<u64>)>(
        r#"
        SELECT u.id, m.id, c.id
        FROM users u
        LEFT JOIN members m ON m.user_id = u.id
        LEFT JOIN coaches c ON c.user_id = u.id
        WHERE u.id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::database("fetch attendance subject", e))?
    .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Subject {
        user_id,
        member_id,
        coach_id,
    })
}

/// Schedules a member is enrolled in, or a coach teaches, between two dates.
async fn subject_schedules(
    pool: &MySqlPool,
    subject: Subject,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Schedule>, ApiError> {
    let mut filters = Filters::new();
    filters.opt_date("s.date >= ?", Some(from)).opt_date("s.date <= ?", Some(to));
    match (subject.member_id, subject.coach_id) {
        (Some(member_id), _) => filters.opt_u64(MEMBER_SCHEDULE_CLAUSE, Some(member_id)),
        (None, Some(coach_id)) => filters.opt_u64("s.coach_id = ?", Some(coach_id)),
        (None, None) => return Ok(Vec::new()),
    };

    let sql = format!(
        "SELECT {SCHEDULE_COLUMNS} {SCHEDULE_FROM}{} ORDER BY s.date ASC, s.start_time ASC",
        filters.where_sql()
    );
    filters
        .bind_as(sqlx::query_as::<_, Schedule>(&sql))
        .fetch_all(pool)
        .await
        .map_err(|e| ApiError::database("fetch subject schedules", e))
}

/// Scan counts per local date between two local dates.
async fn scan_counts(
    pool: &MySqlPool,
    user_id: u64,
    from: NaiveDate,
    to: NaiveDate,
    tz: Tz,
) -> Result<BTreeMap<NaiveDate, u32>, ApiError> {
    let (start, end) = time::utc_range(from, to, tz).ok_or_else(|| ApiError::BadRequest("Date out of range".into()))?;
    let stamps = sqlx::query_scalar::<_, chrono::DateTime<Utc>>(
        "SELECT scanned_at FROM attendances WHERE user_id = ? AND scanned_at >= ? AND scanned_at < ?",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::database("fetch scans", e))?;

    let mut counts = BTreeMap::new();
    for ts in stamps {
        *counts.entry(time::local_date(ts, tz)).or_insert(0) += 1;
    }
    Ok(counts)
}

/// The schedule a scan belongs to: today's class of the member or coach,
/// preferring one that has not ended yet.
async fn schedule_for_scan(
    pool: &MySqlPool,
    subject: &ScanSubject,
    today: NaiveDate,
    now: NaiveTime,
) -> Result<(Option<u64>, Option<u64>), ApiError> {
    if let Some(member_id) = subject.member_id {
        let row = sqlx::query_as::<_, (u64, u64)>(
            r#"
            SELECT s.id, e.id
            FROM schedules s
            JOIN enrolments e ON e.class_session_id = s.class_session_id
            WHERE e.member_id = ? AND e.status = 'on_progress'
              AND s.date = ? AND s.status <> 'cancelled'
            ORDER BY (s.end_time < ?) ASC, s.start_time ASC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .bind(today)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("find member schedule", e))?;
        return Ok(row.map_or((None, None), |(s, e)| (Some(s), Some(e))));
    }

    if let Some(coach_id) = subject.coach_id {
        let schedule = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT s.id FROM schedules s
            WHERE s.coach_id = ? AND s.date = ? AND s.status <> 'cancelled'
            ORDER BY (s.end_time < ?) ASC, s.start_time ASC
            LIMIT 1
            "#,
        )
        .bind(coach_id)
        .bind(today)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("find coach schedule", e))?;
        return Ok((schedule, None));
    }

    Ok((None, None))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 201, description = "Scan recorded", body = ScanResult),
        (status = 403, description = "Account inactive"),
        (status = 404, description = "Unknown code"),
        (status = 422, description = "Empty code")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(name = "attendance_scan", skip_all, fields(scanner = auth.user_id))]
pub async fn scan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ScanRequest>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::AttendanceScan, Action::Write)?;

    let mut v = Validator::new();
    v.required("code", &payload.code).max_len("code", &payload.code, 64);
    v.finish()?;

    let subject = qr_lookup::resolve(pool.get_ref(), &payload.code)
        .await
        .map_err(|e| ApiError::database("resolve qr code", e))?
        .ok_or_else(|| ApiError::NotFound("QR code not recognised".into()))?;

    if !subject.is_active {
        info!(user_id = subject.user_id, "Scan refused: account inactive");
        return Err(ApiError::Forbidden(format!("{} is not active", subject.name)));
    }

    let tz = config.timezone;
    let now = Utc::now();
    let today = time::local_date(now, tz);
    let (schedule_id, enrolment_id) =
        schedule_for_scan(pool.get_ref(), &subject, today, time::local_time(now, tz)).await?;

    sqlx::query("INSERT INTO attendances (user_id, schedule_id, enrolment_id, scanned_at) VALUES (?, ?, ?, ?)")
        .bind(subject.user_id)
        .bind(schedule_id)
        .bind(enrolment_id)
        .bind(now)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("insert attendance", e))?;

    let (start, end) = time::utc_range(today, today, tz).ok_or_else(|| ApiError::BadRequest("Date out of range".into()))?;
    let today_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendances WHERE user_id = ? AND scanned_at >= ? AND scanned_at < ?",
    )
    .bind(subject.user_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("count today's scans", e))?;

    info!(user_id = subject.user_id, schedule_id = ?schedule_id, today_count, "Scan recorded");

    Ok(HttpResponse::Created().json(ScanResult {
        user_id: subject.user_id,
        role: subject
            .capability()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".into()),
        name: subject.name,
        scanned_at: time::format_scan_time(now, tz),
        today_count,
        schedule_id,
    }))
}

/// Last day of the month starting at `first`.
fn month_end(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "One entry per date with a class or a scan", body = AttendanceCalendar),
        (status = 403, description = "Members can only view their own records"),
        (status = 422, description = "Malformed month")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<CalendarQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Attendance, Action::Read)?;
    let user_id = auth.subject_or_self(query.user_id)?;

    let mut v = Validator::new();
    let first = parse_month(&mut v, "month", &query.month);
    v.finish()?;
    let Some(first) = first else {
        return Err(ApiError::BadRequest("Invalid month".into()));
    };
    let last = month_end(first);

    let tz = config.timezone;
    let subject = load_subject(pool.get_ref(), user_id).await?;
    let schedules = subject_schedules(pool.get_ref(), subject, first, last).await?;
    let scans = scan_counts(pool.get_ref(), user_id, first, last, tz).await?;

    let facts: Vec<_> = schedules.iter().map(|s| (s.date, s.status())).collect();
    let days = build_calendar(&facts, &scans, time::today(tz));

    Ok(HttpResponse::Ok().json(AttendanceCalendar {
        user_id,
        month: first.format("%Y-%m").to_string(),
        days,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Schedules in range with their attendance status", body = [HistoryEntry]),
        (status = 403, description = "Members can only view their own records"),
        (status = 422, description = "Malformed or reversed range")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Attendance, Action::Read)?;
    let user_id = auth.subject_or_self(query.user_id)?;

    let tz = config.timezone;
    let today = time::today(tz);
    let mut v = Validator::new();
    let from = match &query.from {
        Some(raw) => parse_date(&mut v, "from", raw),
        None => today.with_day0(0),
    };
    let to = match &query.to {
        Some(raw) => parse_date(&mut v, "to", raw),
        None => Some(today),
    };
    if let (Some(from), Some(to)) = (from, to) {
        v.date_order("to", from, to).check(
            "to",
            (to - from).num_days() < MAX_HISTORY_DAYS,
            format!("The range may not exceed {MAX_HISTORY_DAYS} days."),
        );
    }
    v.finish()?;
    let (Some(from), Some(to)) = (from, to) else {
        return Err(ApiError::BadRequest("Invalid range".into()));
    };

    let subject = load_subject(pool.get_ref(), user_id).await?;
    let schedules = subject_schedules(pool.get_ref(), subject, from, to).await?;
    let attended: BTreeSet<NaiveDate> = scan_counts(pool.get_ref(), user_id, from, to, tz)
        .await?
        .into_keys()
        .collect();

    let entries: Vec<HistoryEntry> = schedules
        .into_iter()
        .map(|schedule| {
            let (attendance, rule) = classify_with_rule(&ScheduleFacts {
                date: schedule.date,
                status: schedule.status(),
                attended_dates: &attended,
                today,
            });
            HistoryEntry {
                schedule,
                attendance,
                rule: rule.to_string(),
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses((status = 200, description = "Paginated scan events, newest first", body = AttendancePage)),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Attendance, Action::Read)?;
    let user_id = if auth.is_member() {
        Some(auth.subject_or_self(query.user_id)?)
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
        .opt_u64("a.user_id = ?", user_id)
        .opt_u64("a.schedule_id = ?", query.schedule_id)
        .opt_timestamp(
            "a.scanned_at >= ?",
            query.from.and_then(|d| time::utc_range(d, d, tz)).map(|(start, _)| start),
        )
        .opt_timestamp(
            "a.scanned_at < ?",
            query.to.and_then(|d| time::utc_range(d, d, tz)).map(|(_, end)| end),
        );

    let page = fetch_page::<AttendanceEvent>(
        pool.get_ref(),
        "a.id, a.user_id, u.name AS user_name, a.schedule_id, a.enrolment_id, a.scanned_at",
        "FROM attendances a JOIN users u ON u.id = a.user_id",
        &filters,
        "a.scanned_at DESC",
        Pagination::new(query.page, query.per_page),
        "Attendance event",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{id}",
    params(("id", Path, description = "Attendance event id")),
    responses(
        (status = 200, description = "Scan deleted"),
        (status = 404, description = "Attendance event not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn delete_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Attendance, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "attendances", "Attendance event", id).await?;
    info!(attendance_id = id, deleted_by = auth.user_id, "Attendance event deleted");
    Ok(message("Attendance event deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test_case(d(2026, 2, 1) => d(2026, 2, 28); "february")]
    #[test_case(d(2028, 2, 1) => d(2028, 2, 29); "leap february")]
    #[test_case(d(2026, 12, 1) => d(2026, 12, 31); "december rolls the year")]
    #[test_case(d(2026, 4, 1) => d(2026, 4, 30); "thirty day month")]
    fn last_day_of_month(first: NaiveDate) -> NaiveDate {
        month_end(first)
    }

    #[test]
    fn month_window_fits_the_history_limit() {
        let first = d(2026, 1, 1);
        assert!((month_end(first) - first).num_days() < MAX_HISTORY_DAYS);
        assert!(Duration::days(MAX_HISTORY_DAYS) > Duration::days(365));
    }
}
