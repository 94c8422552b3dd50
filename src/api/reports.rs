use std::str::FromStr;

use crate::{
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::{expense::ExpenseCategory, member::MemberStatus},
    service::{
        csv_export::{MemberReportRow, finance_csv, members_csv},
        finance::{DateWindow, Entry, FinanceReport, build_report},
    },
    utils::{db_utils::Filters, time},
    validation::{Validator, parse_date},
};
use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// YYYY-MM-DD, defaults to the first day of this month
    pub start: Option<String>,
    /// YYYY-MM-DD, defaults to today
    pub end: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberReportQuery {
    /// Window for the attendance count, YYYY-MM-DD
    pub start: Option<String>,
    pub end: Option<String>,
    pub status: Option<MemberStatus>,
}

/// Longest report window, about ten years.
const MAX_REPORT_DAYS: i64 = 3660;

/// Reads the report window, month-to-date when nothing is sent.
fn resolve_window(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<DateWindow, ApiError> {
    let mut v = Validator::new();
    let start = match start {
        Some(raw) => parse_date(&mut v, "start", raw),
        None => today.with_day(1),
    };
    let end = match end {
        Some(raw) => parse_date(&mut v, "end", raw),
        None => Some(today),
    };
    if let (Some(start), Some(end)) = (start, end) {
        v.date_order("end", start, end).check(
            "end",
            (end - start).num_days() < MAX_REPORT_DAYS,
            format!("The report window may not exceed {MAX_REPORT_DAYS} days."),
        );
    }
    v.finish()?;

    start
        .zip(end)
        .and_then(|(start, end)| DateWindow::new(start, end))
        .filter(|window| window.previous().is_some())
        .ok_or_else(|| ApiError::BadRequest("Invalid report window".into()))
}

fn csv_attachment(filename: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

/// Paid income per course and expenses per category, covering the window
/// and the one before it.
async fn finance_report(pool: &MySqlPool, window: DateWindow) -> Result<FinanceReport, ApiError> {
    let from = window
        .previous()
        .ok_or_else(|| ApiError::BadRequest("Invalid report window".into()))?
        .start;

    let income: Vec<Entry> = sqlx::query_as::<_, (u64, String, f64, NaiveDate)>(
        r#"
        SELECT co.id, co.name, p.amount, p.paid_on
        FROM payments p
        JOIN enrolments e ON e.id = p.enrolment_id
        JOIN courses co ON co.id = e.course_id
        WHERE p.status = 'paid' AND p.paid_on >= ? AND p.paid_on <= ?
        "#,
    )
    .bind(from)
    .bind(window.end)
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::database("fetch report income", e))?
    .into_iter()
    .map(|(course_id, course, amount, date)| Entry {
        key: course_id.to_string(),
        label: course,
        amount,
        date,
    })
    .collect();

    let expense: Vec<Entry> = sqlx::query_as::<_, (String, f64, NaiveDate)>(
        "SELECT category, amount, spent_on FROM expenses WHERE spent_on >= ? AND spent_on <= ?",
    )
    .bind(from)
    .bind(window.end)
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::database("fetch report expenses", e))?
    .into_iter()
    .map(|(category, amount, date)| Entry {
        label: ExpenseCategory::from_str(&category)
            .map(|c| c.label().to_string())
            .unwrap_or_else(|_| category.clone()),
        key: category,
        amount,
        date,
    })
    .collect();

    debug!(income = income.len(), expense = expense.len(), start = %window.start, end = %window.end, "Building finance report");
    build_report(&income, &expense, window).ok_or_else(|| ApiError::BadRequest("Invalid report window".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/finance",
    params(ReportQuery),
    responses(
        (status = 200, description = "Income and expense breakdown with growth against the previous window", body = FinanceReport),
        (status = 422, description = "Malformed or reversed window")
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn finance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Reports, Action::Read)?;
    let window = resolve_window(query.start.as_deref(), query.end.as_deref(), time::today(config.timezone))?;
    let report = finance_report(pool.get_ref(), window).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/finance.csv",
    params(ReportQuery),
    responses(
        (status = 200, description = "Finance report as CSV", content_type = "text/csv", body = String),
        (status = 422, description = "Malformed or reversed window")
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn finance_export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Reports, Action::Read)?;
    let window = resolve_window(query.start.as_deref(), query.end.as_deref(), time::today(config.timezone))?;
    let report = finance_report(pool.get_ref(), window).await?;

    let filename = format!("finance_{}_{}.csv", window.start, window.end);
    Ok(csv_attachment(&filename, finance_csv(&report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/members.csv",
    params(MemberReportQuery),
    responses(
        (status = 200, description = "Member roster with enrolment and attendance counts", content_type = "text/csv", body = String),
        (status = 422, description = "Malformed or reversed window")
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn members_export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MemberReportQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Reports, Action::Read)?;
    let tz = config.timezone;
    let window = resolve_window(query.start.as_deref(), query.end.as_deref(), time::today(tz))?;
    let (from, to) = time::utc_range(window.start, window.end, tz).ok_or_else(|| ApiError::BadRequest("Date out of range".into()))?;

    let mut filters = Filters::new();
    filters.opt_str("m.status = ?", query.status.as_ref().map(|s| s.as_ref()));

    let sql = format!(
        r#"
        SELECT m.id AS member_id, u.name, u.email, m.phone, m.status, m.joined_at,
            (SELECT COUNT(*) FROM enrolments e WHERE e.member_id = m.id AND e.status = 'on_progress') AS active_enrolments,
            (SELECT COUNT(*) FROM enrolments e WHERE e.member_id = m.id) AS total_enrolments,
            (SELECT COUNT(*) FROM attendances a
                WHERE a.user_id = m.user_id AND a.scanned_at >= ? AND a.scanned_at < ?) AS attended
        FROM members m
        JOIN users u ON u.id = m.user_id{}
        ORDER BY u.name ASC
        "#,
        filters.where_sql()
    );

    let rows = filters
        .bind_as(sqlx::query_as::<_, MemberReportRow>(&sql).bind(from).bind(to))
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("fetch member report", e))?;

    let filename = format!("members_{}_{}.csv", window.start, window.end);
    Ok(csv_attachment(&filename, members_csv(&rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn defaults_to_month_to_date() {
        let window = resolve_window(None, None, d(2026, 10, 18)).unwrap();
        assert_eq!(window, DateWindow::new(d(2026, 10, 1), d(2026, 10, 18)).unwrap());
    }

    #[test]
    fn explicit_window_is_kept() {
        let window = resolve_window(Some("2026-01-01"), Some("2026-03-31"), d(2026, 10, 18)).unwrap();
        assert_eq!(window.start, d(2026, 1, 1));
        assert_eq!(window.end, d(2026, 3, 31));
    }

    #[test]
    fn reversed_window_is_a_validation_error() {
        let err = resolve_window(Some("2026-05-01"), Some("2026-04-01"), d(2026, 10, 18)).unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("end")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_dates_are_reported_per_field() {
        let err = resolve_window(Some("May 1st"), Some("2026-13-01"), d(2026, 10, 18)).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.contains_key("start"));
                assert!(errors.contains_key("end"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn window_length_is_capped() {
        let err = resolve_window(Some("1970-01-01"), Some("2026-10-18"), d(2026, 10, 18)).unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors["end"][0].contains("may not exceed")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(resolve_window(Some("2017-01-01"), Some("2026-10-18"), d(2026, 10, 18)).is_ok());
    }

    #[test]
    fn far_past_start_is_rejected_before_aggregation() {
        let err = resolve_window(Some("-262000-01-01"), Some("-262000-01-31"), d(2026, 10, 18)).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.contains_key("start"));
                assert!(errors.contains_key("end"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn export_is_served_as_attachment() {
        let resp = csv_attachment("finance_2026-10-01_2026-10-18.csv", "a,b\r\n".into());
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap();
        assert_eq!(
            disposition.to_str().unwrap(),
            "attachment; filename=\"finance_2026-10-01_2026-10-18.csv\""
        );
    }
}
