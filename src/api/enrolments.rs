use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    config::Config,
    error::ApiError,
    model::enrolment::{Enrolment, EnrolmentStatus},
    utils::{
        db_utils::{EnrolmentPage, Filters, Pagination, delete_by_id, fetch_page, update_by_id},
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

const ENROLMENT_COLUMNS: &str = r#"
    e.id, e.member_id, u.name AS member_name, e.course_id, co.name AS course_name,
    e.class_session_id, e.start_date, e.end_date, e.status
"#;
const ENROLMENT_FROM: &str = r#"
    FROM enrolments e
    JOIN members m ON m.id = e.member_id
    JOIN users u ON u.id = m.user_id
    JOIN courses co ON co.id = e.course_id
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEnrolment {
    pub member_id: u64,
    pub course_id: u64,
    pub class_session_id: Option<u64>,
    /// Defaults to today.
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateEnrolment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_session_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

const ENROLMENT_UPDATABLE: [&str; 3] = ["class_session_id", "start_date", "end_date"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrolmentStatusUpdate {
    pub status: EnrolmentStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrolmentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Ignored for members, who only see their own
    pub member_id: Option<u64>,
    pub course_id: Option<u64>,
    pub class_session_id: Option<u64>,
    pub status: Option<EnrolmentStatus>,
}

async fn find_enrolment(pool: &MySqlPool, id: u64, member: Option<u64>) -> Result<Enrolment, ApiError> {
    let mut filters = Filters::new();
    filters.opt_u64("e.id = ?", Some(id)).opt_u64("e.member_id = ?", member);
    let sql = format!("SELECT {ENROLMENT_COLUMNS} {ENROLMENT_FROM}{}", filters.where_sql());

    filters
        .bind_as(sqlx::query_as::<_, Enrolment>(&sql))
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("fetch enrolment", e))?
        .ok_or_else(|| ApiError::not_found("Enrolment"))
}

/// The class must belong to the course and still have a free seat.
async fn check_class_session(
    v: &mut Validator,
    pool: &MySqlPool,
    class_session_id: u64,
    course_id: u64,
    ignore_enrolment: Option<u64>,
) -> Result<(), ApiError> {
    let row = sqlx::query_as::<_, (u64, u32, i64)>(
        r#"
        SELECT cs.course_id, cs.capacity,
               (SELECT COUNT(*) FROM enrolments e
                WHERE e.class_session_id = cs.id AND e.status = 'on_progress' AND e.id <> ?) AS taken
        FROM class_sessions cs
        WHERE cs.id = ?
        "#,
    )
    .bind(ignore_enrolment.unwrap_or(0))
    .bind(class_session_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::database("check class session", e))?;

    match row {
        None => v.add("class_session_id", "The selected class session is invalid."),
        Some((owner, _, _)) if owner != course_id => v.add(
            "class_session_id",
            "The class session does not belong to the selected course.",
        ),
        Some((_, capacity, taken)) if taken >= i64::from(capacity) => {
            v.add("class_session_id", "The class session is full.")
        }
        Some(_) => {}
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/enrolments",
    params(EnrolmentQuery),
    responses((status = 200, description = "Paginated enrolment list", body = EnrolmentPage)),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
pub async fn list_enrolments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EnrolmentQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Enrolments, Action::Read)?;
    let member_id = auth.member_scope()?.or(query.member_id);

    let mut filters = Filters::new();
    filters
        .opt_u64("e.member_id = ?", member_id)
        .opt_u64("e.course_id = ?", query.course_id)
        .opt_u64("e.class_session_id = ?", query.class_session_id)
        .opt_str("e.status = ?", query.status.as_ref().map(|s| s.as_ref()));

    let page = fetch_page::<Enrolment>(
        pool.get_ref(),
        ENROLMENT_COLUMNS,
        ENROLMENT_FROM,
        &filters,
        "e.start_date DESC, e.id DESC",
        Pagination::new(query.page, query.per_page),
        "Enrolment",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrolments/{id}",
    params(("id", Path, description = "Enrolment id")),
    responses(
        (status = 200, description = "Enrolment", body = Enrolment),
        (status = 404, description = "Enrolment not found")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
pub async fn get_enrolment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Enrolments, Action::Read)?;
    let enrolment = find_enrolment(pool.get_ref(), path.into_inner(), auth.member_scope()?).await?;
    Ok(HttpResponse::Ok().json(enrolment))
}

#[utoipa::path(
    post,
    path = "/api/v1/enrolments",
    request_body = CreateEnrolment,
    responses(
        (status = 201, description = "Enrolment created", body = Created),
        (status = 409, description = "Unknown member or course"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
pub async fn create_enrolment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateEnrolment>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Enrolments, Action::Write)?;

    let start_date = payload
        .start_date
        .unwrap_or_else(|| time::today(config.timezone));

    let mut v = Validator::new();
    if let Some(end) = payload.end_date {
        v.date_order("end_date", start_date, end);
    }
    if let Some(class_session_id) = payload.class_session_id {
        check_class_session(&mut v, pool.get_ref(), class_session_id, payload.course_id, None).await?;
    }
    v.finish()?;

    let result = sqlx::query(
        r#"
        INSERT INTO enrolments (member_id, course_id, class_session_id, start_date, end_date, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.member_id)
    .bind(payload.course_id)
    .bind(payload.class_session_id)
    .bind(start_date)
    .bind(payload.end_date)
    .bind(EnrolmentStatus::OnProgress.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert enrolment", e))?;

    let id = result.last_insert_id();
    info!(
        enrolment_id = id,
        member_id = payload.member_id,
        course_id = payload.course_id,
        "Enrolment created"
    );
    Ok(created("Enrolment", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/enrolments/{id}",
    params(("id", Path, description = "Enrolment id")),
    request_body = UpdateEnrolment,
    responses(
        (status = 200, description = "Enrolment updated", body = Object, example = json!({"message": "Enrolment updated successfully"})),
        (status = 404, description = "Enrolment not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
pub async fn update_enrolment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEnrolment>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Enrolments, Action::Write)?;
    let id = path.into_inner();
    let existing = find_enrolment(pool.get_ref(), id, None).await?;

    let mut v = Validator::new();
    if let Some(end) = payload.end_date.or(existing.end_date) {
        v.date_order("end_date", payload.start_date.unwrap_or(existing.start_date), end);
    }
    if let Some(class_session_id) = payload.class_session_id {
        if existing.class_session_id != Some(class_session_id) {
            check_class_session(&mut v, pool.get_ref(), class_session_id, existing.course_id, Some(id))
                .await?;
        }
    }
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "enrolments",
        "Enrolment",
        &payload.into_inner(),
        &ENROLMENT_UPDATABLE,
        id,
    )
    .await?;

    Ok(message("Enrolment updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/enrolments/{id}/status",
    params(("id", Path, description = "Enrolment id")),
    request_body = EnrolmentStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = Object, example = json!({"message": "Enrolment status changed to completed"})),
        (status = 404, description = "Enrolment not found")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
pub async fn update_enrolment_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<EnrolmentStatusUpdate>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Enrolments, Action::Write)?;
    let id = path.into_inner();

    // finishing an enrolment closes it today unless an end date is already set
    let closes = payload.status != EnrolmentStatus::OnProgress;
    let result = sqlx::query(
        r#"
        UPDATE enrolments
        SET status = ?, end_date = CASE WHEN ? AND end_date IS NULL THEN ? ELSE end_date END
        WHERE id = ?
        "#,
    )
    .bind(payload.status.as_ref())
    .bind(closes)
    .bind(time::today(config.timezone))
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("update enrolment status", e))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Enrolment"));
    }

    info!(enrolment_id = id, status = %payload.status, changed_by = auth.user_id, "Enrolment status changed");
    Ok(message(format!("Enrolment status changed to {}", payload.status)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/enrolments/{id}",
    params(("id", Path, description = "Enrolment id")),
    responses(
        (status = 200, description = "Enrolment and its payments deleted"),
        (status = 404, description = "Enrolment not found")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
pub async fn delete_enrolment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Enrolments, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "enrolments", "Enrolment", id).await?;
    info!(enrolment_id = id, deleted_by = auth.user_id, "Enrolment deleted");
    Ok(message("Enrolment deleted successfully"))
}
