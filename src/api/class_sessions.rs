use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::class_session::ClassSession,
    utils::db_utils::{ClassSessionPage, Filters, Pagination, delete_by_id, fetch_page, update_by_id},
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const CLASS_SESSION_COLUMNS: &str = r#"
    cs.id, cs.course_id, co.name AS course_name, cs.coach_id, u.name AS coach_name,
    cs.name, cs.location, cs.capacity
"#;
const CLASS_SESSION_FROM: &str = r#"
    FROM class_sessions cs
    JOIN courses co ON co.id = cs.course_id
    LEFT JOIN coaches c ON c.id = cs.coach_id
    LEFT JOIN users u ON u.id = c.user_id
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClassSession {
    pub course_id: u64,
    pub coach_id: Option<u64>,
    #[schema(example = "Saturday Morning A")]
    pub name: String,
    #[schema(example = "Pool 2")]
    pub location: Option<String>,
    #[schema(example = 12)]
    pub capacity: u32,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateClassSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

const CLASS_SESSION_UPDATABLE: [&str; 5] = ["course_id", "coach_id", "name", "location", "capacity"];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassSessionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub course_id: Option<u64>,
    pub coach_id: Option<u64>,
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/class-sessions",
    params(ClassSessionQuery),
    responses((status = 200, description = "Paginated class session list", body = ClassSessionPage)),
    tag = "Class sessions",
    security(("bearer_auth" = []))
)]
pub async fn list_class_sessions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ClassSessionQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::ClassSessions, Action::Read)?;

    let mut filters = Filters::new();
    filters
        .opt_u64("cs.course_id = ?", query.course_id)
        .opt_u64("cs.coach_id = ?", query.coach_id)
        .search(&["cs.name", "cs.location", "co.name"], query.search.as_deref());

    let page = fetch_page::<ClassSession>(
        pool.get_ref(),
        CLASS_SESSION_COLUMNS,
        CLASS_SESSION_FROM,
        &filters,
        "co.name ASC, cs.name ASC",
        Pagination::new(query.page, query.per_page),
        "Class session",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/class-sessions/{id}",
    params(("id", Path, description = "Class session id")),
    responses(
        (status = 200, description = "Class session", body = ClassSession),
        (status = 404, description = "Class session not found")
    ),
    tag = "Class sessions",
    security(("bearer_auth" = []))
)]
pub async fn get_class_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::ClassSessions, Action::Read)?;

    let session = sqlx::query_as::<_, ClassSession>(&format!(
        "SELECT {CLASS_SESSION_COLUMNS} {CLASS_SESSION_FROM} WHERE cs.id = ?"
    ))
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("fetch class session", e))?
    .ok_or_else(|| ApiError::not_found("Class session"))?;

    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    post,
    path = "/api/v1/class-sessions",
    request_body = CreateClassSession,
    responses(
        (status = 201, description = "Class session created", body = Created),
        (status = 409, description = "Unknown course or coach"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Class sessions",
    security(("bearer_auth" = []))
)]
pub async fn create_class_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateClassSession>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::ClassSessions, Action::Write)?;

    let mut v = Validator::new();
    v.required("name", &payload.name)
        .max_len("name", &payload.name, 120)
        .check("capacity", payload.capacity > 0, "The capacity must be at least 1.");
    v.finish()?;

    let result = sqlx::query(
        "INSERT INTO class_sessions (course_id, coach_id, name, location, capacity) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(payload.course_id)
    .bind(payload.coach_id)
    .bind(payload.name.trim())
    .bind(payload.location.as_deref())
    .bind(payload.capacity)
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert class session", e))?;

    let id = result.last_insert_id();
    info!(class_session_id = id, course_id = payload.course_id, "Class session created");
    Ok(created("Class session", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/class-sessions/{id}",
    params(("id", Path, description = "Class session id")),
    request_body = UpdateClassSession,
    responses(
        (status = 200, description = "Class session updated", body = Object, example = json!({"message": "Class session updated successfully"})),
        (status = 404, description = "Class session not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Class sessions",
    security(("bearer_auth" = []))
)]
pub async fn update_class_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateClassSession>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::ClassSessions, Action::Write)?;

    let mut v = Validator::new();
    v.required_if_present("name", payload.name.as_deref());
    if let Some(capacity) = payload.capacity {
        v.check("capacity", capacity > 0, "The capacity must be at least 1.");
    }
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "class_sessions",
        "Class session",
        &payload.into_inner(),
        &CLASS_SESSION_UPDATABLE,
        path.into_inner(),
    )
    .await?;

    Ok(message("Class session updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/class-sessions/{id}",
    params(("id", Path, description = "Class session id")),
    responses(
        (status = 200, description = "Class session and its schedules deleted"),
        (status = 404, description = "Class session not found")
    ),
    tag = "Class sessions",
    security(("bearer_auth" = []))
)]
pub async fn delete_class_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::ClassSessions, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "class_sessions", "Class session", id).await?;
    info!(class_session_id = id, deleted_by = auth.user_id, "Class session deleted");
    Ok(message("Class session deleted successfully"))
}
