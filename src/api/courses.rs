use crate::{
    api::{Created, created, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::course::{Course, CourseLevel},
    utils::db_utils::{CoursePage, Filters, Pagination, delete_by_id, fetch_page, update_by_id},
    validation::Validator,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const COURSE_COLUMNS: &str = "id, name, description, level, price, total_sessions, is_active";
const COURSE_FROM: &str = "FROM courses";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourse {
    #[schema(example = "Kids Beginner")]
    pub name: String,
    pub description: Option<String>,
    pub level: Option<CourseLevel>,
    #[schema(example = 600000.0)]
    pub price: f64,
    #[schema(example = 8)]
    pub total_sessions: u32,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCourse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sessions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

const COURSE_UPDATABLE: [&str; 6] = ["name", "description", "level", "price", "total_sessions", "is_active"];

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub level: Option<CourseLevel>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(CourseQuery),
    responses((status = 200, description = "Paginated course list", body = CoursePage)),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
pub async fn list_courses(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CourseQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Courses, Action::Read)?;

    let mut filters = Filters::new();
    filters
        .opt_str("level = ?", query.level.as_ref().map(|l| l.as_ref()))
        .opt_bool("is_active = ?", query.is_active)
        .search(&["name", "description"], query.search.as_deref());

    let page = fetch_page::<Course>(
        pool.get_ref(),
        COURSE_COLUMNS,
        COURSE_FROM,
        &filters,
        "name ASC",
        Pagination::new(query.page, query.per_page),
        "Course",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id", Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
pub async fn get_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Courses, Action::Read)?;

    let course = sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} {COURSE_FROM} WHERE id = ?"))
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("fetch course", e))?
        .ok_or_else(|| ApiError::not_found("Course"))?;

    Ok(HttpResponse::Ok().json(course))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CreateCourse,
    responses(
        (status = 201, description = "Course created", body = Created),
        (status = 422, description = "Validation failed")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
pub async fn create_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCourse>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Courses, Action::Write)?;

    let mut v = Validator::new();
    v.required("name", &payload.name)
        .max_len("name", &payload.name, 120)
        .non_negative("price", payload.price)
        .check(
            "total_sessions",
            payload.total_sessions > 0,
            "The total sessions must be at least 1.",
        );
    v.finish()?;

    let level = payload.level.unwrap_or(CourseLevel::Beginner);
    let result = sqlx::query(
        r#"
        INSERT INTO courses (name, description, level, price, total_sessions, is_active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.description.as_deref())
    .bind(level.as_ref())
    .bind(payload.price)
    .bind(payload.total_sessions)
    .bind(payload.is_active.unwrap_or(true))
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::database("insert course", e))?;

    let id = result.last_insert_id();
    info!(course_id = id, created_by = auth.user_id, "Course created");
    Ok(created("Course", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id", Path, description = "Course id")),
    request_body = UpdateCourse,
    responses(
        (status = 200, description = "Course updated", body = Object, example = json!({"message": "Course updated successfully"})),
        (status = 404, description = "Course not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
pub async fn update_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateCourse>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Courses, Action::Write)?;

    let mut v = Validator::new();
    v.required_if_present("name", payload.name.as_deref());
    if let Some(price) = payload.price {
        v.non_negative("price", price);
    }
    if let Some(total) = payload.total_sessions {
        v.check("total_sessions", total > 0, "The total sessions must be at least 1.");
    }
    v.finish()?;

    update_by_id(
        pool.get_ref(),
        "courses",
        "Course",
        &payload.into_inner(),
        &COURSE_UPDATABLE,
        path.into_inner(),
    )
    .await?;

    Ok(message("Course updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id", Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course still has classes or enrolments")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
pub async fn delete_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Courses, Action::Write)?;
    let id = path.into_inner();
    delete_by_id(pool.get_ref(), "courses", "Course", id).await?;
    info!(course_id = id, deleted_by = auth.user_id, "Course deleted");
    Ok(message("Course deleted successfully"))
}
