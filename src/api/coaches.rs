use crate::{
    api::{
        Created, content_type, created, message,
        users::{NewAccount, delete_account, insert_account, validate_account},
    },
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::{coach::Coach, role::Capability},
    storage::{ImageCategory, PublicStorage},
    utils::{
        db_utils::{CoachPage, Filters, Pagination, fetch_page, update_by_id},
        qr_lookup,
    },
    validation::Validator,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const COACH_COLUMNS: &str =
    "c.id, c.user_id, u.name, u.email, c.phone, c.specialty, c.bio, c.photo_path";
const COACH_FROM: &str = "FROM coaches c JOIN users u ON u.id = c.user_id";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCoach {
    #[schema(example = "Andi Wijaya")]
    pub name: String,
    #[schema(example = "andi@example.com", format = "email")]
    pub email: String,
    /// Defaults to the email address.
    pub username: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "Butterfly, competitive training")]
    pub specialty: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCoach {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct CoachPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct CoachUserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CoachQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Matches name, email or specialty
    pub search: Option<String>,
}

struct CoachAccount {
    user_id: u64,
    qr_token: String,
    photo_path: Option<String>,
}

async fn coach_account(pool: &MySqlPool, id: u64) -> Result<CoachAccount, ApiError> {
    let row = sqlx::query_as::<_, (u64, String, Option<String>)>(
        "SELECT c.user_id, u.qr_token, c.photo_path FROM coaches c JOIN users u ON u.id = c.user_id WHERE c.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::database("fetch coach account", e))?
    .ok_or_else(|| ApiError::not_found("Coach"))?;

    Ok(CoachAccount {
        user_id: row.0,
        qr_token: row.1,
        photo_path: row.2,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/coaches",
    params(CoachQuery),
    responses((status = 200, description = "Paginated coach list", body = CoachPage)),
    tag = "Coaches",
    security(("bearer_auth" = []))
)]
pub async fn list_coaches(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CoachQuery>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Coaches, Action::Read)?;

    let mut filters = Filters::new();
    filters.search(&["u.name", "u.email", "c.specialty"], query.search.as_deref());

    let page = fetch_page::<Coach>(
        pool.get_ref(),
        COACH_COLUMNS,
        COACH_FROM,
        &filters,
        "u.name ASC",
        Pagination::new(query.page, query.per_page),
        "Coach",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/coaches/{id}",
    params(("id", Path, description = "Coach id")),
    responses(
        (status = 200, description = "Coach", body = Coach),
        (status = 404, description = "Coach not found")
    ),
    tag = "Coaches",
    security(("bearer_auth" = []))
)]
pub async fn get_coach(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Coaches, Action::Read)?;

    let coach = sqlx::query_as::<_, Coach>(&format!("SELECT {COACH_COLUMNS} {COACH_FROM} WHERE c.id = ?"))
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("fetch coach", e))?
        .ok_or_else(|| ApiError::not_found("Coach"))?;

    Ok(HttpResponse::Ok().json(coach))
}

#[utoipa::path(
    post,
    path = "/api/v1/coaches",
    request_body = CreateCoach,
    responses(
        (status = 201, description = "Coach and login created", body = Created),
        (status = 409, description = "Email or username already taken"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Coaches",
    security(("bearer_auth" = []))
)]
pub async fn create_coach(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCoach>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Coaches, Action::Write)?;

    let payload = payload.into_inner();
    let username = payload
        .username
        .clone()
        .unwrap_or_else(|| payload.email.clone());

    let mut v = Validator::new();
    validate_account(
        &mut v,
        &payload.name,
        &username,
        &payload.email,
        payload.password.as_deref(),
    );
    if let Some(specialty) = &payload.specialty {
        v.max_len("specialty", specialty, 120);
    }
    v.finish()?;

    let account = NewAccount {
        name: payload.name,
        username,
        email: payload.email,
        password: payload.password,
        role: Capability::Coach,
        is_active: true,
    };

    let mut tx = pool.begin().await?;
    let (user_id, qr_token) = insert_account(&mut tx, &account).await?;

    let result = sqlx::query("INSERT INTO coaches (user_id, phone, specialty, bio) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(payload.phone.map(|s| s.trim().to_string()))
        .bind(payload.specialty.map(|s| s.trim().to_string()))
        .bind(payload.bio)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::database("insert coach", e))?;

    tx.commit().await?;
    qr_lookup::register(&qr_token);

    let id = result.last_insert_id();
    info!(coach_id = id, user_id, created_by = auth.user_id, "Coach created");
    Ok(created("Coach", id))
}

#[utoipa::path(
    put,
    path = "/api/v1/coaches/{id}",
    params(("id", Path, description = "Coach id")),
    request_body = UpdateCoach,
    responses(
        (status = 200, description = "Coach updated", body = Object, example = json!({"message": "Coach updated successfully"})),
        (status = 404, description = "Coach not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Coaches",
    security(("bearer_auth" = []))
)]
pub async fn update_coach(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateCoach>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Coaches, Action::Write)?;
    let id = path.into_inner();
    let payload = payload.into_inner();

    let mut v = Validator::new();
    v.required_if_present("name", payload.name.as_deref());
    if let Some(email) = &payload.email {
        v.email("email", email);
    }
    v.finish()?;

    let account = coach_account(pool.get_ref(), id).await?;

    let user_patch = CoachUserPatch {
        name: payload.name.map(|s| s.trim().to_string()),
        email: payload.email.map(|s| s.trim().to_string()),
    };
    let coach_patch = CoachPatch {
        phone: payload.phone,
        specialty: payload.specialty,
        bio: payload.bio,
    };
    let user_changed = user_patch.name.is_some() || user_patch.email.is_some();
    let coach_changed =
        coach_patch.phone.is_some() || coach_patch.specialty.is_some() || coach_patch.bio.is_some();

    if !user_changed && !coach_changed {
        return Err(ApiError::BadRequest("No fields provided for update".into()));
    }
    let mut tx = pool.begin().await?;
    if user_changed {
        update_by_id(&mut *tx, "users", "Coach", &user_patch, &["name", "email"], account.user_id).await?;
    }
    if coach_changed {
        update_by_id(&mut *tx, "coaches", "Coach", &coach_patch, &["phone", "specialty", "bio"], id).await?;
    }
    tx.commit().await?;
    if user_changed {
        qr_lookup::invalidate(&account.qr_token).await;
    }

    Ok(message("Coach updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/coaches/{id}/photo",
    params(("id", Path, description = "Coach id")),
    request_body(content = Vec<u8>, content_type = "image/jpeg", description = "Raw jpeg, png or webp bytes"),
    responses(
        (status = 200, description = "Photo replaced", body = Object, example = json!({"path": "coach/0b7d4c1e9a2f4e3d8c6b5a4f3e2d1c0b.jpg"})),
        (status = 400, description = "Unsupported type or too large"),
        (status = 404, description = "Coach not found")
    ),
    tag = "Coaches",
    security(("bearer_auth" = []))
)]
pub async fn upload_coach_photo(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    storage: web::Data<PublicStorage>,
    path: web::Path<u64>,
    body: web::Bytes,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Coaches, Action::Write)?;
    let id = path.into_inner();
    let content_type = content_type(&req);
    storage.check_upload(&content_type, body.len())?;

    let account = coach_account(pool.get_ref(), id).await?;

    let disk = storage.clone();
    let stored = web::block(move || {
        disk.replace(ImageCategory::Coach, account.photo_path.as_deref(), &content_type, &body)
    })
    .await??;

    sqlx::query("UPDATE coaches SET photo_path = ? WHERE id = ?")
        .bind(&stored)
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("store coach photo path", e))?;

    info!(coach_id = id, path = %stored, "Coach photo replaced");
    Ok(HttpResponse::Ok().json(json!({ "path": stored })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/coaches/{id}",
    params(("id", Path, description = "Coach id")),
    responses(
        (status = 200, description = "Coach and login deleted"),
        (status = 404, description = "Coach not found")
    ),
    tag = "Coaches",
    security(("bearer_auth" = []))
)]
pub async fn delete_coach(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    storage: web::Data<PublicStorage>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Coaches, Action::Write)?;
    let id = path.into_inner();

    let account = coach_account(pool.get_ref(), id).await?;
    delete_account(pool.get_ref(), account.user_id, &account.qr_token).await?;

    if let Some(photo) = account.photo_path {
        let disk = storage.clone();
        web::block(move || disk.delete(&photo)).await?;
    }

    info!(coach_id = id, deleted_by = auth.user_id, "Coach deleted");
    Ok(message("Coach deleted successfully"))
}
