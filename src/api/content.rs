use std::str::FromStr;

use crate::{
    api::{content_type, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::site_setting::{ImageSlot, SITE_CONTENT_KEYS, SiteContent, SiteContentPatch},
    storage::PublicStorage,
    validation::Validator,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;

const UPSERT_SETTING: &str =
    "INSERT INTO site_settings (`key`, `value`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `value` = VALUES(`value`)";

/// Longest value for the single-line fields; the long texts are unbounded.
const SHORT_FIELD_MAX: usize = 255;
const LONG_FIELDS: [&str; 2] = ["about_text", "history_text"];

async fn load_content(pool: &MySqlPool) -> Result<SiteContent, ApiError> {
    let placeholders = vec!["?"; SITE_CONTENT_KEYS.len()].join(", ");
    let sql = format!("SELECT `key`, `value` FROM site_settings WHERE `key` IN ({placeholders})");

    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    for key in SITE_CONTENT_KEYS {
        query = query.bind(key);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| ApiError::database("fetch site content", e))?;

    Ok(SiteContent::from_rows(rows))
}

async fn upsert_setting(conn: &mut MySqlConnection, key: &str, value: &str) -> Result<(), ApiError> {
    sqlx::query(UPSERT_SETTING)
        .bind(key)
        .bind(value)
        .execute(conn)
        .await
        .map_err(|e| ApiError::database("upsert site setting", e))?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/content",
    responses((status = 200, description = "Public site content, defaults filled in", body = SiteContent)),
    tag = "Content"
)]
pub async fn show_content(pool: web::Data<MySqlPool>) -> Result<impl Responder, ApiError> {
    let content = load_content(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(content))
}

#[utoipa::path(
    put,
    path = "/api/v1/content",
    request_body = SiteContentPatch,
    responses(
        (status = 200, description = "Updated content", body = SiteContent),
        (status = 400, description = "Nothing to update"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn update_content(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SiteContentPatch>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Content, Action::Write)?;

    let rows = payload.rows();
    if rows.is_empty() {
        return Err(ApiError::BadRequest("No valid fields to update".into()));
    }

    let mut v = Validator::new();
    for (key, value) in &rows {
        if !LONG_FIELDS.contains(key) {
            v.max_len(key, value, SHORT_FIELD_MAX);
        }
        if *key == "contact_email" && !value.is_empty() {
            v.email(key, value);
        }
    }
    v.finish()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiError::database("begin content update", e))?;
    for (key, value) in &rows {
        upsert_setting(&mut tx, key, value).await?;
    }
    tx.commit()
        .await
        .map_err(|e| ApiError::database("commit content update", e))?;

    info!(keys = rows.len(), updated_by = auth.user_id, "Site content updated");
    let content = load_content(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(content))
}

#[utoipa::path(
    put,
    path = "/api/v1/content/images/{slot}",
    params(("slot", Path, description = "`hero` or `history`")),
    request_body(content = Vec<u8>, description = "Raw jpeg, png or webp bytes", content_type = "image/*"),
    responses(
        (status = 200, description = "Image replaced", body = Object, example = json!({"path": "hero/0b7d4c1e9a2f4e3d8c6b5a4f3e2d1c0b.jpg"})),
        (status = 400, description = "Unsupported type or size"),
        (status = 404, description = "Unknown slot")
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn update_content_image(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    storage: web::Data<PublicStorage>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Content, Action::Write)?;
    let slot = ImageSlot::from_str(&path.into_inner())
        .map_err(|_| ApiError::NotFound("Image slot not found".into()))?;
    let content_type = content_type(&req);
    storage.check_upload(&content_type, body.len())?;

    let previous = load_content(pool.get_ref())
        .await?
        .image(slot)
        .map(str::to_string);

    let disk = storage.clone();
    let stored = web::block(move || {
        disk.replace(slot.category(), previous.as_deref(), &content_type, &body)
    })
    .await??;

    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| ApiError::database("acquire connection", e))?;
    upsert_setting(&mut conn, slot.key(), &stored).await?;

    info!(slot = %slot, path = %stored, "Site image replaced");
    Ok(HttpResponse::Ok().json(json!({ "path": stored })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/content/images/{slot}",
    params(("slot", Path, description = "`hero` or `history`")),
    responses(
        (status = 200, description = "Image removed"),
        (status = 404, description = "Unknown slot")
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn delete_content_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    storage: web::Data<PublicStorage>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Content, Action::Write)?;
    let slot = ImageSlot::from_str(&path.into_inner())
        .map_err(|_| ApiError::NotFound("Image slot not found".into()))?;

    let previous = load_content(pool.get_ref())
        .await?
        .image(slot)
        .map(str::to_string);

    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| ApiError::database("acquire connection", e))?;
    upsert_setting(&mut conn, slot.key(), "").await?;

    if let Some(old) = previous {
        let disk = storage.clone();
        web::block(move || disk.delete(&old)).await?;
    }

    info!(slot = %slot, "Site image removed");
    Ok(message("Image removed successfully"))
}
