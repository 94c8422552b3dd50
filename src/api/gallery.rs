use crate::{
    api::{content_type, message},
    auth::{
        access::{Action, Area},
        auth::AuthUser,
    },
    error::ApiError,
    model::gallery::GalleryImage,
    storage::{ImageCategory, PublicStorage},
    utils::db_utils::{Filters, GalleryPage, PageQuery, Pagination, fetch_page},
    validation::Validator,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const CAPTION_MAX: usize = 255;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCaption {
    /// Empty clears the caption.
    pub caption: Option<String>,
}

fn clean_caption(v: &mut Validator, caption: Option<&str>) -> Option<String> {
    let caption = caption.map(str::trim).filter(|c| !c.is_empty())?;
    v.max_len("caption", caption, CAPTION_MAX);
    Some(caption.to_string())
}

async fn find_image(pool: &MySqlPool, id: u64) -> Result<GalleryImage, ApiError> {
    sqlx::query_as::<_, GalleryImage>("SELECT id, path, caption, created_at FROM gallery_images WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::database("fetch gallery image", e))?
        .ok_or_else(|| ApiError::not_found("Gallery image"))
}

#[utoipa::path(
    get,
    path = "/api/v1/gallery",
    params(PageQuery),
    responses((status = 200, description = "Gallery images, newest first", body = GalleryPage)),
    tag = "Content"
)]
pub async fn list_gallery(
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, ApiError> {
    let page = fetch_page::<GalleryImage>(
        pool.get_ref(),
        "id, path, caption, created_at",
        "FROM gallery_images",
        &Filters::new(),
        "created_at DESC, id DESC",
        Pagination::new(query.page, query.per_page),
        "Gallery image",
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/gallery/{id}",
    params(("id", Path, description = "Gallery image id")),
    responses(
        (status = 200, description = "Gallery image", body = GalleryImage),
        (status = 404, description = "Gallery image not found")
    ),
    tag = "Content"
)]
pub async fn get_gallery_image(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let image = find_image(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(image))
}

#[utoipa::path(
    post,
    path = "/api/v1/gallery",
    params(UploadQuery),
    request_body(content = Vec<u8>, description = "Raw jpeg, png or webp bytes", content_type = "image/*"),
    responses(
        (status = 201, description = "Image stored", body = GalleryImage),
        (status = 400, description = "Unsupported type or size"),
        (status = 422, description = "Caption too long")
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn upload_gallery_image(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    storage: web::Data<PublicStorage>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Content, Action::Write)?;

    let mut v = Validator::new();
    let caption = clean_caption(&mut v, query.caption.as_deref());
    v.finish()?;

    let content_type = content_type(&req);
    storage.check_upload(&content_type, body.len())?;

    let disk = storage.clone();
    let stored = web::block(move || disk.store(ImageCategory::Gallery, &content_type, &body)).await??;

    let result = sqlx::query("INSERT INTO gallery_images (path, caption) VALUES (?, ?)")
        .bind(&stored)
        .bind(caption.as_deref())
        .execute(pool.get_ref())
        .await;

    let id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) => {
            // the row never landed, so the file would be orphaned
            let disk = storage.clone();
            let orphan = stored.clone();
            web::block(move || disk.delete(&orphan)).await?;
            return Err(ApiError::database("insert gallery image", e));
        }
    };

    info!(gallery_image_id = id, path = %stored, uploaded_by = auth.user_id, "Gallery image stored");
    let image = find_image(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(image))
}

#[utoipa::path(
    put,
    path = "/api/v1/gallery/{id}",
    params(("id", Path, description = "Gallery image id")),
    request_body = UpdateCaption,
    responses(
        (status = 200, description = "Caption updated", body = GalleryImage),
        (status = 404, description = "Gallery image not found")
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn update_gallery_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateCaption>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Content, Action::Write)?;
    let id = path.into_inner();

    let mut v = Validator::new();
    let caption = clean_caption(&mut v, payload.caption.as_deref());
    v.finish()?;

    let result = sqlx::query("UPDATE gallery_images SET caption = ? WHERE id = ?")
        .bind(caption.as_deref())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("update gallery caption", e))?;

    // MySQL reports 0 affected rows when the caption is unchanged
    let image = find_image(pool.get_ref(), id).await?;
    if result.rows_affected() > 0 {
        info!(gallery_image_id = id, "Gallery caption updated");
    }
    Ok(HttpResponse::Ok().json(image))
}

#[utoipa::path(
    delete,
    path = "/api/v1/gallery/{id}",
    params(("id", Path, description = "Gallery image id")),
    responses(
        (status = 200, description = "Image and file deleted"),
        (status = 404, description = "Gallery image not found")
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn delete_gallery_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    storage: web::Data<PublicStorage>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.authorize(Area::Content, Action::Write)?;
    let id = path.into_inner();
    let image = find_image(pool.get_ref(), id).await?;

    sqlx::query("DELETE FROM gallery_images WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::database("delete gallery image", e))?;

    let disk = storage.clone();
    web::block(move || disk.delete(&image.path)).await?;

    info!(gallery_image_id = id, deleted_by = auth.user_id, "Gallery image deleted");
    Ok(message("Gallery image deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_caption_is_cleared() {
        let mut v = Validator::new();
        assert_eq!(clean_caption(&mut v, Some("   ")), None);
        assert_eq!(clean_caption(&mut v, None), None);
        assert!(v.is_valid());
    }

    #[test]
    fn caption_is_trimmed_and_bounded() {
        let mut v = Validator::new();
        assert_eq!(clean_caption(&mut v, Some("  Gala 2026 ")).as_deref(), Some("Gala 2026"));
        assert!(v.is_valid());

        let long = "x".repeat(CAPTION_MAX + 1);
        clean_caption(&mut v, Some(&long));
        assert!(!v.is_valid());
    }
}
