use actix_web::{HttpResponse, Responder};
use serde_json::json;

/// Liveness only; it never touches the database.
#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "Process is up", body = Object, example = json!({"status": "ok"}))),
    tag = "Operational"
)]
pub async fn healthz() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
