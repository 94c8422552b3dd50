pub mod attendance;
pub mod class_sessions;
pub mod coaches;
pub mod content;
pub mod courses;
pub mod employee_attendance;
pub mod employee_sessions;
pub mod enrolments;
pub mod expenses;
pub mod gallery;
pub mod health;
pub mod members;
pub mod payments;
pub mod reports;
pub mod schedules;
pub mod users;

use actix_web::{HttpRequest, HttpResponse, http::header};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Body of every successful create.
#[derive(Debug, Serialize, ToSchema)]
pub struct Created {
    #[schema(example = "Member created successfully")]
    pub message: String,
    #[schema(example = 42)]
    pub id: u64,
}

pub(crate) fn created(entity: &str, id: u64) -> HttpResponse {
    HttpResponse::Created().json(Created {
        message: format!("{entity} created successfully"),
        id,
    })
}

pub(crate) fn message(text: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": text.into() }))
}

/// Content type of a raw upload, empty when the header is missing.
pub(crate) fn content_type(req: &HttpRequest) -> String {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
