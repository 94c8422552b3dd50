use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct GalleryImage {
    pub id: u64,
    #[schema(example = "gallery/0b7d4c1e9a2f4e3d8c6b5a4f3e2d1c0b.jpg")]
    pub path: String,
    pub caption: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
