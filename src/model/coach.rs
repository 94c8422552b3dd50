use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Coach {
    #[schema(example = 4)]
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "Andi Wijaya")]
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Butterfly, competitive training")]
    pub specialty: Option<String>,
    pub bio: Option<String>,
    /// Relative path under the public disk, e.g. `coach/<uuid>.jpg`.
    pub photo_path: Option<String>,
}
