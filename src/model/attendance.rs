use crate::utils::image_store::StoredImage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted check-in. Created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "9f1c0a7e4b2d4c1e8a3f5b6c7d8e9f01")]
    pub id: String,

    #[schema(example = "Unknown Person")]
    pub name: String,

    #[schema(example = "2024-01-01T10:00:00")]
    pub timestamp: String,

    /// Server-local calendar date, `YYYY-MM-DD`.
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub date: String,

    #[schema(example = "attendance_images/3c9a8e1f0b7d4e2a9c6f5b4a3d2e1f0a.jpg")]
    pub image_path: String,
}

impl AttendanceRecord {
    /// A new row with a fresh random id.
    pub fn new(name: String, timestamp: String, date: String, image: &StoredImage) -> Self {
        Self {
            id: Uuid::new_v4().to_simple().to_string(),
            name,
            timestamp,
            date,
            image_path: image.relative_path.clone(),
        }
    }
}
