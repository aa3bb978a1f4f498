use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkAttendanceReq {
    /// JPEG or PNG photo, base64 encoded. A `data:image/...;base64,` prefix is accepted.
    #[schema(example = "/9j/4AAQSkZJRgABAQAAAQABAAD...")]
    pub image_base64: Option<String>,

    /// Client side capture time. The server time is used when absent.
    #[schema(example = "2024-01-01T10:00:00")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAttendanceResponse {
    #[schema(example = true)]
    pub ok: bool,
    #[schema(example = "2024-01-01T10:00:00")]
    pub timestamp: String,
    #[schema(example = "/attendance_images/3c9a8e1f0b7d4e2a9c6f5b4a3d2e1f0a.jpg")]
    pub image_path: String,
    #[schema(example = "Unknown Person")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct RecentAttendance {
    #[schema(example = "Unknown Person")]
    pub person_text: String,
    #[schema(example = "2024-01-01T10:00:00")]
    pub timestamp: String,
    #[schema(example = "/attendance_images/3c9a8e1f0b7d4e2a9c6f5b4a3d2e1f0a.jpg")]
    pub image_path: String,
}
