use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde_json::json;

/// Everything a request against the attendance service can fail with.
///
/// The `Display` output is the full internal detail and goes to the logs.
/// Clients only ever see [`AttendanceError::client_message`].
#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "no image received")]
    MissingImage,

    #[display(fmt = "no face detected")]
    NoFace,

    #[display(fmt = "spoof detected")]
    Spoof,

    #[display(fmt = "attendance already marked for {} on {}", name, date)]
    AlreadyMarked { name: String, date: String },

    #[display(fmt = "image not found: {}", _0)]
    ImageNotFound(String),

    #[display(fmt = "invalid image payload: {}", _0)]
    InvalidPayload(String),

    #[display(fmt = "collaborator failure: {}", _0)]
    Collaborator(String),

    #[display(fmt = "storage error: {}", _0)]
    Storage(String),

    #[display(fmt = "io error: {}", _0)]
    Io(String),
}

impl AttendanceError {
    /// The fixed message a client is allowed to see.
    pub fn client_message(&self) -> &'static str {
        match self {
            AttendanceError::MissingImage => "No image received",
            AttendanceError::NoFace => "No face detected",
            AttendanceError::Spoof => "Spoof detected",
            AttendanceError::AlreadyMarked { .. } => "Attendance already marked for today",
            AttendanceError::ImageNotFound(_) => "Image not found",
            AttendanceError::InvalidPayload(_) => "Image payload could not be decoded",
            AttendanceError::Collaborator(_)
            | AttendanceError::Storage(_)
            | AttendanceError::Io(_) => "Internal server error",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::MissingImage => StatusCode::BAD_REQUEST,
            AttendanceError::NoFace | AttendanceError::Spoof => StatusCode::FORBIDDEN,
            AttendanceError::AlreadyMarked { .. } => StatusCode::CONFLICT,
            AttendanceError::ImageNotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::InvalidPayload(_)
            | AttendanceError::Collaborator(_)
            | AttendanceError::Storage(_)
            | AttendanceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        HttpResponse::build(status).json(json!({
            "ok": false,
            "error": self.client_message()
        }))
    }
}

impl From<sqlx::Error> for AttendanceError {
    fn from(e: sqlx::Error) -> Self {
        AttendanceError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for AttendanceError {
    fn from(e: std::io::Error) -> Self {
        AttendanceError::Io(e.to_string())
    }
}

impl From<base64::DecodeError> for AttendanceError {
    fn from(e: base64::DecodeError) -> Self {
        AttendanceError::InvalidPayload(e.to_string())
    }
}

impl From<actix_web::error::BlockingError> for AttendanceError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AttendanceError::Collaborator(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AttendanceError::MissingImage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AttendanceError::NoFace.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AttendanceError::Spoof.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AttendanceError::AlreadyMarked {
                name: "Unknown Person".into(),
                date: "2024-01-01".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AttendanceError::ImageNotFound("x.jpg".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttendanceError::Storage("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_detail_is_not_sent_to_clients() {
        let err = AttendanceError::Storage("no such table: attendance at /var/db".into());
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("/var/db"));
    }
}
