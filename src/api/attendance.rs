use crate::error::AttendanceError;
use crate::models::{MarkAttendanceReq, MarkAttendanceResponse, RecentAttendance};
use crate::service::AttendanceService;
use actix_files::NamedFile;
use actix_web::{HttpResponse, web};
use std::io;
use std::path::PathBuf;

/// Mark attendance from a photo
#[utoipa::path(
    post,
    path = "/mark_attendance",
    request_body = MarkAttendanceReq,
    responses(
        (status = 200, description = "Attendance marked", body = MarkAttendanceResponse),
        (status = 400, description = "No image received", body = Object, example = json!({
            "ok": false, "error": "No image received"
        })),
        (status = 403, description = "No face detected or spoof detected", body = Object, example = json!({
            "ok": false, "error": "No face detected"
        })),
        (status = 409, description = "Already marked today", body = Object, example = json!({
            "ok": false, "error": "Attendance already marked for today"
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "ok": false, "error": "Internal server error"
        }))
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    service: web::Data<AttendanceService>,
    payload: web::Json<MarkAttendanceReq>,
) -> Result<HttpResponse, AttendanceError> {
    let marked = service.submit(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(marked))
}

/// Latest attendance entries, newest first
#[utoipa::path(
    get,
    path = "/get_recent_attendance",
    responses(
        (status = 200, description = "Up to 10 recent entries", body = [RecentAttendance]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn get_recent_attendance(
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AttendanceError> {
    let recent = service.recent().await?;
    Ok(HttpResponse::Ok().json(recent))
}

/// Stored attendance photo
#[utoipa::path(
    get,
    path = "/attendance_images/{filename}",
    params(
        ("filename" = String, Path, description = "Image file name as returned by mark_attendance")
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Image not found")
    ),
    tag = "Attendance"
)]
pub async fn attendance_image(
    service: web::Data<AttendanceService>,
    filename: web::Path<String>,
) -> Result<NamedFile, AttendanceError> {
    let path = service.image_file(&filename).await?;
    open_image(path, &filename).await
}

/// The file can vanish between lookup and open; that is still a 404.
async fn open_image(path: PathBuf, filename: &str) -> Result<NamedFile, AttendanceError> {
    NamedFile::open_async(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AttendanceError::ImageNotFound(filename.to_string()),
        _ => e.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::testing::collaborators;
    use crate::service::tests::{request, service_with};
    use actix_web::{ResponseError, http::StatusCode};

    #[actix_web::test]
    async fn image_removed_after_lookup_is_not_found() {
        let (service, _tmp) = service_with(collaborators(1, true)).await;
        let resp = service.submit(request(None)).await.unwrap();
        let filename = resp.image_path.rsplit('/').next().unwrap().to_string();

        let path = service.image_file(&filename).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let Err(err) = open_image(path, &filename).await else {
            panic!("opened a deleted image");
        };
        assert!(matches!(&err, AttendanceError::ImageNotFound(f) if *f == filename));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
