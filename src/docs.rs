use crate::model::attendance::AttendanceRecord;
use crate::models::{MarkAttendanceReq, MarkAttendanceResponse, RecentAttendance};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Face Attendance API",
        version = "0.1.0",
        description = r#"
## Face Attendance

Marks attendance from a single photo.

### Flow
1. The client posts a base64 photo to `/mark_attendance`.
2. The photo must contain a face and pass the liveness check.
3. One attendance per person per calendar day; repeats get `409`.
4. The photo is kept and served under `/attendance_images/`.

### Errors
Failures answer `{"ok": false, "error": "<message>"}`. Internal details are logged, not returned.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::get_recent_attendance,
        crate::api::attendance::attendance_image,
        crate::api::dashboard::dashboard,
    ),
    components(
        schemas(
            AttendanceRecord,
            MarkAttendanceReq,
            MarkAttendanceResponse,
            RecentAttendance,
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance marking APIs"),
        (name = "Dashboard", description = "Browser dashboard"),
    )
)]
pub struct ApiDoc;
