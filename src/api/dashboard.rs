use crate::config::Config;
use actix_web::{HttpResponse, web};
use tracing::warn;

const DEFAULT_DASHBOARD: &str = include_str!("../../static/dashboard.html");

/// Dashboard page
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Dashboard HTML", body = String, content_type = "text/html")
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(config: web::Data<Config>) -> HttpResponse {
    if let Some(path) = &config.dashboard_path {
        match tokio::fs::read(path).await {
            Ok(body) => return html(body),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "custom dashboard unreadable, serving built-in one")
            }
        }
    }
    html(DEFAULT_DASHBOARD)
}

fn html(body: impl actix_web::body::MessageBody + 'static) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}
