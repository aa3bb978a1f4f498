use crate::{
    api::{attendance, dashboard},
    config::Config,
};
use actix_cors::Cors;
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, error::InternalError, http::header, web};
use serde_json::json;
use tracing::warn;

/// CORS for dashboards served from another origin. Any origin when none are configured.
pub fn cors(config: &Config) -> Cors {
    if config.cors_origins.is_empty() {
        return Cors::permissive();
    }
    config
        .cors_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(["GET", "POST"])
        .allowed_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Per peer IP limiter, `None` when disabled
    fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
        if requests_per_min == 0 {
            return None;
        }
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()?;
        Some(Governor::new(&cfg))
    }

    let json_config = web::JsonConfig::default()
        .limit(config.json_limit_bytes)
        .error_handler(|err, _req| {
            warn!(error = %err, "rejected request body");
            let resp = HttpResponse::BadRequest().json(json!({
                "ok": false,
                "error": "Invalid JSON body"
            }));
            InternalError::from_response(err, resp).into()
        });

    let mark = web::resource("/mark_attendance")
        .app_data(json_config)
        .route(web::post().to(attendance::mark_attendance));

    match build_limiter(config.rate_submit_per_min) {
        Some(limiter) => cfg.service(mark.wrap(limiter)),
        None => cfg.service(mark),
    };

    cfg.service(
        web::resource("/get_recent_attendance")
            .route(web::get().to(attendance::get_recent_attendance)),
    )
    .service(
        web::resource("/attendance_images/{filename}")
            .route(web::get().to(attendance::attendance_image)),
    )
    .service(web::resource("/").route(web::get().to(dashboard::dashboard)));
}
