use crate::{api::attendance, config::Config, error::AppError};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

// Helper to build per-route limiter. Rates are validated non-zero by Config.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = (60_000 / u64::from(requests_per_min.max(1))).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst always build a governor config");
    Governor::new(&cfg)
}

/// Bad JSON bodies answer in the same `{"message": ...}` shape as every
/// other client error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::invalid_input(format!("Invalid JSON body: {err}")).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let mark_limiter = Arc::new(build_limiter(config.rate_mark_per_min));
    let scan_limiter = Arc::new(build_limiter(config.rate_scan_per_min));
    let read_limiter = Arc::new(build_limiter(config.rate_read_per_min));

    cfg.app_data(json_config());

    cfg.service(
        web::scope(&config.api_prefix)
            // /mark_attendance
            .service(
                web::resource("/mark_attendance")
                    .wrap(mark_limiter)
                    .route(web::post().to(attendance::mark_attendance)),
            )
            // /scan
            .service(
                web::resource("/scan")
                    .wrap(scan_limiter)
                    .route(web::post().to(attendance::scan_image)),
            )
            // /db_dump
            .service(
                web::resource("/db_dump")
                    .wrap(read_limiter.clone())
                    .route(web::get().to(attendance::db_dump)),
            )
            // /export_csv?date=YYYY-MM-DD
            .service(
                web::resource("/export_csv")
                    .wrap(read_limiter.clone())
                    .route(web::get().to(attendance::export_csv)),
            )
            // /check_attendance
            .service(
                web::resource("/check_attendance")
                    .wrap(read_limiter)
                    .route(web::get().to(attendance::check_attendance)),
            ),
    );
}
