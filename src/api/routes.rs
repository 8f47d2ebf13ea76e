// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no credentials involved)
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/api")
                .route("/feed", web::get().to(handlers::read_feed))
                .route("/search", web::get().to(handlers::read_search))
                .service(
                    web::resource("/stamp-uploader")
                        .route(web::post().to(handlers::stamp_uploader))
                        .default_service(web::route().to(handlers::method_not_allowed)),
                ),
        );
}
