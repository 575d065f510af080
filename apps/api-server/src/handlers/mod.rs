//! HTTP handlers and route configuration.

mod health;
mod ping;

use actix_web::web;

use crate::middleware::RateLimitMiddleware;
use crate::state::AppState;

/// Configure all application routes.
///
/// `/api/health` stays outside the limiter; everything else under `/api` is
/// rate limited per client IP.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.route("/api/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .wrap(RateLimitMiddleware::new(state.clone()))
                .route("/ping", web::get().to(ping::ping)),
        );
}
