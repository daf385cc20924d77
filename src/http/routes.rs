use crate::http;
use actix_web::web;

/// Mount the operational endpoints at the root scope.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(http::health::init_routes)
        .configure(http::exposition::init_routes)
        .configure(http::version::init_routes);
}
