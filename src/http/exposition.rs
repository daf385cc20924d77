//! Prometheus text exposition endpoint.

use actix_web::{get, web, HttpResponse, Responder};
use prometheus::{Encoder, Registry, TextEncoder};

/// Render the current values of every registered collector.
///
/// An encoding failure is logged and answered with a plain 500; the
/// exposition path can never affect request handling.
#[get("/metrics")]
pub async fn metrics(registry: web::Data<Registry>) -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        log::error!("failed to encode metrics: {err}");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(metrics);
}
