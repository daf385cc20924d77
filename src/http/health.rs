//! Simple liveness / readiness probes.
//!
//! Probe paths are excluded from request metrics by default so synthetic
//! traffic never skews latency or error-rate signals.

use actix_web::{get, web, HttpResponse, Responder};

#[get("/healthz")]
pub async fn healthz() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[get("/readyz")]
pub async fn readyz() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz).service(readyz);
}
