//! Reports the build identity of the running binary.

use actix_web::{get, web, HttpResponse, Responder};

use crate::identity::BuildIdentity;

#[get("/version")]
pub async fn version(identity: web::Data<BuildIdentity>) -> impl Responder {
    HttpResponse::Ok().json(identity.get_ref())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(version);
}
