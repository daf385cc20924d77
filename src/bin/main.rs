use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use prometheus::Registry;
use std::env;
use turnstile::{http, BuildIdentity, RequestMetrics, RouteSet, ServerMetrics};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Configuration
    let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());

    // Metric set, registered for the lifetime of the process
    let identity = BuildIdentity::detect();
    let registry = Registry::new();
    let metrics = ServerMetrics::new(&identity).context("build server metrics")?;
    metrics
        .register(&registry)
        .context("register server metrics")?;

    log::info!("starting {} {} on {}", identity.name, identity.version, server_addr);

    let app_metrics = metrics.clone();
    let app_registry = registry.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestMetrics::new(app_metrics.clone()).routes(RouteSet::new(["/version"])))
            .app_data(web::Data::new(app_registry.clone()))
            .app_data(web::Data::new(identity.clone()))
            .configure(http::routes::init_routes)
    })
    .bind(&server_addr)?
    .run()
    .await?;

    metrics.unregister(&registry);
    Ok(())
}
