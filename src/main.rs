use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::io;

use swim_admin::config::Config;
use swim_admin::db::init_db;
use swim_admin::docs::ApiDoc;
use swim_admin::routes::{self, Limiters};
use swim_admin::storage::PublicStorage;
use swim_admin::utils::qr_lookup;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn startup_error(e: anyhow::Error) -> io::Error {
    io::Error::other(format!("{e:#}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(startup_error)?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, timezone = %config.timezone, "Server starting...");

    let pool = init_db(&config).await.map_err(startup_error)?;
    let limiters = Limiters::from_config(&config).map_err(startup_error)?;
    let storage = PublicStorage::new(&config.public_dir, config.max_upload_bytes);

    let pool_for_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = qr_lookup::warmup(&pool_for_warmup, 500).await {
            error!(error = %e, "Failed to warm up QR code filter");
        }
    });

    let server_addr = config.server_addr.clone();
    let pool = Data::new(pool);
    let config = Data::new(config);
    let storage = Data::new(storage);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/docs/{_:.*}") // wildcard so the JS/CSS assets match
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(storage.clone())
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await
}
