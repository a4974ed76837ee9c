/// Thumbnail Service - HTTP Server
///
/// Serves `GET /thumbnail/{id}/{size}/[{format}/]` with a 302 to the
/// derivative's public URL, generating and caching derivatives on demand.
use actix_web::{middleware as actix_middleware, web, App, HttpResponse, HttpServer};
use std::io;
use std::sync::Arc;
use thumbnail_service::db::owner_repo::PgOwnerDirectory;
use thumbnail_service::db::thumbnail_repo::PgThumbnailStore;
use thumbnail_service::db::DataStore;
use thumbnail_service::events::{EventPublisher, NoopPublisher, WebhookPublisher};
use thumbnail_service::handlers;
use thumbnail_service::services::ThumbnailService;
use thumbnail_service::storage::FsMediaStorage;
use thumbnail_service::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!(env = %config.app.env, "Thumbnail service starting on {bind_address}");

    // Connect primary and replica pools
    let store = DataStore::connect(&config.database)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(store.writer())
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Migration failed: {e}")))?;

    let events: Arc<dyn EventPublisher> = match &config.events.webhook_url {
        Some(url) => Arc::new(
            WebhookPublisher::new(url)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
        ),
        None => {
            tracing::warn!("THUMBNAIL_WEBHOOK_URL not set; thumbnail events are disabled");
            Arc::new(NoopPublisher)
        }
    };

    let service = Arc::new(ThumbnailService::new(
        Arc::new(PgThumbnailStore::new(store.clone())),
        Arc::new(PgOwnerDirectory::new(store)),
        Arc::new(FsMediaStorage::new(&config.media)),
        events,
    ));

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .wrap(actix_middleware::Logger::default())
            .route(
                "/health",
                web::get()
                    .to(|| async { HttpResponse::Ok().json(serde_json::json!({"status": "ok"})) }),
            )
            .service(
                web::scope("/thumbnail")
                    .route("/{id}/{size}/", web::get().to(handlers::get_thumbnail))
                    .route("/{id}/{size}", web::get().to(handlers::get_thumbnail))
                    .route(
                        "/{id}/{size}/{format}/",
                        web::get().to(handlers::get_thumbnail_with_format),
                    )
                    .route(
                        "/{id}/{size}/{format}",
                        web::get().to(handlers::get_thumbnail_with_format),
                    ),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
