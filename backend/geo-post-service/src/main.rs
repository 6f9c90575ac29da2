/// Geo Post Service - HTTP Server
use actix_middleware::RequestLogging;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use geo_post_service::config::BackendMode;
use geo_post_service::services::{ElasticsearchClient, GcsBlobStore};
use geo_post_service::{routes, AppState, Backends, Config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let session_keys = Arc::new(
        config
            .auth
            .session_keys()
            .context("Failed to initialize session keys")?,
    );

    let backends = match config.backend {
        BackendMode::Memory => {
            warn!("BACKEND_MODE=memory: posts and users are kept in process memory only");
            Backends::in_memory(&config.gcs.bucket)
        }
        BackendMode::Elasticsearch => {
            let es = Arc::new(
                ElasticsearchClient::new(
                    &config.elasticsearch.url,
                    &config.elasticsearch.post_index,
                    &config.elasticsearch.user_index,
                )
                .context("Failed to create Elasticsearch client")?,
            );
            let gcs = Arc::new(
                GcsBlobStore::from_config(&config.gcs).context("Failed to create GCS client")?,
            );
            Backends {
                credentials: es.clone(),
                index: es,
                blobs: gcs,
            }
        }
    };

    backends
        .index
        .ensure_schema()
        .await
        .context("Failed to prepare search index")?;

    let state = AppState::new(backends, session_keys.clone(), &config.gcs.bucket, &config.posts);

    info!(
        host = %config.app.host,
        port = config.app.port,
        env = %config.app.env,
        backend = ?config.backend,
        "Geo post service starting"
    );

    HttpServer::new(move || {
        let session_keys = session_keys.clone();
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(routes::cors_headers())
            .wrap(RequestLogging)
            .configure(|cfg| routes::configure(cfg, session_keys))
    })
    .bind((config.app.host.as_str(), config.app.port))?
    .run()
    .await?;

    info!("Geo post service stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geo_post_service=info,actix_middleware=info,actix_web=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
