mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::db::DBClient;
use dotenv::dotenv;
use routes::create_router;
use service::file_store::{FileStore, LocalFileStore};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: DBClient,
    pub file_store: Arc<dyn FileStore>,
}

async fn run_seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("running migrations")?;

    let report = service::seed::seed_reference_data(pool)
        .await
        .context("seeding reference data")?;

    tracing::info!(
        "seeded {} regions, {} cities, {} new areas, {} new property types, {} new statuses",
        report.regions,
        report.cities,
        report.areas_created,
        report.property_types_created,
        report.statuses_created
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("🔥 Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let level = config
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if std::env::args().nth(1).as_deref() == Some("seed") {
        if let Err(err) = run_seed(&pool).await {
            tracing::error!("🔥 Seeding failed: {:#}", err);
            std::process::exit(1);
        }
        return;
    }

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("🔥 Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = AppState {
        file_store: Arc::new(LocalFileStore::new(
            &config.media_root,
            config.media_base_url.clone(),
        )),
        db_client: DBClient::new(pool),
        env: config.clone(),
    };

    let app = create_router(Arc::new(app_state)).layer(cors);

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Could not bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
    }
}
