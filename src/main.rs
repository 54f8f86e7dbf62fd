//! CDR Ingest server
//!
//! Validates, stores, and serves call detail records over HTTP, with bulk
//! CSV upload.

use actix_cors::Cors;
use actix_web::{http::header, middleware, App, HttpServer};
use anyhow::Context;
use cdr_api::AppState;
use cdr_auth::JwtService;
use cdr_core::config::{AppConfig, StorageBackend};
use cdr_core::traits::{CallRecordStore, UserRepository};
use cdr_db::{
    create_pool, run_migrations, InMemoryCallRecordStore, InMemoryUserRepository,
    PgCallRecordRepository, PgUserRepository,
};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to the workspace
/// crates. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cdr_ingest={lvl},cdr_api={lvl},cdr_services={lvl},cdr_db={lvl},cdr_auth={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    let json = env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .init();
    }
}

type Stores = (Arc<dyn CallRecordStore>, Arc<dyn UserRepository>);

async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.database.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; records are lost on restart");
            Ok((
                Arc::new(InMemoryCallRecordStore::new()),
                Arc::new(InMemoryUserRepository::new()),
            ))
        }
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&config.database)
                .await
                .context("failed to create database pool")?;

            if config.database.run_migrations {
                run_migrations(&pool)
                    .await
                    .context("failed to apply migrations")?;
            }

            info!(
                max_connections = config.database.max_connections,
                "Database connection established"
            );

            Ok((
                Arc::new(PgCallRecordRepository::new(pool.clone())),
                Arc::new(PgUserRepository::new(pool)),
            ))
        }
    }
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting CDR Ingest v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("failed to load configuration")?;

    let (records, users) = build_stores(&config).await?;

    let jwt_service = Arc::new(JwtService::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_secs,
    ));
    info!(
        "JWT service configured with {} second token expiration",
        config.auth.jwt_expiration_secs
    );

    let state = AppState::new(records, users, jwt_service, config.import.clone());

    match (
        &config.auth.bootstrap_admin_username,
        &config.auth.bootstrap_admin_password,
    ) {
        (Some(username), Some(password)) => {
            state
                .users
                .ensure_admin(username, password)
                .await
                .context("failed to provision bootstrap admin")?;
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("Bootstrap admin needs both a username and a password; skipping")
        }
        (None, None) => {}
    }

    let bind_addr = config.server_addr();
    let cors_origins = config.server.cors_origins.clone();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(|cfg| state.configure(cfg))
    })
    .workers(config.server.workers)
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")
}
