use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod errors;
mod handlers;
mod models;
mod openapi;
mod routes;
mod services;
mod state;

use config::Config;
use services::payroll::fail_interrupted_runs;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ─── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("factory_erp=debug,tower_http=info")),
        )
        .with_max_level(Level::TRACE)
        .init();

    // ─── Config ───────────────────────────────────────────────────────────────
    let config = Config::from_env();
    let addr = config.server_addr();

    // ─── Database ─────────────────────────────────────────────────────────────
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    let cashbook_db = match &config.cashbook_database_url {
        Some(url) => {
            info!("Cashbook uses its own database");
            PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(url)
                .await?
        }
        None => db.clone(),
    };

    // Both migration sets may share one database, so each ignores the other's history.
    let mut hr_migrator = sqlx::migrate!("./migrations");
    hr_migrator.set_ignore_missing(true);
    hr_migrator.run(&db).await?;

    let mut cashbook_migrator = sqlx::migrate!("./cashbook_migrations");
    cashbook_migrator.set_ignore_missing(true);
    cashbook_migrator.run(&cashbook_db).await?;

    info!("Database connected and migrations applied ✓");

    fail_interrupted_runs(&db).await?;

    // ─── App State ────────────────────────────────────────────────────────────
    let state = AppState::new(db, cashbook_db, config);
    let app = routes::app(state);

    // ─── Start Server ─────────────────────────────────────────────────────────
    info!("🚀 Factory ERP API listening on http://{}", addr);
    info!("📖 Swagger UI:  http://{}/docs", addr);
    info!("❤️  Health:      http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
