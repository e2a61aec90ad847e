use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    config::Config,
    database::Database,
    models::Role,
    router,
    services::auth::check_password_strength,
    store::{MemoryStore, PgStore, Store, UserStore},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting Cinema Booking API");

    let store: Arc<dyn Store> = match &config.database.url {
        Some(url) => {
            let db = Database::connect(url, &config.database)
                .await
                .context("failed to connect to database")?;
            if config.database.run_migrations {
                db.migrate().await.context("failed to run migrations")?;
            }
            Arc::new(PgStore::new(db))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(store, config.clone());
    bootstrap_admin(&app_state).await?;

    let app = router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("invalid HOST/PORT")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Creates the configured admin account unless that username already exists.
async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (
        state.config.auth.bootstrap_admin_username.as_deref(),
        state.config.auth.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if state.store.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    check_password_strength(password)?;
    let hash = state.auth.hash_password(password).await?;
    state.store.create_user(username, &hash, Role::Admin).await?;
    info!(username, "bootstrap admin created");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
