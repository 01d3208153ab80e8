use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use gatehouse::auth::jwt::JwtKeys;
use gatehouse::config::AppConfig;
use gatehouse::state::AppState;
use gatehouse::users::repo::{PgUserRepository, UserRepository};
use gatehouse::{app, census};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "gatehouse=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let census = tokio::spawn(census::run(
        repo.clone(),
        Duration::from_secs(config.census_interval_secs),
        shutdown_rx,
    ));

    let state = AppState::new(repo, JwtKeys::new(&config.jwt));
    let router = app::build_app(state);
    app::serve(router, config.listen_addr, shutdown_signal()).await?;

    info!("shutdown signal received, stopping background tasks");
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(Duration::from_secs(5), census).await {
        Ok(_) => info!("user census stopped"),
        Err(_) => warn!("user census did not stop within the grace period"),
    }

    info!("application shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
