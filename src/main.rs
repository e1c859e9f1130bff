use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::sync::Arc;
use std::time::Duration;

use payrelay::config::Config;
use payrelay::db::{AppState, create_pool, init_db};
use payrelay::gateway::RazorpayClient;
use payrelay::handlers;
use payrelay::ledger::Ledger;
use payrelay::signature::SignatureKeys;

#[derive(Parser, Debug)]
#[command(name = "payrelay")]
#[command(about = "Payment order, verification and webhook relay for Razorpay")]
struct Cli {
    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    /// Purge processed webhook events past the retention period, then exit
    #[arg(long)]
    purge_events: bool,
}

async fn purge_events(ledger: &Ledger, retention_days: i64) {
    if retention_days == 0 {
        return;
    }
    match ledger.purge_processed_events(retention_days).await {
        Ok(count) if count > 0 => {
            tracing::info!(
                "Purged {} processed webhook events older than {} days",
                count,
                retention_days
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Failed to purge webhook events: {}", e);
        }
    }
}

/// Spawns a background task that purges processed webhook events hourly.
fn spawn_purge_task(ledger: Ledger, retention_days: i64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(60 * 60);

        loop {
            tokio::time::sleep(interval).await;
            purge_events(&ledger, retention_days).await;
        }
    });

    tracing::info!(
        "Webhook event purge task started (retention {} days)",
        retention_days
    );
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payrelay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing secrets stop startup here rather than disabling verification
    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    if cli.purge_events {
        if config.webhook_retention_days == 0 {
            tracing::info!("WEBHOOK_EVENT_RETENTION_DAYS is 0, nothing to purge");
        }
        purge_events(&Ledger::new(db_pool), config.webhook_retention_days).await;
        return;
    }

    let gateway = RazorpayClient::new(&config).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });
    let keys = SignatureKeys::new(config.key_secret.clone(), config.webhook_secret.clone());

    let state = AppState::new(
        db_pool,
        Arc::new(gateway),
        keys,
        config.default_currency.clone(),
    );

    if config.webhook_retention_days > 0 {
        purge_events(&state.ledger, config.webhook_retention_days).await;
        spawn_purge_task(state.ledger.clone(), config.webhook_retention_days);
    }

    let app = Router::new()
        .merge(handlers::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cli.ephemeral && !config.dev_mode {
        tracing::warn!("--ephemeral ignored: not in dev mode (set PAYRELAY_ENV=dev)");
    }
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Payrelay server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
