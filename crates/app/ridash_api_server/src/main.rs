//! Ridash API server binary.
//!
//! Reads configuration from the environment (and `.env`), migrates the
//! database and serves the HTTP API until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use ridash_api::config::ApiConfig;
use ridash_core::id::Snowflake;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments. Everything else comes from the environment.
#[derive(Parser, Debug)]
#[command(name = "ridash_api_server", about = "Ridash API server")]
struct Args {
    /// Address to listen on; overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Skip running migrations at start-up.
    #[arg(long, default_value_t = false)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ridash_api=debug,ridash_core=debug")),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    info!(
        bind_addr = %config.bind_addr,
        machine_id = config.machine_id,
        google = config.google.is_some(),
        doc_manager = config.doc_manager.is_some(),
        "starting ridash_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    if !args.skip_migrations {
        info!("running database migrations");
        ridash_api::migrate(&pool).await?;
    }

    let ids = Arc::new(Snowflake::new(config.machine_id)?);
    let bind_addr = config.bind_addr.clone();
    let state = ridash_api::AppState::new(pool, config, ids)?;
    let app = ridash_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
