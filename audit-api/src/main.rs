//! Audit Management API Server Entry Point

use audit_api::auth::{bootstrap, JwtIdentityResolver};
use audit_api::cli::{Cli, Commands};
use audit_api::config::{self, AuthConfig, ServerConfig};
use audit_api::{db, logging, server, AppState};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Token(args)) => audit_api::cli::token::execute(&args),
        Some(Commands::Serve(args)) => {
            run_server(ServerConfig::from_args(args.host, args.port)).await
        }
        // No subcommand - default to serve
        None => run_server(ServerConfig::from_env()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    logging::init()?;
    info!("Audit Management API v{}", env!("CARGO_PKG_VERSION"));

    let database_url = config::database_url();
    let db_pool = db::migrations::initialize_database(&database_url).await?;
    info!("Database initialized");

    bootstrap::ensure_bootstrap_employee(&db_pool).await?;

    let auth_config = AuthConfig::from_env();
    let auth_disabled = auth_config.disabled;
    if auth_disabled {
        warn!("Authentication is disabled; all requests act as the development user");
    }
    let identity = Arc::new(JwtIdentityResolver::new(auth_config, db_pool.clone()));

    let state = AppState::new(db_pool, identity, auth_disabled);
    server::run(state, &config.bind_addr()).await
}
