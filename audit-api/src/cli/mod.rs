//! CLI module for audit-api
//!
//! Provides command-line interface for running the server and issuing
//! development tokens.

pub mod serve;
pub mod token;

use clap::{Parser, Subcommand};

/// Audit Management API - audit template definition and tree editing
#[derive(Parser, Debug)]
#[command(name = "audit-api")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    AUDIT_HOST              Bind address (default: 0.0.0.0)
    AUDIT_PORT              Listen port (default: 8000)
    AUDIT_LOG_LEVEL         Log level (default: info)
    AUDIT_LOG_DIR           Directory for daily rolling log files
    AUDIT_DATABASE_URL      Database URL (default: sqlite:~/.audit-api/audit.db)
    AUDIT_JWT_SECRET        JWT signing key (random per process if not set)
    AUDIT_JWT_AUDIENCE      Expected token audience
    AUDIT_JWT_ISSUER        Expected token issuer
    AUDIT_ADMIN_EMAIL       Employee registered on startup
    AUDIT_ADMIN_NAME        Display name for that employee (default: Administrator)
    AUDIT_AUTH_DISABLED     Disable auth checks (dev/test only)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Serve(serve::ServeArgs),
    /// Issue a development bearer token
    Token(token::TokenArgs),
}
