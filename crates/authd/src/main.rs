//! authd: A small OAuth 2.0 authorization server.
//!
//! Issues authorization codes and access tokens for registered client
//! applications, with PKCE, token introspection, dynamic client
//! registration, and RFC 8414 discovery.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use authd::config::Config;
use authd::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "authd")]
#[command(about = "OAuth 2.0 authorization server")]
struct Cli {
    /// Path to the JSON configuration file (written with defaults if missing)
    #[arg(long, default_value = "authd.json", env = "AUTHD_CONFIG")]
    config: String,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "AUTHD_BIND")]
    bind: String,

    /// Port to listen on (overrides the configured port)
    #[arg(long, env = "AUTHD_PORT")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respects RUST_LOG, defaults to info (or debug with --verbose)
    let default_filter = if cli.verbose {
        "debug,authd=debug"
    } else {
        "info,authd=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    info!("Starting authd");
    info!("Issuer: {}/", config.base_url());
    info!(
        "{} configured application(s), {} user account(s)",
        config.applications.len(),
        config.users.len()
    );

    let port = config.port;
    let state = Arc::new(AppState::from_config(config)?);
    let app = server::router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", cli.bind, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("authd shut down");
    Ok(())
}
