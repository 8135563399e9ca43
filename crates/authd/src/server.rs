//! Shared state and HTTP plumbing for the authorization server

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::CredentialVerifier;
use crate::config::Config;
use crate::oauth;
use crate::oauth::metadata::ServerMetadata;
use crate::registry::{AppRegistry, Application};
use crate::tokens::TokenStore;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub registry: AppRegistry,
    pub tokens: TokenStore,
    pub verifier: CredentialVerifier,
    /// Serialized RFC 8414 document, built once at startup
    pub metadata: String,
}

impl AppState {
    /// Build runtime state from a loaded configuration
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let registry = AppRegistry::new();
        for entry in &config.applications {
            let mut application =
                Application::new(entry.client_id.clone(), entry.redirect_uri.clone());
            application.client_name = entry.client_name.clone();
            registry.register(application);
        }

        // A fresh secret per process unless one is pinned in config
        let secret = config
            .secret
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let tokens = TokenStore::new(
            secret,
            config.max_grant_life_secs,
            config.max_token_life_secs,
        );

        let verifier =
            CredentialVerifier::new(config.users.clone(), config.test_password.clone());

        let metadata = serde_json::to_string(&ServerMetadata::from_config(&config))
            .context("Failed to serialize server metadata")?;

        Ok(Self {
            config,
            registry,
            tokens,
            verifier,
            metadata,
        })
    }
}

/// Build the HTTP router with every endpoint attached
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Authorization endpoint
        .route("/authorize", get(oauth::authorize::get_handler))
        .route("/authorize", post(oauth::authorize::post_handler))
        // Token endpoint
        .route("/token", post(oauth::token::handler))
        // Token introspection
        .route("/introspect", post(oauth::introspect::handler))
        // Dynamic client registration (RFC 7591)
        .route("/register", post(oauth::registration::handler))
        // Server metadata (RFC 8414), served at both discovery paths
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth::metadata::handler),
        )
        .route(
            "/.well-known/openid-configuration",
            get(oauth::metadata::handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves when the process receives Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
