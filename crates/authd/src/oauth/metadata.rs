//! RFC 8414: OAuth 2.0 Authorization Server Metadata
//!
//! The discovery document clients use to find endpoints and capabilities.
//! Built once at startup and served verbatim at both well-known paths.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::config::Config;
use crate::AppState;

/// OAuth 2.0 Authorization Server Metadata (RFC 8414 Section 2)
#[derive(Debug, Clone, Serialize)]
pub struct ServerMetadata {
    /// The authorization server's issuer identifier
    pub issuer: String,

    /// URL of the authorization endpoint
    pub authorization_endpoint: String,

    /// URL of the token endpoint
    pub token_endpoint: String,

    /// URL of the introspection endpoint
    pub introspection_endpoint: String,

    /// URL of the dynamic client registration endpoint
    pub registration_endpoint: String,

    /// OAuth 2.0 response_type values supported
    pub response_types_supported: Vec<String>,

    /// OAuth 2.0 grant_type values supported
    pub grant_types_supported: Vec<String>,

    /// Scope values a client can request
    pub scopes_supported: Vec<String>,

    /// PKCE code challenge methods supported
    pub code_challenge_methods_supported: Vec<String>,

    /// Client authentication methods supported at the token endpoint
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

impl ServerMetadata {
    /// Describe the server as configured; the capability arrays list what
    /// the endpoints actually accept
    pub fn from_config(config: &Config) -> Self {
        let base_url = config.base_url();
        Self {
            issuer: format!("{}/", base_url),
            authorization_endpoint: format!("{}/authorize", base_url),
            token_endpoint: format!("{}/token", base_url),
            introspection_endpoint: format!("{}/introspect", base_url),
            registration_endpoint: format!("{}/register", base_url),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "password".to_string(),
            ],
            scopes_supported: vec![
                "private".to_string(),
                "public".to_string(),
                "shared".to_string(),
            ],
            code_challenge_methods_supported: vec!["S256".to_string()],
            token_endpoint_auth_methods_supported: vec!["none".to_string()],
        }
    }
}

/// Handler for both well-known metadata paths
pub async fn handler(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("Serving authorization server metadata");
    (
        StatusCode::OK,
        [("Content-Type", "application/json")],
        state.metadata.clone(),
    )
        .into_response()
}
