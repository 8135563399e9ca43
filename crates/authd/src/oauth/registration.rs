//! RFC 7591: OAuth 2.0 Dynamic Client Registration
//!
//! Lets a trusted caller add client applications at runtime instead of
//! listing them all in the configuration file. Registration is gated the
//! same way as introspection: authenticated callers only, optionally
//! restricted to a configured group.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::registry::Application;
use crate::AppState;

/// Client registration request (RFC 7591 Section 2)
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    /// Redirect URIs for the new client; at least one is required
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Human-readable name for the client
    #[serde(default)]
    pub client_name: Option<String>,

    /// Home page of the client
    #[serde(default)]
    pub client_uri: Option<String>,

    /// Logo to show on consent pages
    #[serde(default)]
    pub logo_uri: Option<String>,

    /// Terms of service for the client
    #[serde(default)]
    pub tos_uri: Option<String>,

    /// Accepted per RFC 7591; every client is public
    #[serde(default)]
    #[allow(dead_code)]
    pub token_endpoint_auth_method: Option<String>,

    /// Accepted per RFC 7591; the supported grants are fixed
    #[serde(default)]
    #[allow(dead_code)]
    pub grant_types: Option<Vec<String>>,

    /// Accepted per RFC 7591; only "code" is supported
    #[serde(default)]
    #[allow(dead_code)]
    pub response_types: Option<Vec<String>>,

    /// Accepted per RFC 7591; scopes are not restricted per client
    #[serde(default)]
    #[allow(dead_code)]
    pub scope: Option<String>,
}

/// Client registration response (RFC 7591 Section 3.2.1)
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub client_id: String,
    pub client_id_issued_at: i64,
    pub redirect_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tos_uri: Option<String>,
    pub token_endpoint_auth_method: String,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
}

/// Error response for registration failures (RFC 7591 Section 3.2.2)
#[derive(Debug, Serialize)]
pub struct RegistrationError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Handler for `POST /register`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegistrationRequest>,
) -> Response {
    let Some(principal) = auth::authenticate_request(&state.verifier, &state.tokens, &headers)
    else {
        return (
            StatusCode::UNAUTHORIZED,
            [("WWW-Authenticate", auth::WWW_AUTHENTICATE)],
        )
            .into_response();
    };

    if let Some(group) = state.config.register_group.as_deref() {
        if !principal.groups.iter().any(|g| g == group) {
            tracing::warn!(
                "\"{}\" is not in the \"{}\" group required to register clients",
                principal.identity.username,
                group
            );
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    if request.redirect_uris.is_empty() {
        tracing::error!("Registration request without redirect_uris");
        return registration_error(
            "invalid_client_metadata",
            "At least one redirect_uri is required.",
        );
    }

    for uri in &request.redirect_uris {
        if url::Url::parse(uri).is_err() {
            tracing::error!("Registration request with unparsable redirect_uri \"{}\"", uri);
            return registration_error(
                "invalid_redirect_uri",
                &format!("Bad redirect_uri \"{}\".", uri),
            );
        }
    }

    let client_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    // One registry entry per redirect URI, all sharing the client_id
    for uri in &request.redirect_uris {
        let mut application = Application::new(client_id.clone(), uri.clone());
        application.client_name = request.client_name.clone();
        application.client_uri = request.client_uri.clone();
        application.logo_uri = request.logo_uri.clone();
        application.tos_uri = request.tos_uri.clone();
        state.registry.register(application);
    }

    tracing::info!(
        "\"{}\" registered client \"{}\" ({:?})",
        principal.identity.username,
        client_id,
        request.client_name
    );

    (
        StatusCode::CREATED,
        Json(RegistrationResponse {
            client_id,
            client_id_issued_at: now.timestamp(),
            redirect_uris: request.redirect_uris,
            client_name: request.client_name,
            client_uri: request.client_uri,
            logo_uri: request.logo_uri,
            tos_uri: request.tos_uri,
            token_endpoint_auth_method: "none".to_string(),
            grant_types: vec![
                "authorization_code".to_string(),
                "password".to_string(),
            ],
            response_types: vec!["code".to_string()],
        }),
    )
        .into_response()
}

fn registration_error(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(RegistrationError {
            error: error.to_string(),
            error_description: Some(description.to_string()),
        }),
    )
        .into_response()
}
