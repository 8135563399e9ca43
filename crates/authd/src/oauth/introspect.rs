//! `/introspect`: token introspection modeled on RFC 7662
//!
//! Callers authenticate with Basic credentials or a Bearer access token and,
//! when an introspect group is configured, must belong to it. The caller
//! check never touches the token named in the request body.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::AppState;

/// Introspection request, form-encoded
#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Introspection response for a token found in the store
#[derive(Debug, Serialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    pub scope: String,
    /// Absent for password-grant tokens, which have no owning application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub username: String,
    /// "grant", "access", or "renewal"
    pub token_type: String,
    /// Expiration, unix seconds
    pub exp: i64,
    /// Issue time, unix seconds
    pub iat: i64,
}

/// Handler for `POST /introspect`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(request): Form<IntrospectRequest>,
) -> Response {
    let Some(principal) = auth::authenticate_request(&state.verifier, &state.tokens, &headers)
    else {
        return (
            StatusCode::UNAUTHORIZED,
            [("WWW-Authenticate", auth::WWW_AUTHENTICATE)],
        )
            .into_response();
    };

    if let Some(group) = state.config.introspect_group.as_deref() {
        if !principal.groups.iter().any(|g| g == group) {
            tracing::warn!(
                "\"{}\" is not in the \"{}\" group required to introspect",
                principal.identity.username,
                group
            );
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let Some(token_value) = request.token.as_deref() else {
        tracing::error!("Introspection request without a token");
        return StatusCode::BAD_REQUEST.into_response();
    };

    // Unknown and expired tokens both land here; expired ones were evicted
    // by the lookup
    let Some(token) = state.tokens.find(token_value) else {
        tracing::error!(
            "\"{}\" introspected an unknown token",
            principal.identity.username
        );
        return StatusCode::BAD_REQUEST.into_response();
    };

    tracing::info!(
        "\"{}\" introspected a {} token for \"{}\"",
        principal.identity.username,
        token.kind.as_str(),
        token.user.username
    );

    (
        StatusCode::OK,
        Json(IntrospectionResponse {
            active: token.is_active(),
            scope: token.scope.clone(),
            client_id: token.application.as_ref().map(|app| app.client_id.clone()),
            username: token.user.username.clone(),
            token_type: token.kind.as_str().to_string(),
            exp: token.expires_at.timestamp(),
            iat: token.created_at.timestamp(),
        }),
    )
        .into_response()
}
