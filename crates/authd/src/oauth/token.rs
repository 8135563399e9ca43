//! `/token`: exchanges grants and resource owner credentials for access
//! tokens
//!
//! Supports the `authorization_code` grant (with PKCE verification when the
//! grant carries a challenge) and the `password` grant.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::oauth::authorize::DEFAULT_SCOPE;
use crate::pkce;
use crate::tokens::{TokenGenerationError, TokenKind};
use crate::AppState;

/// Token request (RFC 6749 Section 4.1.3 / 4.3.2), form-encoded
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,
    // authorization_code grant
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    // password grant
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Error response (RFC 6749 Section 5.2)
#[derive(Debug, Serialize)]
pub struct TokenError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Handler for `POST /token`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Form(request): Form<TokenRequest>,
) -> Response {
    match request.grant_type.as_deref() {
        Some("authorization_code") => exchange_authorization_code(&state, &request),
        Some("password") => password_grant(&state, &request),
        Some(other) => {
            tracing::error!("Unsupported grant_type \"{}\" in token request", other);
            error_response(
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                "Only authorization_code and password grants are supported.",
            )
        }
        None => {
            tracing::error!("Token request without a grant_type");
            error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Missing grant_type.",
            )
        }
    }
}

/// Redeem an authorization code for an access token
fn exchange_authorization_code(state: &AppState, request: &TokenRequest) -> Response {
    let client_id = match request.client_id.as_deref() {
        Some(id) => id,
        None => {
            tracing::error!("Token request without a client_id");
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Missing client_id.",
            );
        }
    };
    let code = match request.code.as_deref() {
        Some(code) => code,
        None => {
            tracing::error!("Token request without a code");
            return error_response(StatusCode::BAD_REQUEST, "invalid_request", "Missing code.");
        }
    };

    // Everything from here down answers with the same invalid_grant body, so
    // a caller cannot tell an unknown client from an unknown or foreign code
    let Some(app) = state.registry.find(client_id, request.redirect_uri.as_deref()) else {
        tracing::error!("Unknown client \"{}\" in token request", client_id);
        return invalid_grant();
    };

    // Expired grants are evicted by the lookup itself and come back as None
    let Some(grant) = state.tokens.find(code) else {
        tracing::error!("Unknown or expired code in token request from \"{}\"", client_id);
        return invalid_grant();
    };

    if grant.kind != TokenKind::Grant {
        tracing::error!("Token offered as a code by \"{}\" is not a grant", client_id);
        return invalid_grant();
    }

    let owner_matches = grant
        .application
        .as_ref()
        .is_some_and(|owner| Arc::ptr_eq(owner, &app));
    if !owner_matches {
        tracing::error!("Code in token request was issued to another client");
        return invalid_grant();
    }

    // A failed PKCE check leaves the grant in place; only a successful
    // exchange consumes it
    if let Some(challenge) = grant.challenge.as_deref() {
        match request.code_verifier.as_deref() {
            Some(verifier) if pkce::verify(challenge, verifier) => {}
            Some(_) => {
                tracing::error!("Incorrect code_verifier in token request from \"{}\"", client_id);
                return invalid_grant();
            }
            None => {
                tracing::error!("Token request from \"{}\" is missing its code_verifier", client_id);
                return invalid_grant();
            }
        }
    }

    let access_token = match state.tokens.create(
        TokenKind::Access,
        Some(Arc::clone(&app)),
        grant.user,
        grant.scope,
    ) {
        Ok(token) => token,
        Err(err) => return generation_failed(err),
    };

    // The grant is consumed only once the access token exists
    state.tokens.remove(code);

    tracing::info!("Exchanged grant for access token for client \"{}\"", app.client_id);
    token_response(state, access_token)
}

/// Issue an access token directly from resource owner credentials
fn password_grant(state: &AppState, request: &TokenRequest) -> Response {
    let (username, password) = match (request.username.as_deref(), request.password.as_deref()) {
        (Some(username), Some(password)) => (username, password),
        _ => {
            tracing::error!("Password grant without a username or password");
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Missing username or password.",
            );
        }
    };

    let Some(identity) = state.verifier.verify(username, password) else {
        tracing::info!("Password grant login failed for \"{}\"", username);
        return invalid_grant();
    };

    let subject = identity.username.clone();
    let scope = request.scope.as_deref().unwrap_or(DEFAULT_SCOPE);

    match state.tokens.create(TokenKind::Access, None, identity, scope) {
        Ok(access_token) => {
            tracing::info!("Issued access token to \"{}\" via password grant", subject);
            token_response(state, access_token)
        }
        Err(err) => generation_failed(err),
    }
}

fn token_response(state: &AppState, access_token: String) -> Response {
    (
        StatusCode::OK,
        Json(TokenResponse {
            access_token,
            token_type: "access".to_string(),
            expires_in: state.config.max_token_life_secs,
        }),
    )
        .into_response()
}

/// The shared wrong-value answer for the token endpoint
fn invalid_grant() -> Response {
    error_response(StatusCode::BAD_REQUEST, "invalid_grant", "Invalid grant.")
}

fn generation_failed(err: TokenGenerationError) -> Response {
    tracing::error!("Unable to create access token: {}", err);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "server_error",
        "Unable to create access token.",
    )
}

fn error_response(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(TokenError {
            error: error.to_string(),
            error_description: Some(description.to_string()),
        }),
    )
        .into_response()
}
