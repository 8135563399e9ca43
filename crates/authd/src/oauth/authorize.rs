//! `/authorize`: login form and authorization code issuance
//!
//! GET renders the login form for a valid request; POST checks the resource
//! owner's credentials and redirects back to the client with a one-time code.

use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::pages::{self, LoginFormValues};
use crate::pkce;
use crate::registry::Application;
use crate::tokens::TokenKind;
use crate::AppState;

/// Scope granted when the client does not ask for one
pub const DEFAULT_SCOPE: &str = "private shared";

/// Authorization request parameters
///
/// Query parameters on GET, form fields on POST. Everything is optional at
/// the serde level so that missing fields reach the validation logic instead
/// of being rejected by the extractor.
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code_challenge: Option<String>,
    #[serde(default)]
    pub code_challenge_method: Option<String>,
    // Credentials arrive only with the POSTed login form
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Handler for `GET /authorize`
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    let app = match validate_request(&state, &params) {
        Ok(app) => app,
        Err(response) => return response,
    };

    let scope = params.scope.as_deref().unwrap_or(DEFAULT_SCOPE);

    Html(pages::login_page(&LoginFormValues {
        client_id: &app.client_id,
        redirect_uri: &app.redirect_uri,
        response_type: "code",
        scope,
        state: params.state.as_deref(),
        code_challenge: params.code_challenge.as_deref(),
    }))
    .into_response()
}

/// Handler for `POST /authorize`
pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    Form(params): Form<AuthorizeParams>,
) -> Response {
    let app = match validate_request(&state, &params) {
        Ok(app) => app,
        Err(response) => return response,
    };

    // Missing and wrong credentials get the same answer
    let identity = match (params.username.as_deref(), params.password.as_deref()) {
        (Some(username), Some(password)) => state.verifier.verify(username, password),
        _ => None,
    };

    let Some(identity) = identity else {
        tracing::info!("Login failed for client \"{}\"", app.client_id);
        return error_redirect(
            &app.redirect_uri,
            "access_denied",
            "Bad username or password.",
            params.state.as_deref(),
        );
    };

    let username = identity.username.clone();
    let scope = params.scope.as_deref().unwrap_or(DEFAULT_SCOPE);

    let code = match state
        .tokens
        .create(TokenKind::Grant, Some(Arc::clone(&app)), identity, scope)
    {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("Unable to create grant: {}", err);
            return error_redirect(
                &app.redirect_uri,
                "server_error",
                "Unable to create grant.",
                params.state.as_deref(),
            );
        }
    };

    if let Some(challenge) = &params.code_challenge {
        state.tokens.attach_challenge(&code, challenge.as_str());
    }

    tracing::info!(
        "Issued grant to \"{}\" for client \"{}\"",
        username,
        app.client_id
    );

    let mut query = format!("code={}", code);
    if let Some(state_value) = &params.state {
        query.push_str("&state=");
        query.push_str(&urlencoding::encode(state_value));
    }
    redirect(&app.redirect_uri, &query)
}

/// Check the request against the application registry
///
/// GET and POST run the same checks. Invalid requests get a 400 error page
/// rather than a redirect, since the redirect URI is not trusted yet.
fn validate_request(
    state: &AppState,
    params: &AuthorizeParams,
) -> Result<Arc<Application>, Response> {
    let client_id = match params.client_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => {
            tracing::error!("Authorization request without a client_id");
            return Err(bad_request("Missing client_id."));
        }
    };

    match params.response_type.as_deref() {
        Some("code") => {}
        Some(other) => {
            tracing::error!(
                "Unsupported response_type \"{}\" from client \"{}\"",
                other,
                client_id
            );
            return Err(bad_request("Only the \"code\" response type is supported."));
        }
        None => {
            tracing::error!("Authorization request without a response_type");
            return Err(bad_request("Missing response_type."));
        }
    }

    if let Some(method) = params.code_challenge_method.as_deref() {
        if method != pkce::CHALLENGE_METHOD {
            tracing::error!(
                "Unsupported code_challenge_method \"{}\" from client \"{}\"",
                method,
                client_id
            );
            return Err(bad_request(
                "Only the S256 code challenge method is supported.",
            ));
        }
    }

    match state.registry.find(client_id, params.redirect_uri.as_deref()) {
        Some(app) => Ok(app),
        None => {
            tracing::error!(
                "Unknown client \"{}\" (redirect_uri {:?})",
                client_id,
                params.redirect_uri
            );
            Err(bad_request("Unknown client."))
        }
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(pages::error_page("Bad Request", message)),
    )
        .into_response()
}

/// 302 back to the client, appending to an existing query string when the
/// redirect URI already carries one
fn redirect(redirect_uri: &str, query: &str) -> Response {
    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    let location = format!("{}{}{}", redirect_uri, separator, query);
    (StatusCode::FOUND, [("Location", location)]).into_response()
}

fn error_redirect(
    redirect_uri: &str,
    error: &str,
    description: &str,
    state: Option<&str>,
) -> Response {
    let mut query = format!(
        "error={}&error_description={}",
        error,
        urlencoding::encode(description)
    );
    if let Some(state_value) = state {
        query.push_str("&state=");
        query.push_str(&urlencoding::encode(state_value));
    }
    redirect(redirect_uri, &query)
}

mod urlencoding {
    /// Percent-encode a query parameter value
    pub fn encode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get("location")
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[test]
    fn redirect_starts_a_query_string() {
        let response = redirect("https://app.example/cb", "code=abc");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://app.example/cb?code=abc");
    }

    #[test]
    fn redirect_appends_to_an_existing_query_string() {
        let response = redirect("https://app.example/cb?flow=1", "code=abc");
        assert_eq!(
            location(&response),
            "https://app.example/cb?flow=1&code=abc"
        );
    }

    #[test]
    fn error_redirect_includes_state_when_present() {
        let response = error_redirect(
            "https://app.example/cb",
            "access_denied",
            "Bad username or password.",
            Some("xyz 1"),
        );
        assert_eq!(
            location(&response),
            "https://app.example/cb?error=access_denied&error_description=Bad+username+or+password.&state=xyz+1"
        );
    }

    #[test]
    fn error_redirect_omits_absent_state() {
        let response = error_redirect(
            "https://app.example/cb",
            "server_error",
            "Unable to create grant.",
            None,
        );
        assert!(!location(&response).contains("state="));
    }
}
