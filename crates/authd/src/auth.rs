//! Credential verification and request authentication
//!
//! Two halves: the credential verifier (username/password checks against the
//! configured accounts), and the Authorization header processing shared by
//! the access-controlled endpoints (Basic and Bearer).

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;

use crate::config::UserAccount;
use crate::tokens::{TokenKind, TokenStore};

/// Challenge sent with 401 responses
pub const WWW_AUTHENTICATE: &str = "Bearer realm=\"authd\", Basic realm=\"authd\"";

/// A verified user identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    /// None when the username has no configured account (test-password logins)
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// How a request authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

/// The authenticated caller of a request
///
/// Recomputed from the Authorization header on every request; never stored.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub identity: Identity,
    pub groups: Vec<String>,
    pub scheme: AuthScheme,
}

/// Validates username/password pairs against the configured account list
///
/// Stands in for a platform account backend: accounts, uids/gids, and group
/// names all come from configuration. An optional test password
/// authenticates any username.
#[derive(Debug, Default)]
pub struct CredentialVerifier {
    accounts: Vec<UserAccount>,
    test_password: Option<String>,
}

impl CredentialVerifier {
    pub fn new(accounts: Vec<UserAccount>, test_password: Option<String>) -> Self {
        Self {
            accounts,
            test_password,
        }
    }

    /// Validate a username/password pair
    pub fn verify(&self, username: &str, password: &str) -> Option<Identity> {
        let account = self.lookup(username);

        let password_ok = account
            .map(|account| constant_time_eq(&account.password, password))
            .unwrap_or(false)
            || self
                .test_password
                .as_deref()
                .map(|test| constant_time_eq(test, password))
                .unwrap_or(false);
        if !password_ok {
            return None;
        }

        Some(match account {
            Some(account) => Identity {
                username: account.username.clone(),
                uid: Some(account.uid),
                gid: Some(account.gid),
            },
            None => Identity {
                username: username.to_string(),
                uid: None,
                gid: None,
            },
        })
    }

    /// Group names for a username; unknown users have none
    pub fn groups_of(&self, username: &str) -> Vec<String> {
        self.lookup(username)
            .map(|account| account.groups.clone())
            .unwrap_or_default()
    }

    pub fn in_group(&self, username: &str, group: &str) -> bool {
        self.lookup(username)
            .is_some_and(|account| account.groups.iter().any(|g| g == group))
    }

    fn lookup(&self, username: &str) -> Option<&UserAccount> {
        self.accounts
            .iter()
            .find(|account| account.username == username)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Process the Authorization header into an authenticated principal
///
/// Returns None for absent, malformed, or failing credentials; the caller
/// decides whether that is a 401.
pub fn authenticate_request(
    verifier: &CredentialVerifier,
    tokens: &TokenStore,
    headers: &HeaderMap,
) -> Option<AuthenticatedPrincipal> {
    let authorization = match headers.get("authorization") {
        Some(value) => match value.to_str() {
            Ok(value) => value,
            Err(_) => {
                tracing::debug!("Invalid Authorization header encoding");
                return None;
            }
        },
        None => return None,
    };

    if let Some(encoded) = authorization.strip_prefix("Basic ") {
        authenticate_basic(verifier, encoded.trim())
    } else if let Some(token) = authorization.strip_prefix("Bearer ") {
        authenticate_bearer(verifier, tokens, token.trim())
    } else {
        tracing::debug!("Unsupported Authorization scheme");
        None
    }
}

fn authenticate_basic(
    verifier: &CredentialVerifier,
    encoded: &str,
) -> Option<AuthenticatedPrincipal> {
    let Ok(decoded) = STANDARD.decode(encoded) else {
        tracing::warn!("Bad Basic Authorization value");
        return None;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        tracing::warn!("Bad Basic Authorization value");
        return None;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        tracing::warn!("Bad Basic Authorization value");
        return None;
    };

    match verifier.verify(username, password) {
        Some(identity) => {
            tracing::info!("Authenticated as \"{}\" using Basic", identity.username);
            let groups = verifier.groups_of(&identity.username);
            Some(AuthenticatedPrincipal {
                identity,
                groups,
                scheme: AuthScheme::Basic,
            })
        }
        None => {
            tracing::info!("Basic authentication of \"{}\" failed", username);
            None
        }
    }
}

fn authenticate_bearer(
    verifier: &CredentialVerifier,
    tokens: &TokenStore,
    value: &str,
) -> Option<AuthenticatedPrincipal> {
    // An expired token was already evicted by find
    let Some(token) = tokens.find(value) else {
        tracing::debug!("Unknown or expired Bearer token");
        return None;
    };

    if token.kind != TokenKind::Access {
        // Grants and renewals are not bearer credentials
        tracing::warn!("Bearer token is of the wrong kind, removing it");
        tokens.remove(value);
        return None;
    }

    tracing::info!("Authenticated as \"{}\" using Bearer", token.user.username);
    let groups = verifier.groups_of(&token.user.username);
    Some(AuthenticatedPrincipal {
        identity: token.user,
        groups,
        scheme: AuthScheme::Bearer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, password: &str, groups: &[&str]) -> UserAccount {
        UserAccount {
            username: username.to_string(),
            password: password.to_string(),
            uid: 1000,
            gid: 1000,
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(
            vec![
                account("mike", "letmein", &["staff", "admins"]),
                account("sam", "hunter2", &["staff"]),
            ],
            None,
        )
    }

    fn basic_header(credentials: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Basic {}", STANDARD.encode(credentials))
                .parse()
                .unwrap(),
        );
        headers
    }

    fn bearer_header(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn verify_accepts_correct_password() {
        let identity = verifier().verify("mike", "letmein").unwrap();
        assert_eq!(identity.username, "mike");
        assert_eq!(identity.uid, Some(1000));
    }

    #[test]
    fn verify_rejects_wrong_password_and_unknown_user() {
        let verifier = verifier();
        assert!(verifier.verify("mike", "wrong").is_none());
        assert!(verifier.verify("nobody", "letmein").is_none());
    }

    #[test]
    fn test_password_authenticates_any_username() {
        let verifier = CredentialVerifier::new(
            vec![account("mike", "letmein", &["staff"])],
            Some("secret-test".to_string()),
        );

        let unknown = verifier.verify("visitor", "secret-test").unwrap();
        assert_eq!(unknown.username, "visitor");
        assert!(unknown.uid.is_none());

        // A configured account keeps its uid even via the test password
        let known = verifier.verify("mike", "secret-test").unwrap();
        assert_eq!(known.uid, Some(1000));
    }

    #[test]
    fn group_membership_checks() {
        let verifier = verifier();
        assert!(verifier.in_group("mike", "admins"));
        assert!(!verifier.in_group("sam", "admins"));
        assert!(!verifier.in_group("nobody", "admins"));
        assert_eq!(verifier.groups_of("sam"), vec!["staff".to_string()]);
        assert!(verifier.groups_of("nobody").is_empty());
    }

    #[test]
    fn basic_authentication_produces_principal() {
        let verifier = verifier();
        let tokens = TokenStore::new("secret".to_string(), 300, 604800);

        let principal =
            authenticate_request(&verifier, &tokens, &basic_header("mike:letmein")).unwrap();
        assert_eq!(principal.identity.username, "mike");
        assert_eq!(principal.scheme, AuthScheme::Basic);
        assert!(principal.groups.contains(&"admins".to_string()));
    }

    #[test]
    fn malformed_basic_values_are_rejected() {
        let verifier = verifier();
        let tokens = TokenStore::new("secret".to_string(), 300, 604800);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic not!base64".parse().unwrap());
        assert!(authenticate_request(&verifier, &tokens, &headers).is_none());

        // Valid base64 but no colon separator
        let no_colon = basic_header("mikeletmein");
        assert!(authenticate_request(&verifier, &tokens, &no_colon).is_none());

        assert!(
            authenticate_request(&verifier, &tokens, &basic_header("mike:wrong")).is_none()
        );
    }

    #[test]
    fn bearer_authentication_uses_the_token_store() {
        let verifier = verifier();
        let tokens = TokenStore::new("secret".to_string(), 300, 604800);
        let identity = verifier.verify("mike", "letmein").unwrap();
        let value = tokens
            .create(TokenKind::Access, None, identity, "private")
            .unwrap();

        let principal =
            authenticate_request(&verifier, &tokens, &bearer_header(&value)).unwrap();
        assert_eq!(principal.identity.username, "mike");
        assert_eq!(principal.scheme, AuthScheme::Bearer);

        assert!(
            authenticate_request(&verifier, &tokens, &bearer_header("no-such-token")).is_none()
        );
    }

    #[test]
    fn grant_token_cannot_authenticate_and_is_removed() {
        let verifier = verifier();
        let tokens = TokenStore::new("secret".to_string(), 300, 604800);
        let identity = verifier.verify("mike", "letmein").unwrap();
        let value = tokens
            .create(TokenKind::Grant, None, identity, "private")
            .unwrap();

        assert!(authenticate_request(&verifier, &tokens, &bearer_header(&value)).is_none());
        assert!(tokens.find(&value).is_none(), "wrong-kind token should be removed");
    }

    #[test]
    fn expired_bearer_token_is_unauthenticated() {
        let verifier = verifier();
        let tokens = TokenStore::new("secret".to_string(), 300, 0);
        let identity = verifier.verify("mike", "letmein").unwrap();
        let value = tokens
            .create(TokenKind::Access, None, identity, "private")
            .unwrap();

        assert!(authenticate_request(&verifier, &tokens, &bearer_header(&value)).is_none());
        assert_eq!(tokens.len(), 0, "expired bearer should be evicted");
    }

    #[test]
    fn missing_header_and_unsupported_scheme() {
        let verifier = verifier();
        let tokens = TokenStore::new("secret".to_string(), 300, 604800);

        assert!(authenticate_request(&verifier, &tokens, &HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Digest abc".parse().unwrap());
        assert!(authenticate_request(&verifier, &tokens, &headers).is_none());
    }
}
