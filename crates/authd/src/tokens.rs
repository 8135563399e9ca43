//! Issued grant and access tokens

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::auth::Identity;
use crate::registry::Application;

/// Regeneration attempts before giving up on a colliding token string
const TOKEN_GENERATION_ATTEMPTS: usize = 8;

/// What an issued token is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Single-use authorization code issued by /authorize
    Grant,
    /// Bearer credential issued by /token
    Access,
    /// Reserved for refresh-token support; no current flow issues one
    Renewal,
}

impl TokenKind {
    /// Name reported by introspection
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Grant => "grant",
            TokenKind::Access => "access",
            TokenKind::Renewal => "renewal",
        }
    }
}

/// An issued token and everything recorded about it at creation
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Owning application; None for password-grant access tokens
    pub application: Option<Arc<Application>>,
    pub user: Identity,
    pub scope: String,
    /// PKCE challenge, present only on grants born from a challenge-bearing
    /// authorization request
    pub challenge: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token is still valid at this instant
    pub fn is_active(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// Token string generation ran out of attempts
#[derive(Debug, Error)]
#[error("could not generate a unique token string")]
pub struct TokenGenerationError;

/// In-memory store of live tokens
///
/// One readers-writer lock covers the whole store. Expired entries are
/// reclaimed lazily, on the lookup that observes them; there is no
/// background sweep.
pub struct TokenStore {
    secret: String,
    issued: AtomicU64,
    max_grant_life: Duration,
    max_token_life: Duration,
    tokens: RwLock<HashMap<String, Token>>,
}

impl TokenStore {
    pub fn new(secret: String, max_grant_life_secs: u64, max_token_life_secs: u64) -> Self {
        Self {
            secret,
            issued: AtomicU64::new(0),
            max_grant_life: Duration::seconds(max_grant_life_secs as i64),
            max_token_life: Duration::seconds(max_token_life_secs as i64),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Create a token and return its string
    ///
    /// Grants get the grant lifetime, everything else the token lifetime. A
    /// generated string that collides with a live token is discarded and
    /// regenerated rather than overwriting the existing entry.
    pub fn create(
        &self,
        kind: TokenKind,
        application: Option<Arc<Application>>,
        user: Identity,
        scope: impl Into<String>,
    ) -> Result<String, TokenGenerationError> {
        let now = Utc::now();
        let life = match kind {
            TokenKind::Grant => self.max_grant_life,
            TokenKind::Access | TokenKind::Renewal => self.max_token_life,
        };
        let token = Token {
            kind,
            application,
            user,
            scope: scope.into(),
            challenge: None,
            created_at: now,
            expires_at: now + life,
        };

        let mut tokens = self.tokens.write().unwrap();
        let mut attempts = 0;
        let value = loop {
            let candidate = self.generate_token_string();
            if !tokens.contains_key(&candidate) {
                break candidate;
            }
            attempts += 1;
            if attempts >= TOKEN_GENERATION_ATTEMPTS {
                return Err(TokenGenerationError);
            }
        };

        tokens.insert(value.clone(), token);
        Ok(value)
    }

    /// Record the PKCE challenge on a just-created grant
    ///
    /// Callers invoke this immediately after `create`, before the token
    /// string has been shared with any other party.
    pub fn attach_challenge(&self, token: &str, challenge: impl Into<String>) {
        let mut tokens = self.tokens.write().unwrap();
        if let Some(entry) = tokens.get_mut(token) {
            entry.challenge = Some(challenge.into());
        }
    }

    /// Look up a token, lazily evicting it if it has expired
    pub fn find(&self, token: &str) -> Option<Token> {
        {
            let tokens = self.tokens.read().unwrap();
            match tokens.get(token) {
                None => return None,
                Some(entry) if entry.is_active() => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, since a racing lookup may
        // have evicted the entry already.
        let mut tokens = self.tokens.write().unwrap();
        if let Some(entry) = tokens.get(token) {
            if !entry.is_active() {
                let kind = entry.kind;
                tokens.remove(token);
                tracing::debug!("Evicted expired {} token", kind.as_str());
            }
        }
        None
    }

    /// Remove a token outright (grant exchange, wrong-kind bearer)
    pub fn remove(&self, token: &str) -> Option<Token> {
        let mut tokens = self.tokens.write().unwrap();
        tokens.remove(token)
    }

    /// Number of tokens physically present, expired or not
    pub fn len(&self) -> usize {
        self.tokens.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Token strings hash the server secret, an issue counter, and fresh
    /// random bytes, base64url-encoded
    fn generate_token_string(&self) -> String {
        let mut raw = [0u8; 32];
        rand::rng().fill(&mut raw[..]);

        let issued = self.issued.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(issued.to_be_bytes());
        hasher.update(raw);
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(username: &str) -> Identity {
        Identity {
            username: username.to_string(),
            uid: Some(1000),
            gid: Some(1000),
        }
    }

    fn store() -> TokenStore {
        TokenStore::new("secret".to_string(), 300, 604800)
    }

    #[test]
    fn create_then_find_returns_recorded_fields() {
        let store = store();
        let app = Arc::new(Application::new("app1", "https://cb.example/cb"));
        let value = store
            .create(TokenKind::Grant, Some(Arc::clone(&app)), identity("mike"), "private shared")
            .unwrap();

        let token = store.find(&value).unwrap();
        assert_eq!(token.kind, TokenKind::Grant);
        assert_eq!(token.user.username, "mike");
        assert_eq!(token.scope, "private shared");
        assert!(token.challenge.is_none());
        assert!(Arc::ptr_eq(token.application.as_ref().unwrap(), &app));
        assert!(token.is_active());
    }

    #[test]
    fn token_strings_are_unique() {
        let store = store();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let value = store
                .create(TokenKind::Access, None, identity("mike"), "private")
                .unwrap();
            assert!(seen.insert(value));
        }
    }

    #[test]
    fn attach_challenge_is_visible_on_find() {
        let store = store();
        let value = store
            .create(TokenKind::Grant, None, identity("mike"), "private")
            .unwrap();
        store.attach_challenge(&value, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");

        let token = store.find(&value).unwrap();
        assert_eq!(
            token.challenge.as_deref(),
            Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM")
        );
    }

    #[test]
    fn expired_token_is_invisible_and_evicted_on_access() {
        // Zero grant lifetime: the grant is expired by the time we look
        let store = TokenStore::new("secret".to_string(), 0, 604800);
        let value = store
            .create(TokenKind::Grant, None, identity("mike"), "private")
            .unwrap();
        assert_eq!(store.len(), 1);

        assert!(store.find(&value).is_none());
        assert_eq!(store.len(), 0, "expired entry should be reclaimed by find");

        // A second find after eviction behaves the same
        assert!(store.find(&value).is_none());
    }

    #[test]
    fn grant_and_access_lifetimes_differ() {
        let store = TokenStore::new("secret".to_string(), 0, 604800);
        let grant = store
            .create(TokenKind::Grant, None, identity("mike"), "private")
            .unwrap();
        let access = store
            .create(TokenKind::Access, None, identity("mike"), "private")
            .unwrap();

        assert!(store.find(&grant).is_none());
        assert!(store.find(&access).is_some());
    }

    #[test]
    fn renewal_kind_uses_token_lifetime() {
        let store = TokenStore::new("secret".to_string(), 0, 604800);
        let value = store
            .create(TokenKind::Renewal, None, identity("mike"), "private")
            .unwrap();

        let token = store.find(&value).unwrap();
        assert_eq!(token.kind.as_str(), "renewal");
        assert!(token.is_active());
    }

    #[test]
    fn remove_is_single_shot() {
        let store = store();
        let value = store
            .create(TokenKind::Grant, None, identity("mike"), "private")
            .unwrap();

        assert!(store.remove(&value).is_some());
        assert!(store.remove(&value).is_none());
        assert!(store.find(&value).is_none());
    }
}
