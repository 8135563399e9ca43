//! authd library: Exposes internal modules for testing.
//!
//! This is a thin library layer over the server components, allowing
//! integration tests to drive the router and the stores directly.

pub mod auth;
pub mod config;
pub mod oauth;
pub mod pages;
pub mod pkce;
pub mod registry;
pub mod server;
pub mod tokens;

// Re-export key types for convenience
pub use auth::{CredentialVerifier, Identity};
pub use config::Config;
pub use registry::{AppRegistry, Application};
pub use server::AppState;
pub use tokens::{Token, TokenKind, TokenStore};
