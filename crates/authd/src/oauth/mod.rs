//! OAuth 2.0 endpoint implementations
//!
//! Covers the surface a resource server or native client needs:
//! - Authorization code flow with PKCE (RFC 7636) plus the resource owner
//!   password grant
//! - Token introspection modeled on RFC 7662
//! - RFC 8414: OAuth 2.0 Authorization Server Metadata
//! - RFC 7591: OAuth 2.0 Dynamic Client Registration

pub mod authorize;
pub mod introspect;
pub mod metadata;
pub mod registration;
pub mod token;
