//! Resolves the caller's identity from the external identity provider.
//!
//! Authentication itself is delegated to a third-party provider that fronts
//! the application. By the time a request reaches a handler, the provider has
//! already verified the session and asserted the caller's subject ID and
//! profile in request headers. This module only reads that assertion.

use axum::http::HeaderMap;

/// The header carrying the identity provider's stable subject ID.
pub const SUBJECT_HEADER: &str = "x-auth-subject";
/// The header carrying the caller's primary email address.
pub const EMAIL_HEADER: &str = "x-auth-email";
/// The header carrying the caller's display name, if known.
pub const NAME_HEADER: &str = "x-auth-name";
/// The header carrying a URL to the caller's avatar image, if known.
pub const AVATAR_HEADER: &str = "x-auth-picture";

/// The authenticated principal as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The stable, unique ID the identity provider issued for this principal.
    pub subject_id: String,
    /// The principal's primary email address.
    pub email: String,
    /// The principal's display name.
    pub name: Option<String>,
    /// A URL to the principal's avatar image.
    pub avatar_url: Option<String>,
}

/// Resolves the caller's identity for a request.
///
/// Implementations return `None` to signal unauthenticated access; they must
/// not fail in any other way.
pub trait IdentityProvider: Send + Sync {
    /// Resolve the authenticated caller from the request headers, or `None`
    /// for anonymous requests.
    fn identify(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Reads the identity asserted in `x-auth-*` headers by the authenticating
/// reverse proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyIdentityProvider;

impl IdentityProvider for ProxyIdentityProvider {
    fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        let subject_id = header_string(headers, SUBJECT_HEADER)?;
        let email = header_string(headers, EMAIL_HEADER)?;

        Some(Identity {
            subject_id,
            email,
            name: header_string(headers, NAME_HEADER),
            avatar_url: header_string(headers, AVATAR_HEADER),
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .filter(|value| !value.is_empty())
}
