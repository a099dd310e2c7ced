//! Shared-secret bearer authentication.

use std::fmt;

const SCHEME: &str = "Bearer ";

/// The configured bearer secret. Compared by exact match; no sessions, no
/// expiry, no per-user identity.
#[derive(Clone)]
pub struct BearerSecret(String);

impl BearerSecret {
    /// Returns `None` for an empty secret, which would otherwise match an
    /// empty token.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    /// Check an `Authorization` header value.
    ///
    /// Only `Bearer <token>` is well formed; the token must equal the secret
    /// byte for byte.
    #[must_use]
    pub fn verify(&self, authorization: Option<&str>) -> bool {
        authorization
            .and_then(|header| header.strip_prefix(SCHEME))
            .is_some_and(|token| token == self.0)
    }
}

impl fmt::Debug for BearerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerSecret(<redacted>)")
    }
}
