use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::Error;

/// Verified session identity for the current request.
///
/// Verification is purely cryptographic: the user record is not re-fetched,
/// so a deleted user's token keeps being accepted until it expires.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::Unauthenticated)?;

        // Expect exactly "Bearer <token>"; the scheme is case-insensitive.
        let mut words = header.split(' ');
        let (scheme, token) = match (words.next(), words.next(), words.next()) {
            (Some(scheme), Some(token), None) => (scheme, token),
            _ => {
                warn!("malformed Authorization header");
                return Err(Error::Unauthenticated);
            }
        };
        if !scheme.eq_ignore_ascii_case("bearer") {
            warn!("unsupported Authorization scheme");
            return Err(Error::Unauthenticated);
        }

        let claims = keys.verify(token).map_err(|e| {
            warn!("invalid or expired token");
            e
        })?;

        Ok(AuthUser(claims.sub))
    }
}
