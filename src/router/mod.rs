//! HTTP routes and boundary plumbing.

pub mod cares;
pub mod plants;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::token::Claims;

/// Claims of the bearer token carried on the `Authorization` header.
pub struct AuthClaims(pub Claims);

impl FromRequestParts<AppState> for AuthClaims {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServerError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").unwrap_or(header);
        if token.is_empty() {
            return Err(ServerError::Unauthorized);
        }

        Ok(Self(state.token.decode(token)?))
    }
}

/// JSON body extractor running `validator` checks before the handler.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Middleware gating administrative routes on the `x-api-key` header.
///
/// An unknown key answers 404, not 401, so the routes stay hidden.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let key = req
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if key.is_empty() || !state.config.api_keys.iter().any(|k| k == key) {
        return Err(ServerError::NotFound);
    }

    Ok(next.run(req).await)
}

/// Resolve the bearer subject to its storage row.
///
/// Plant and care ownership is keyed by the internal ID, which never
/// appears in a token.
pub(crate) async fn resolve_owner(
    state: &AppState,
    claims: &Claims,
) -> Result<crate::user::User> {
    state.users.get_by_external_id(&claims.sub).await
}
