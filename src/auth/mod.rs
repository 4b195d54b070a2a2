//! JWT bearer identity.
//!
//! The middleware decodes the token and injects a [`UserContext`] request
//! extension. Handlers that need identity read the extension and answer
//! 401 when it is absent. With `jwt_required` off (local development), an
//! unauthenticated request passes through without a context.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    /// User ID (subject).
    pub sub: String,
    pub name: Option<String>,
    /// Expiration time (UNIX timestamp).
    pub exp: usize,
}

/// Identity attached to a request after token validation.
#[derive(Clone, Debug)]
pub struct UserContext {
    pub user_id: String,
    pub claims: UserClaims,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = bearer_token(request.headers()) else {
        if state.config.security.jwt_required {
            return Err(StatusCode::UNAUTHORIZED);
        }
        // Dev mode: let the request through without identity; handlers
        // that require a user still reject it themselves.
        return Ok(next.run(request).await);
    };

    let key = DecodingKey::from_secret(state.config.security.jwt_secret.as_bytes());
    let token_data = decode::<UserClaims>(token, &key, &Validation::default())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let claims = token_data.claims;
    request.extensions_mut().insert(UserContext {
        user_id: claims.sub.clone(),
        claims,
    });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_non_bearer_header_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwdw=="),
        );
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
