use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated actor extracted from the bearer token. Authentication
/// happens here; authorization stays in the model layer.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { user_id: claims.sub, name: claims.name }
    }
}

/// Token-validating middleware for the protected routes. Injects an
/// `AuthUser` extension into the request.
pub async fn bearer_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let claims = auth::verify_token(&token, &state.jwt_secret)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err(ApiError::unauthorized("empty bearer token")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}
