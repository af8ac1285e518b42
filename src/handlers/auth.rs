use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::auth;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::model::{summary, Kind, PASSWORD_FIELD};
use crate::state::AppState;

use super::{require_object, uri, users};

/// POST /auth/register - create a user. `name` is required and unique;
/// `password` is optional but a user without one can never log in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let mut attributes = require_object(payload)?;

    let password = match attributes.remove("password") {
        Some(Value::String(password)) => Some(password),
        Some(_) => return Err(ApiError::bad_request("password must be a string")),
        None => None,
    };
    if let Some(password) = &password {
        let hash = auth::hash_password(password)?;
        attributes.insert(PASSWORD_FIELD.into(), Value::String(hash));
    }

    let user = state.tree.create_user(attributes).await?;
    let mut info = summary(&user);
    info["uri"] = json!(uri(&state, Kind::User, &user.id));
    Ok(Json(info))
}

/// POST /auth/login - verify credentials and hand out a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let payload = require_object(payload)?;
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("missing required field: name"))?;
    let password = payload
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("missing required field: password"))?;

    // One failure message for unknown names and wrong passwords alike.
    let user = state
        .tree
        .find_user_by_name(name)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;
    if !auth::verify_password(&user, password) {
        tracing::warn!(user = %user.id, "password not valid");
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let token = auth::issue_token(&user, &state.jwt_secret, state.jwt_expiry_hours)?;
    let mut info = summary(&user);
    info["uri"] = json!(uri(&state, Kind::User, &user.id));
    Ok(Json(json!({
        "token": token,
        "user": info,
        "expires_in": state.jwt_expiry_hours * 3600,
    })))
}

/// GET /api/auth/whoami - the actor's own view, groups included.
pub async fn whoami(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let user = state.tree.load(Kind::User, &actor.user_id).await?;
    Ok(Json(users::render_user(&state, &user, &actor.user_id).await?))
}
