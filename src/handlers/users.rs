use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::model::{summary, Kind, Node};
use crate::state::AppState;
use crate::store::{Collection, ListFilter};

use super::uri;

/// GET /api/users/ - summaries of every user.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let docs = state.tree.store().list(Collection::Users, &ListFilter::default()).await?;
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        let id = doc.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
        out.push(json!({
            "id": id,
            "name": name,
            "uri": uri(&state, Kind::User, &id),
        }));
    }
    Ok(Json(Value::Array(out)))
}

/// GET /api/users/:id - a user's summary plus its group summaries. The
/// owner sees every group; anyone else only the public ones.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = state.tree.load(Kind::User, &id).await?;
    Ok(Json(render_user(&state, &user, &actor.user_id).await?))
}

pub(crate) async fn render_user(
    state: &AppState,
    user: &Node,
    actor_id: &str,
) -> Result<Value, ApiError> {
    let public_only = user.id != actor_id;
    let groups = state.tree.children(user, public_only).await?;

    let mut info = summary(user);
    info["groups"] = Value::Array(
        groups
            .iter()
            .map(|group| {
                let mut group_info = summary(group);
                group_info["uri"] = json!(uri(state, Kind::Group, &group.id));
                group_info
            })
            .collect(),
    );
    info["uri"] = json!(uri(state, Kind::User, &user.id));
    Ok(info)
}
