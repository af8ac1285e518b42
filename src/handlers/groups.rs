use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::model::{sane_attributes, summary, Kind, Node};
use crate::state::AppState;

use super::{load_editable, load_visible, require_object, uri};

/// POST /api/groups/ - create a group under the acting user.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let attributes = require_object(payload)?;
    let user = state.tree.load(Kind::User, &actor.user_id).await?;
    let group = state.tree.create_child(&user, attributes).await?;
    Ok(Json(render_group(&state, &group).await?))
}

/// GET /api/groups/:id - full group view with checklist summaries.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let group = load_visible(&state.tree, Kind::Group, &id, &actor.user_id).await?;
    Ok(Json(render_group(&state, &group).await?))
}

/// POST|PUT /api/groups/:id - shallow-merge update, owner only.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let attributes = require_object(payload)?;
    let group = load_editable(&state.tree, Kind::Group, &id, &actor.user_id).await?;
    let group = state.tree.update(&group, attributes).await?;
    Ok(Json(render_group(&state, &group).await?))
}

/// DELETE /api/groups/:id - owner only; blocked while checklists remain.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let group = load_editable(&state.tree, Kind::Group, &id, &actor.user_id).await?;
    state.tree.delete(&group).await?;
    Ok(Json(json!({
        "status": 200,
        "message": format!("Group {} deleted", id),
    })))
}

pub(crate) async fn render_group(state: &AppState, group: &Node) -> Result<Value, ApiError> {
    let checklists = state.tree.children(group, false).await?;

    let mut info = Value::Object(sane_attributes(group));
    info["checklists"] = Value::Array(
        checklists
            .iter()
            .map(|checklist| {
                let mut checklist_info = summary(checklist);
                checklist_info["uri"] = json!(uri(state, Kind::Checklist, &checklist.id));
                checklist_info
            })
            .collect(),
    );
    info["uri"] = json!(uri(state, Kind::Group, &group.id));
    Ok(info)
}
