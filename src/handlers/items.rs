use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::model::{sane_attributes, Kind, Node};
use crate::state::AppState;

use super::{load_editable, load_visible, require_object, uri};

/// POST /api/items/ - create an item in the checklist named by
/// `parent_id` in the payload. The actor must own that checklist.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let mut attributes = require_object(payload)?;
    let checklist_id = match attributes.remove("parent_id") {
        Some(Value::String(checklist_id)) => checklist_id,
        _ => return Err(ApiError::bad_request("an item needs a parent_id")),
    };

    let checklist = load_editable(&state.tree, Kind::Checklist, &checklist_id, &actor.user_id).await?;
    let item = state.tree.create_child(&checklist, attributes).await?;
    Ok(Json(render_item(&state, &item)))
}

/// GET /api/items/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = load_visible(&state.tree, Kind::Item, &id, &actor.user_id).await?;
    Ok(Json(render_item(&state, &item)))
}

/// POST|PUT /api/items/:id - shallow-merge update, owner only.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let attributes = require_object(payload)?;
    let item = load_editable(&state.tree, Kind::Item, &id, &actor.user_id).await?;
    let item = state.tree.update(&item, attributes).await?;
    Ok(Json(render_item(&state, &item)))
}

/// DELETE /api/items/:id - owner only. Also drops the reference from the
/// parent checklist's items list.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = load_editable(&state.tree, Kind::Item, &id, &actor.user_id).await?;
    state.tree.delete(&item).await?;
    Ok(Json(json!({
        "status": 200,
        "message": format!("Item {} deleted", id),
    })))
}

pub(crate) fn render_item(state: &AppState, item: &Node) -> Value {
    let mut info = Value::Object(sane_attributes(item));
    info["uri"] = json!(uri(state, Kind::Item, &item.id));
    info
}
