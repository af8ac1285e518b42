use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::model::{checklist_items, sane_attributes, ItemEntry, Kind, Node};
use crate::state::AppState;

use super::{load_editable, load_visible, require_object, uri};

/// POST /api/checklists/ - create a checklist under the group named by
/// `parent_id` in the payload. The actor must own that group.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let mut attributes = require_object(payload)?;
    let group_id = match attributes.remove("parent_id") {
        Some(Value::String(group_id)) => group_id,
        _ => return Err(ApiError::bad_request("a checklist needs a parent_id")),
    };

    let group = load_editable(&state.tree, Kind::Group, &group_id, &actor.user_id).await?;
    let checklist = state.tree.create_child(&group, attributes).await?;
    Ok(Json(render_checklist(&state, &checklist).await?))
}

/// GET /api/checklists/:id - full view with the items list resolved.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let checklist = load_visible(&state.tree, Kind::Checklist, &id, &actor.user_id).await?;
    Ok(Json(render_checklist(&state, &checklist).await?))
}

/// POST|PUT /api/checklists/:id - shallow-merge update, owner only. An
/// `items` entry reorders the list; only `{id}` references are accepted.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let attributes = require_object(payload)?;
    let checklist = load_editable(&state.tree, Kind::Checklist, &id, &actor.user_id).await?;
    let checklist = state.tree.update(&checklist, attributes).await?;
    Ok(Json(render_checklist(&state, &checklist).await?))
}

/// DELETE /api/checklists/:id - owner only; blocked while items remain.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let checklist = load_editable(&state.tree, Kind::Checklist, &id, &actor.user_id).await?;
    state.tree.delete(&checklist).await?;
    Ok(Json(json!({
        "status": 200,
        "message": format!("Checklist {} deleted", id),
    })))
}

/// Resolve the denormalized `items` list into renderable documents.
/// Reference entries load the item; legacy inline entries pass through.
pub(crate) async fn render_checklist(
    state: &AppState,
    checklist: &Node,
) -> Result<Value, ApiError> {
    let mut items = Vec::new();
    for entry in checklist_items(&checklist.attributes) {
        match entry {
            ItemEntry::Ref(item_id) => match state.tree.load(Kind::Item, &item_id).await {
                Ok(item) => {
                    let mut item_info = Value::Object(sane_attributes(&item));
                    item_info["uri"] = json!(uri(state, Kind::Item, &item.id));
                    items.push(item_info);
                }
                Err(crate::model::ModelError::NotFound) => {
                    tracing::error!(checklist = %checklist.id, item = %item_id, "items list references a missing item");
                }
                Err(e) => return Err(e.into()),
            },
            ItemEntry::Inline(doc) => items.push(Value::Object(doc)),
        }
    }

    let mut info = Value::Object(sane_attributes(checklist));
    info["items"] = Value::Array(items);
    info["uri"] = json!(uri(state, Kind::Checklist, &checklist.id));
    Ok(info)
}
