// Request handlers: map verified actor + verb + payload onto resource
// tree operations. All authorization goes through the model's ACL
// predicates; handlers only translate verdicts into HTTP errors.

pub mod auth;
pub mod checklists;
pub mod groups;
pub mod items;
pub mod users;

use serde_json::Value;

use crate::error::ApiError;
use crate::model::{acl, Kind, Node, Tree};
use crate::state::AppState;
use crate::store::Document;

pub(crate) fn uri(state: &AppState, kind: Kind, id: &str) -> String {
    let segment = match kind {
        Kind::User => "users",
        Kind::Group => "groups",
        Kind::Checklist => "checklists",
        Kind::Item => "items",
    };
    format!("{}/api/{}/{}", state.base_url, segment, id)
}

/// Create/update payloads must be non-empty JSON objects.
pub(crate) fn require_object(payload: Value) -> Result<Document, ApiError> {
    match payload {
        Value::Object(map) if !map.is_empty() => Ok(map),
        Value::Object(_) | Value::Null => Err(ApiError::bad_request("no information provided")),
        _ => Err(ApiError::bad_request("expected a JSON object")),
    }
}

pub(crate) async fn load_visible(
    tree: &Tree,
    kind: Kind,
    id: &str,
    actor_id: &str,
) -> Result<Node, ApiError> {
    let node = tree.load(kind, id).await?;
    if !acl::visible_by(tree, &node, actor_id).await? {
        return Err(ApiError::unauthorized(format!(
            "not allowed to access this {}",
            kind.as_str()
        )));
    }
    Ok(node)
}

pub(crate) async fn load_editable(
    tree: &Tree,
    kind: Kind,
    id: &str,
    actor_id: &str,
) -> Result<Node, ApiError> {
    let node = tree.load(kind, id).await?;
    if !acl::editable_by(tree, &node, actor_id).await? {
        return Err(ApiError::unauthorized(format!(
            "not allowed to change this {}",
            kind.as_str()
        )));
    }
    Ok(node)
}
