// Access control: visibility and editability, decided by walking ownership
// up the tree to the owning user. The two predicates are independent axes:
// a public group is readable by anyone but writable only by its owner.

use super::{Kind, ModelError, Node, Tree};

/// Whether `actor_id` may read `node`.
///
/// Users are visible to any authenticated actor. A group is visible to its
/// owner always, and to others only when not private. Checklists and items
/// inherit the verdict of their group ancestor. A broken parent chain
/// fails closed.
pub async fn visible_by(tree: &Tree, node: &Node, actor_id: &str) -> Result<bool, ModelError> {
    let mut current = node.clone();
    loop {
        match current.kind {
            Kind::User => return Ok(true),
            Kind::Group => {
                // The owner must actually exist; a dangling reference is a
                // broken chain like any other.
                let Some(owner) = load_parent(tree, &current).await? else {
                    return Ok(false);
                };
                if owner.id == actor_id {
                    return Ok(true);
                }
                return Ok(!current.is_private());
            }
            Kind::Checklist | Kind::Item => match load_parent(tree, &current).await? {
                Some(parent) => current = parent,
                None => return Ok(false),
            },
        }
    }
}

/// Whether `actor_id` may mutate or delete `node`: only the owning user,
/// regardless of the `private` flag. A broken parent chain fails closed.
pub async fn editable_by(tree: &Tree, node: &Node, actor_id: &str) -> Result<bool, ModelError> {
    let mut current = node.clone();
    loop {
        match current.kind {
            Kind::User => return Ok(current.id == actor_id),
            _ => match load_parent(tree, &current).await? {
                Some(parent) => current = parent,
                None => return Ok(false),
            },
        }
    }
}

async fn load_parent(tree: &Tree, node: &Node) -> Result<Option<Node>, ModelError> {
    let (Some(parent_kind), Some(parent_id)) = (node.kind.parent(), &node.parent_id) else {
        return Ok(None);
    };
    match tree.load(parent_kind, parent_id).await {
        Ok(parent) => Ok(Some(parent)),
        Err(ModelError::NotFound) => {
            tracing::warn!(kind = node.kind.as_str(), id = %node.id, "parent chain broken, denying access");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
