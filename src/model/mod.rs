// The resource tree: User -> Group -> Checklist -> Item.
//
// One tagged `Kind` plus a single `Node` struct replace the old per-kind
// class hierarchy; every operation receives the store handle explicitly.

pub mod acl;

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::id::IdStrategy;
use crate::store::{Collection, Document, ListFilter, Store, StoreError};

/// Structural fields, never settable by callers. Payload entries with
/// these keys are silently dropped.
pub const RESERVED_FIELDS: &[&str] = &["id", "parent_id"];

/// Credential attribute on users. Written only through the credential
/// helpers and never serialized in summaries or sanitized views.
pub const PASSWORD_FIELD: &str = "password_hash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    User,
    Group,
    Checklist,
    Item,
}

impl Kind {
    pub fn collection(self) -> Collection {
        match self {
            Kind::User => Collection::Users,
            Kind::Group => Collection::Groups,
            Kind::Checklist => Collection::Checklists,
            Kind::Item => Collection::Items,
        }
    }

    /// The kind this node can contain, if any.
    pub fn child(self) -> Option<Kind> {
        match self {
            Kind::User => Some(Kind::Group),
            Kind::Group => Some(Kind::Checklist),
            Kind::Checklist => Some(Kind::Item),
            Kind::Item => None,
        }
    }

    /// The kind that contains this node, if any.
    pub fn parent(self) -> Option<Kind> {
        match self {
            Kind::User => None,
            Kind::Group => Some(Kind::User),
            Kind::Checklist => Some(Kind::Group),
            Kind::Item => Some(Kind::Checklist),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Group => "group",
            Kind::Checklist => "checklist",
            Kind::Item => "item",
        }
    }
}

/// A node in the tree. `attributes` is the open mapping minus the
/// structural fields, which live in `id` / `parent_id`.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: Kind,
    pub id: String,
    pub parent_id: Option<String>,
    pub attributes: Document,
}

impl Node {
    fn from_doc(kind: Kind, mut doc: Document) -> Result<Self, ModelError> {
        let id = match doc.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err(ModelError::NotFound),
        };
        let parent_id = match doc.remove("parent_id") {
            Some(Value::String(parent_id)) => Some(parent_id),
            _ => None,
        };
        Ok(Self { kind, id, parent_id, attributes: doc })
    }

    fn to_doc(&self) -> Document {
        let mut doc = self.attributes.clone();
        doc.insert("id".into(), Value::String(self.id.clone()));
        if let Some(parent_id) = &self.parent_id {
            doc.insert("parent_id".into(), Value::String(parent_id.clone()));
        }
        doc
    }

    pub fn name(&self) -> &str {
        self.attributes.get("name").and_then(Value::as_str).unwrap_or("")
    }

    /// Groups are private unless explicitly configured otherwise.
    pub fn is_private(&self) -> bool {
        self.attributes.get("private").and_then(Value::as_bool).unwrap_or(true)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("not found")]
    NotFound,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}s cannot have children")]
    Unsupported(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for ModelError {
    fn from(err: StoreError) -> Self {
        ModelError::Storage(err)
    }
}

/// Handle bundling the store and the active identifier strategy. Cheap to
/// clone; owned by the process entry point and passed into every operation.
#[derive(Clone)]
pub struct Tree {
    store: Arc<dyn Store>,
    ids: Arc<dyn IdStrategy>,
}

impl Tree {
    pub fn new(store: Arc<dyn Store>, ids: Arc<dyn IdStrategy>) -> Self {
        Self { store, ids }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Look a node up by an externally supplied id. A lexically invalid id
    /// is reported as `NotFound`, indistinguishable from an absent one.
    pub async fn load(&self, kind: Kind, raw_id: &str) -> Result<Node, ModelError> {
        let id = match self.ids.parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), error = %e, "rejecting identifier");
                return Err(ModelError::NotFound);
            }
        };
        let doc = self.store.get(kind.collection(), &id).await?.ok_or(ModelError::NotFound)?;
        Node::from_doc(kind, doc)
    }

    /// Create a root user. `name` is required and doubles as the login
    /// handle, so it must be unique.
    pub async fn create_user(&self, attributes: Document) -> Result<Node, ModelError> {
        let attributes = strip_reserved(attributes);
        let name = match attributes.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ModelError::MissingField("name")),
        };
        if self.find_user_by_name(&name).await?.is_some() {
            return Err(ModelError::Conflict(format!("user name already taken: {}", name)));
        }

        let id = self.ids.allocate(self.store(), Collection::Users).await?;
        let node = Node { kind: Kind::User, id, parent_id: None, attributes };
        self.put_with_retry(&node).await?;
        Ok(node)
    }

    pub async fn find_user_by_name(&self, name: &str) -> Result<Option<Node>, ModelError> {
        let mut docs = self.store.list(Collection::Users, &ListFilter::by_name(name)).await?;
        match docs.pop() {
            Some(doc) => Ok(Some(Node::from_doc(Kind::User, doc)?)),
            None => Ok(None),
        }
    }

    /// Create a child node under `parent`. Caller-supplied `id` and
    /// `parent_id` are dropped; `name` is required; groups default to
    /// private. An item creation also appends an `{id}` reference to the
    /// parent checklist's `items` list.
    pub async fn create_child(
        &self,
        parent: &Node,
        attributes: Document,
    ) -> Result<Node, ModelError> {
        let child_kind = parent.kind.child().ok_or(ModelError::Unsupported(parent.kind.as_str()))?;

        let mut attributes = strip_reserved(attributes);
        if !attributes.get("name").and_then(Value::as_str).is_some_and(|n| !n.is_empty()) {
            return Err(ModelError::MissingField("name"));
        }
        if child_kind == Kind::Group && !attributes.contains_key("private") {
            attributes.insert("private".into(), Value::Bool(true));
        }
        if child_kind == Kind::Item {
            // Items never carry a nested items list of their own.
            attributes.remove("items");
        }

        let id = self.ids.allocate(self.store(), child_kind.collection()).await?;
        let node =
            Node { kind: child_kind, id, parent_id: Some(parent.id.clone()), attributes };
        self.put_with_retry(&node).await?;

        if parent.kind == Kind::Checklist {
            // Keep the denormalized items list consistent. Reload the
            // parent so a concurrent append is not clobbered.
            let mut checklist = self.load(Kind::Checklist, &parent.id).await?;
            append_item_ref(&mut checklist.attributes, &node.id);
            self.put_with_retry(&checklist).await?;
        }
        Ok(node)
    }

    /// Shallow-merge `partial` into the node's attributes: untouched keys
    /// survive, reserved keys are ignored.
    pub async fn update(&self, node: &Node, partial: Document) -> Result<Node, ModelError> {
        if partial.is_empty() {
            return Err(ModelError::BadRequest("no information provided".into()));
        }
        let mut partial = strip_reserved(partial);
        if node.kind == Kind::Checklist {
            if let Some(items) = partial.remove("items") {
                partial.insert("items".into(), canonicalize_items(items)?);
            }
        }

        let mut updated = node.clone();
        for (key, value) in partial {
            updated.attributes.insert(key, value);
        }
        self.put_with_retry(&updated).await?;
        Ok(updated)
    }

    /// Delete a node. Nodes that still have children block the deletion
    /// (no cascade); an item deletion first drops its reference from the
    /// parent checklist so no dangling entry survives.
    pub async fn delete(&self, node: &Node) -> Result<(), ModelError> {
        if let Some(child_kind) = node.kind.child() {
            let filter = ListFilter::children_of(&node.id);
            if self.store.count(child_kind.collection(), &filter).await? > 0 {
                return Err(ModelError::Conflict(format!("{} is not empty", node.kind.as_str())));
            }
        }

        if node.kind == Kind::Item {
            if let Some(parent_id) = &node.parent_id {
                match self.load(Kind::Checklist, parent_id).await {
                    Ok(mut checklist) => {
                        if remove_item_ref(&mut checklist.attributes, &node.id) {
                            self.put_with_retry(&checklist).await?;
                        }
                    }
                    Err(ModelError::NotFound) => {
                        tracing::error!(item = %node.id, checklist = %parent_id, "removing item whose checklist is gone");
                    }
                    Err(e) => return Err(e),
                }
            } else {
                tracing::error!(item = %node.id, "item does not belong to a checklist");
            }
        }

        self.delete_with_retry(node.kind.collection(), &node.id).await
    }

    /// Direct children, optionally restricted to public groups.
    pub async fn children(&self, node: &Node, public_only: bool) -> Result<Vec<Node>, ModelError> {
        let child_kind = node.kind.child().ok_or(ModelError::Unsupported(node.kind.as_str()))?;
        let mut filter = ListFilter::children_of(&node.id);
        filter.public_only = public_only;
        let docs = self.store.list(child_kind.collection(), &filter).await?;
        docs.into_iter().map(|doc| Node::from_doc(child_kind, doc)).collect()
    }

    pub async fn count_children(&self, node: &Node) -> Result<usize, ModelError> {
        match node.kind.child() {
            Some(child_kind) => {
                let filter = ListFilter::children_of(&node.id);
                Ok(self.store.count(child_kind.collection(), &filter).await?)
            }
            None => Ok(0),
        }
    }

    async fn put_with_retry(&self, node: &Node) -> Result<(), ModelError> {
        let collection = node.kind.collection();
        let doc = node.to_doc();
        if let Err(first) = self.store.put(collection, doc.clone()).await {
            tracing::warn!(%collection, id = %node.id, error = %first, "write failed, retrying once");
            self.store.put(collection, doc).await.map_err(|e| {
                tracing::error!(%collection, id = %node.id, error = %e, "write failed after retry");
                ModelError::Storage(e)
            })?;
        }
        Ok(())
    }

    async fn delete_with_retry(&self, collection: Collection, id: &str) -> Result<(), ModelError> {
        if let Err(first) = self.store.delete(collection, id).await {
            tracing::warn!(%collection, %id, error = %first, "delete failed, retrying once");
            self.store.delete(collection, id).await.map_err(|e| {
                tracing::error!(%collection, %id, error = %e, "delete failed after retry");
                ModelError::Storage(e)
            })?;
        }
        Ok(())
    }
}

/// Public projection: only fields safe for any caller. Never includes the
/// credential attribute.
pub fn summary(node: &Node) -> Value {
    let mut out = json!({
        "id": node.id,
        "name": node.name(),
    });
    if node.kind == Kind::Group {
        out["private"] = Value::Bool(node.is_private());
    }
    out
}

/// Full attribute view with structural fields restored and sensitive
/// fields removed. This is what single-node GET responses are built from.
pub fn sane_attributes(node: &Node) -> Document {
    let mut doc = node.to_doc();
    doc.remove(PASSWORD_FIELD);
    doc
}

fn strip_reserved(mut attributes: Document) -> Document {
    for field in RESERVED_FIELDS {
        if attributes.remove(*field).is_some() {
            tracing::warn!(field = *field, "dropping caller-supplied reserved field");
        }
    }
    attributes
}

/// One entry of a checklist's `items` list. Both shapes appear in stored
/// data: `{id}` references to item documents, and legacy inline documents.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEntry {
    Ref(String),
    Inline(Document),
}

/// Normalize a checklist's `items` attribute. Non-object entries are
/// dropped with a warning.
pub fn checklist_items(attributes: &Document) -> Vec<ItemEntry> {
    let Some(Value::Array(entries)) = attributes.get("items") else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Object(map) => match map.get("id").and_then(Value::as_str) {
                Some(id) => out.push(ItemEntry::Ref(id.to_string())),
                None => out.push(ItemEntry::Inline(map.clone())),
            },
            other => {
                tracing::warn!(entry = %other, "ignoring malformed items entry");
            }
        }
    }
    out
}

/// Canonical write shape for `items`: a list of `{id}` references. Entries
/// that do not reference an item are rejected, which steers legacy inline
/// data onto the canonical shape as it is rewritten.
fn canonicalize_items(items: Value) -> Result<Value, ModelError> {
    let Value::Array(entries) = items else {
        return Err(ModelError::BadRequest("items must be a list".into()));
    };
    let mut canonical = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.get("id").and_then(Value::as_str) {
            Some(id) => canonical.push(json!({ "id": id })),
            None => {
                return Err(ModelError::BadRequest(
                    "items entries must reference an item id".into(),
                ))
            }
        }
    }
    Ok(Value::Array(canonical))
}

fn append_item_ref(attributes: &mut Document, item_id: &str) {
    let entry = json!({ "id": item_id });
    match attributes.get_mut("items") {
        Some(Value::Array(entries)) => entries.push(entry),
        _ => {
            attributes.insert("items".into(), Value::Array(vec![entry]));
        }
    }
}

fn remove_item_ref(attributes: &mut Document, item_id: &str) -> bool {
    let Some(Value::Array(entries)) = attributes.get_mut("items") else {
        return false;
    };
    let before = entries.len();
    entries.retain(|entry| entry.get("id").and_then(Value::as_str) != Some(item_id));
    entries.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::store::MemoryStore;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn tree() -> Tree {
        Tree::new(Arc::new(MemoryStore::new()), Arc::new(SequentialIds))
    }

    async fn user(tree: &Tree, name: &str) -> Node {
        tree.create_user(doc(json!({ "name": name }))).await.unwrap()
    }

    #[tokio::test]
    async fn group_creation_defaults_to_private() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "Home"}))).await.unwrap();
        assert!(group.is_private());

        let public = tree
            .create_child(&alice, doc(json!({"name": "Shared", "private": false})))
            .await
            .unwrap();
        assert!(!public.is_private());
    }

    #[tokio::test]
    async fn groups_of_different_users_get_distinct_ids() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let bob = user(&tree, "bob").await;

        let home = tree.create_child(&alice, doc(json!({"name": "Home"}))).await.unwrap();
        let work = tree.create_child(&bob, doc(json!({"name": "Work"}))).await.unwrap();
        assert_ne!(home.id, work.id);

        // Alice's group survives bob's creation intact.
        let reloaded = tree.load(Kind::Group, &home.id).await.unwrap();
        assert_eq!(reloaded.name(), "Home");
        assert_eq!(reloaded.parent_id.as_deref(), Some(alice.id.as_str()));
    }

    #[tokio::test]
    async fn reserved_fields_are_stripped_on_create() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "Home"}))).await.unwrap();

        let checklist = tree
            .create_child(
                &group,
                doc(json!({"id": "hacker", "parent_id": "other", "name": "C"})),
            )
            .await
            .unwrap();
        assert_ne!(checklist.id, "hacker");
        assert_eq!(checklist.parent_id.as_deref(), Some(group.id.as_str()));
        assert!(!checklist.attributes.contains_key("id"));
    }

    #[tokio::test]
    async fn update_is_a_shallow_merge_that_ignores_reserved_fields() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "Home"}))).await.unwrap();
        let checklist = tree
            .create_child(&group, doc(json!({"name": "A", "color": "red"})))
            .await
            .unwrap();

        let updated = tree
            .update(&checklist, doc(json!({"color": "blue", "id": "evil"})))
            .await
            .unwrap();
        assert_eq!(updated.name(), "A");
        assert_eq!(updated.attributes.get("color"), Some(&json!("blue")));
        assert_eq!(updated.id, checklist.id);

        let reloaded = tree.load(Kind::Checklist, &checklist.id).await.unwrap();
        assert_eq!(reloaded.attributes.get("color"), Some(&json!("blue")));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let err = tree.update(&alice, Document::new()).await.unwrap_err();
        assert!(matches!(err, ModelError::BadRequest(_)));
    }

    #[tokio::test]
    async fn items_cannot_have_children() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "g"}))).await.unwrap();
        let checklist = tree.create_child(&group, doc(json!({"name": "c"}))).await.unwrap();
        let item = tree.create_child(&checklist, doc(json!({"name": "i"}))).await.unwrap();

        let err = tree.create_child(&item, doc(json!({"name": "x"}))).await.unwrap_err();
        assert!(matches!(err, ModelError::Unsupported("item")));
    }

    #[tokio::test]
    async fn name_is_required_on_creation() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let err = tree.create_child(&alice, doc(json!({"private": false}))).await.unwrap_err();
        assert!(matches!(err, ModelError::MissingField("name")));
    }

    #[tokio::test]
    async fn user_names_are_unique() {
        let tree = tree();
        user(&tree, "alice").await;
        let err = tree.create_user(doc(json!({"name": "alice"}))).await.unwrap_err();
        assert!(matches!(err, ModelError::Conflict(_)));
    }

    #[tokio::test]
    async fn item_creation_appends_a_reference_to_the_checklist() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "g"}))).await.unwrap();
        let checklist = tree.create_child(&group, doc(json!({"name": "c"}))).await.unwrap();

        let item = tree.create_child(&checklist, doc(json!({"name": "milk"}))).await.unwrap();
        let reloaded = tree.load(Kind::Checklist, &checklist.id).await.unwrap();
        assert_eq!(checklist_items(&reloaded.attributes), vec![ItemEntry::Ref(item.id.clone())]);
    }

    #[tokio::test]
    async fn deleting_an_item_fixes_up_the_checklist() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "g"}))).await.unwrap();
        let checklist = tree.create_child(&group, doc(json!({"name": "c"}))).await.unwrap();
        let item = tree.create_child(&checklist, doc(json!({"name": "milk"}))).await.unwrap();

        tree.delete(&item).await.unwrap();

        let reloaded = tree.load(Kind::Checklist, &checklist.id).await.unwrap();
        assert!(checklist_items(&reloaded.attributes).is_empty());
        assert!(matches!(
            tree.load(Kind::Item, &item.id).await.unwrap_err(),
            ModelError::NotFound
        ));
    }

    #[tokio::test]
    async fn nonempty_nodes_block_deletion() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "g"}))).await.unwrap();
        let checklist = tree.create_child(&group, doc(json!({"name": "c"}))).await.unwrap();
        tree.create_child(&checklist, doc(json!({"name": "milk"}))).await.unwrap();

        assert!(matches!(tree.delete(&group).await.unwrap_err(), ModelError::Conflict(_)));
        assert!(matches!(tree.delete(&checklist).await.unwrap_err(), ModelError::Conflict(_)));

        // Once emptied bottom-up, everything goes.
        let item = tree.children(&checklist, false).await.unwrap().pop().unwrap();
        tree.delete(&item).await.unwrap();
        tree.delete(&checklist).await.unwrap();
        tree.delete(&group).await.unwrap();
        tree.delete(&alice).await.unwrap();
    }

    #[tokio::test]
    async fn inline_item_entries_are_readable_but_not_writable() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "g"}))).await.unwrap();
        let mut checklist = tree.create_child(&group, doc(json!({"name": "c"}))).await.unwrap();

        // Legacy shape: an anonymous inline document.
        checklist
            .attributes
            .insert("items".into(), json!([{"name": "inline task", "done": false}]));
        let entries = checklist_items(&checklist.attributes);
        assert!(matches!(entries[0], ItemEntry::Inline(_)));

        let err = tree
            .update(&checklist, doc(json!({"items": [{"name": "no id"}]})))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::BadRequest(_)));
    }

    #[tokio::test]
    async fn items_update_canonicalizes_to_references() {
        let tree = tree();
        let alice = user(&tree, "alice").await;
        let group = tree.create_child(&alice, doc(json!({"name": "g"}))).await.unwrap();
        let checklist = tree.create_child(&group, doc(json!({"name": "c"}))).await.unwrap();
        let a = tree.create_child(&checklist, doc(json!({"name": "a"}))).await.unwrap();
        let b = tree.create_child(&checklist, doc(json!({"name": "b"}))).await.unwrap();

        // Reorder with extra junk per entry; only the references survive.
        let checklist = tree.load(Kind::Checklist, &checklist.id).await.unwrap();
        let updated = tree
            .update(
                &checklist,
                doc(json!({"items": [
                    {"id": b.id, "name": "stale copy"},
                    {"id": a.id},
                ]})),
            )
            .await
            .unwrap();
        assert_eq!(
            updated.attributes.get("items"),
            Some(&json!([{ "id": b.id }, { "id": a.id }]))
        );
    }

    #[tokio::test]
    async fn summary_never_leaks_credentials() {
        let tree = tree();
        let mut alice = user(&tree, "alice").await;
        alice.attributes.insert(PASSWORD_FIELD.into(), json!("$argon2id$fake"));
        let updated = tree
            .update(&alice, doc(json!({ PASSWORD_FIELD: "$argon2id$fake" })))
            .await
            .unwrap();

        let summary = summary(&updated);
        assert!(summary.get(PASSWORD_FIELD).is_none());
        assert_eq!(summary["name"], "alice");

        let sane = sane_attributes(&updated);
        assert!(!sane.contains_key(PASSWORD_FIELD));
        assert_eq!(sane.get("id"), Some(&json!(updated.id)));
    }

    #[tokio::test]
    async fn invalid_identifiers_read_as_not_found() {
        let tree = tree();
        assert!(matches!(
            tree.load(Kind::User, "not-a-number").await.unwrap_err(),
            ModelError::NotFound
        ));
    }
}
