mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

async fn make_group(app: &TestApp, token: &str, name: &str) -> String {
    let (status, group) = app
        .request("POST", "/api/groups/", Some(token), Some(json!({ "name": name })))
        .await;
    assert_eq!(status, StatusCode::OK);
    group["id"].as_str().unwrap().to_string()
}

async fn make_checklist(app: &TestApp, token: &str, group_id: &str, name: &str) -> String {
    let (status, checklist) = app
        .request(
            "POST",
            "/api/checklists/",
            Some(token),
            Some(json!({ "name": name, "parent_id": group_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    checklist["id"].as_str().unwrap().to_string()
}

async fn make_item(app: &TestApp, token: &str, checklist_id: &str, name: &str) -> String {
    let (status, item) = app
        .request(
            "POST",
            "/api/items/",
            Some(token),
            Some(json!({ "name": name, "parent_id": checklist_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    item["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn checklist_create_requires_a_parent() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/checklists/",
            Some(&alice),
            Some(json!({ "name": "Orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Parent that does not exist reads as not found.
    let (status, _) = app
        .request(
            "POST",
            "/api/checklists/",
            Some(&alice),
            Some(json!({ "name": "Lost", "parent_id": "42" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cannot_create_under_someone_elses_group() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;
    let (_, bob) = app.signup("bob").await;
    let group_id = make_group(&app, &alice, "Home").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/checklists/",
            Some(&bob),
            Some(json!({ "name": "Intruder", "parent_id": group_id })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn items_appear_in_the_checklist_view() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;
    let group_id = make_group(&app, &alice, "Home").await;
    let checklist_id = make_checklist(&app, &alice, &group_id, "Chores").await;

    let milk = make_item(&app, &alice, &checklist_id, "buy milk").await;
    let bins = make_item(&app, &alice, &checklist_id, "take out bins").await;

    let uri = format!("/api/checklists/{}", checklist_id);
    let (status, checklist) = app.request("GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = checklist["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], milk);
    assert_eq!(items[0]["name"], "buy milk");
    assert!(items[0]["uri"].as_str().unwrap().ends_with(&format!("/api/items/{}", milk)));
    assert_eq!(items[1]["id"], bins);
}

#[tokio::test]
async fn deleting_an_item_drops_it_from_the_checklist() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;
    let group_id = make_group(&app, &alice, "Home").await;
    let checklist_id = make_checklist(&app, &alice, &group_id, "Chores").await;
    let milk = make_item(&app, &alice, &checklist_id, "buy milk").await;
    let bins = make_item(&app, &alice, &checklist_id, "take out bins").await;

    let (status, _) = app
        .request("DELETE", &format!("/api/items/{}", milk), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, checklist) = app
        .request("GET", &format!("/api/checklists/{}", checklist_id), Some(&alice), None)
        .await;
    let items = checklist["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], bins);
}

#[tokio::test]
async fn updating_items_reorders_but_rejects_inline_entries() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;
    let group_id = make_group(&app, &alice, "Home").await;
    let checklist_id = make_checklist(&app, &alice, &group_id, "Chores").await;
    let first = make_item(&app, &alice, &checklist_id, "first").await;
    let second = make_item(&app, &alice, &checklist_id, "second").await;

    let uri = format!("/api/checklists/{}", checklist_id);
    let (status, checklist) = app
        .request(
            "PUT",
            &uri,
            Some(&alice),
            Some(json!({ "items": [{ "id": second }, { "id": first }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = checklist["items"].as_array().unwrap();
    assert_eq!(items[0]["id"], second);
    assert_eq!(items[1]["id"], first);

    // Items are created through their own endpoint, not written inline.
    let (status, _) = app
        .request(
            "PUT",
            &uri,
            Some(&alice),
            Some(json!({ "items": [{ "name": "smuggled in" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checklist_delete_is_blocked_while_items_remain() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;
    let group_id = make_group(&app, &alice, "Home").await;
    let checklist_id = make_checklist(&app, &alice, &group_id, "Chores").await;
    let milk = make_item(&app, &alice, &checklist_id, "buy milk").await;

    let uri = format!("/api/checklists/{}", checklist_id);
    let (status, _) = app.request("DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request("DELETE", &format!("/api/items/{}", milk), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request("DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn items_in_a_private_subtree_follow_the_group_visibility() {
    let app = TestApp::new();
    let (_, alice) = app.signup("alice").await;
    let (_, bob) = app.signup("bob").await;
    let group_id = make_group(&app, &alice, "Home").await;
    let checklist_id = make_checklist(&app, &alice, &group_id, "Chores").await;
    let milk = make_item(&app, &alice, &checklist_id, "buy milk").await;

    let (status, _) = app
        .request("GET", &format!("/api/items/{}", milk), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Flip the group public: the whole subtree becomes readable.
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/groups/{}", group_id),
            Some(&alice),
            Some(json!({ "private": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, item) = app
        .request("GET", &format!("/api/items/{}", milk), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["name"], "buy milk");

    // Readable is not editable.
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/items/{}", milk),
            Some(&bob),
            Some(json!({ "done": true })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
