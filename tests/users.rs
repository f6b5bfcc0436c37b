mod common;

use axum::http::StatusCode;
use common::{assert_validation_failed, body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_user_hides_invite_code() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/users", json!({"name": "Ada", "email": "ada@example.com"}))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "User created successfully");
    assert_eq!(json["data"]["email"], "ada@example.com");
    assert!(json["data"].get("invite_code").is_none());
    assert!(json["data"].get("posts").is_none());
}

#[tokio::test]
async fn create_user_validates_email() {
    let app = TestApp::new().await;
    app.create_user("Ada").await;

    let resp = app
        .post_json("/users", json!({"name": "Other", "email": "ada@example.com"}))
        .await;
    let errors = assert_validation_failed(resp).await;
    assert_eq!(errors["email"], json!(["The email has already been taken."]));

    let resp = app
        .post_json("/users", json!({"name": "Other", "email": "not-an-email"}))
        .await;
    let errors = assert_validation_failed(resp).await;
    assert_eq!(errors["email"], json!(["The email must be a valid email address."]));
}

#[tokio::test]
async fn update_user_keeps_own_email() {
    let app = TestApp::new().await;
    let (id, _) = app.create_user("Ada").await;

    let resp = app
        .put_json(
            &format!("/users/{id}"),
            json!({"name": "Ada Lovelace", "email": "ada@example.com"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn show_and_list_load_posts() {
    let app = TestApp::new().await;
    let (id, _) = app.create_user("Ada").await;
    app.create_user("Grace").await;
    app.post_json("/posts", json!({"user_id": id, "title": "Notes", "content": "C"}))
        .await;

    let json = body_json(app.get(&format!("/users/{id}"), None).await).await;
    assert_eq!(json["message"], "User retrieved successfully");
    assert_eq!(json["data"]["posts"][0]["title"], "Notes");

    let json = body_json(app.get("/users", None).await).await;
    let users = json["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["posts"].as_array().unwrap().len(), 1);
    assert_eq!(users[1]["posts"], json!([]));
}

#[tokio::test]
async fn delete_user_removes_their_posts() {
    let app = TestApp::new().await;
    let (id, _) = app.create_user("Ada").await;
    app.post_json("/posts", json!({"user_id": id, "title": "Notes", "content": "C"}))
        .await;

    let resp = app.delete(&format!("/users/{id}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json, json!({"success": true, "message": "User deleted successfully"}));
    assert_eq!(app.count("posts").await, 0);

    let resp = app.get(&format!("/users/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
