mod common;

use axum::http::{Method, StatusCode};
use common::{DEADLINE, TestApp, spawn_app};
use serde_json::json;

async fn send(app: &TestApp, token: &str, user_id: &str, title: &str) -> String {
    let response = app
        .post(
            "/api/notifications",
            token,
            json!({ "user_id": user_id, "title": title, "message": format!("{} body", title) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn offline_contractor_finds_assignment_in_inbox() {
    let app = spawn_app().await;
    app.seed_user("Admin", "admin@example.com", "admin").await;
    let incharge = app
        .seed_user("Sam", "sam@example.com", "site_incharge")
        .await;
    let carl = app.seed_user("Carl", "carl@example.com", "contractor").await;
    let admin = app.login("admin@example.com").await;
    let carl_token = app.login("carl@example.com").await;

    let project = app
        .post(
            "/api/projects",
            &admin,
            json!({
                "name": "Tower A",
                "building_id": "B1",
                "floor_unit_id": "F3",
                "unit_id": "U301",
                "site_incharge_id": incharge.id,
            }),
        )
        .await;
    let project_id = project.body["data"]["id"].as_str().unwrap();

    let task = app
        .post(
            &format!("/api/projects/{}/tasks", project_id),
            &admin,
            json!({
                "unit": "A",
                "contractor_id": carl.id,
                "title": "Lay tiles",
                "deadline": DEADLINE,
            }),
        )
        .await;
    assert_eq!(task.status, StatusCode::CREATED);
    assert!(!app.state.notifications.is_tracking(&carl.id).await);

    let inbox = app.get("/api/notifications", &carl_token).await;
    assert_eq!(inbox.status, StatusCode::OK);
    let entries = inbox.body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "task_assigned");
    assert_eq!(entries[0]["is_read"], false);
    assert_eq!(entries[0]["data"]["task_id"], task.body["data"]["id"]);
    assert!(!entries[0]["triggered_by"].is_null());

    let count = app.get("/api/notifications/unread-count", &carl_token).await;
    assert_eq!(count.body["data"]["unread_count"], 1);
}

#[tokio::test]
async fn inbox_is_newest_first_and_tracks_reads() {
    let app = spawn_app().await;
    app.seed_user("Sam", "sam@example.com", "site_incharge").await;
    let carl = app.seed_user("Carl", "carl@example.com", "contractor").await;
    let sam = app.login("sam@example.com").await;
    let carl_token = app.login("carl@example.com").await;

    let first = send(&app, &sam, &carl.id, "First").await;
    send(&app, &sam, &carl.id, "Second").await;
    send(&app, &sam, &carl.id, "Third").await;

    let inbox = app.get("/api/notifications", &carl_token).await;
    let titles: Vec<&str> = inbox.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);

    let read = app
        .request(
            Method::PATCH,
            &format!("/api/notifications/{}/read", first),
            Some(&carl_token),
            None,
        )
        .await;
    assert_eq!(read.status, StatusCode::OK, "{}", read.body);
    assert_eq!(read.body["data"]["is_read"], true);

    let unread = app.get("/api/notifications/unread", &carl_token).await;
    assert_eq!(unread.body["data"].as_array().unwrap().len(), 2);

    let all = app
        .request(
            Method::PATCH,
            "/api/notifications/read-all",
            Some(&carl_token),
            None,
        )
        .await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["data"]["updated"], 2);

    let count = app.get("/api/notifications/unread-count", &carl_token).await;
    assert_eq!(count.body["data"]["unread_count"], 0);
}

#[tokio::test]
async fn notifications_of_other_users_are_not_found() {
    let app = spawn_app().await;
    app.seed_user("Sam", "sam@example.com", "site_incharge").await;
    let carl = app.seed_user("Carl", "carl@example.com", "contractor").await;
    app.seed_user("Dana", "dana@example.com", "contractor").await;
    let sam = app.login("sam@example.com").await;
    let dana = app.login("dana@example.com").await;

    let id = send(&app, &sam, &carl.id, "For Carl").await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/notifications/{}/read", id),
            Some(&dana),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(
        app.get("/api/notifications", &dana).await.body["data"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn sending_validates_recipient_and_content() {
    let app = spawn_app().await;
    let carl = app.seed_user("Carl", "carl@example.com", "contractor").await;
    app.seed_user("Sam", "sam@example.com", "site_incharge").await;
    let sam = app.login("sam@example.com").await;

    let unknown = app
        .post(
            "/api/notifications",
            &sam,
            json!({ "user_id": "nobody", "title": "Hi", "message": "there" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let empty = app
        .post(
            "/api/notifications",
            &sam,
            json!({ "user_id": carl.id, "title": "", "message": "there" }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.error_type(), Some("validation_error"));

    let anonymous = app
        .request(Method::GET, "/api/notifications", None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
