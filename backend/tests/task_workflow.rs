mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{DEADLINE, TestApp, spawn_app, spawn_app_customized, spawn_app_with, test_config};
use estateflow::auth::guard::Authorizer;
use estateflow::auth::models::SessionUser;
use estateflow::database::models::{IssueStatus, PermissionAction, User};
use estateflow::errors::ServiceResult;
use estateflow::repositories::quality_issue_repository::QualityIssueRepository;
use estateflow::repositories::task_repository::TaskRepository;
use estateflow::services::email_service::Mailer;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Forwards every sent email's recipient and subject to a channel.
struct RecordingMailer {
    sent: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        _html_content: &str,
        _text_content: &str,
    ) -> ServiceResult<()> {
        let _ = self.sent.send((to_email.to_string(), subject.to_string()));
        Ok(())
    }
}

struct DenyAll;

impl Authorizer for DenyAll {
    fn can(&self, _user: &SessionUser, _module: &str, _action: PermissionAction) -> bool {
        false
    }
}

struct Site {
    admin: String,
    incharge: String,
    carl: String,
    dana: String,
    incharge_user: User,
    carl_user: User,
    dana_user: User,
    project_id: String,
}

/// Admin, one site incharge, two contractors and a project supervised by
/// the site incharge.
async fn setup(app: &TestApp) -> Site {
    app.seed_user("Admin", "admin@example.com", "admin").await;
    let incharge_user = app
        .seed_user("Sam", "sam@example.com", "site_incharge")
        .await;
    let carl_user = app.seed_user("Carl", "carl@example.com", "contractor").await;
    let dana_user = app.seed_user("Dana", "dana@example.com", "contractor").await;

    let admin = app.login("admin@example.com").await;
    let incharge = app.login("sam@example.com").await;
    let carl = app.login("carl@example.com").await;
    let dana = app.login("dana@example.com").await;

    let project = app
        .post(
            "/api/projects",
            &admin,
            json!({
                "name": "Tower A",
                "building_id": "B1",
                "floor_unit_id": "F3",
                "unit_id": "U301",
                "site_incharge_id": incharge_user.id,
                "priority": "high",
            }),
        )
        .await;
    assert_eq!(project.status, StatusCode::CREATED, "{}", project.body);
    let project_id = project.body["data"]["id"].as_str().unwrap().to_string();

    Site {
        admin,
        incharge,
        carl,
        dana,
        incharge_user,
        carl_user,
        dana_user,
        project_id,
    }
}

async fn create_task(app: &TestApp, site: &Site, unit: &str, title: &str) -> Value {
    let response = app
        .post(
            &format!("/api/projects/{}/tasks", site.project_id),
            &site.admin,
            json!({
                "unit": unit,
                "contractor_id": site.carl_user.id,
                "title": title,
                "deadline": DEADLINE,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["data"].clone()
}

fn contractor_uri(site: &Site, task_id: &str) -> String {
    format!("/api/projects/{}/tasks/{}/contractor", site.project_id, task_id)
}

fn review_uri(site: &Site, task_id: &str) -> String {
    format!(
        "/api/projects/{}/tasks/{}/site-incharge",
        site.project_id, task_id
    )
}

#[tokio::test]
async fn created_task_lands_in_unit_and_roster() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    let task = create_task(&app, &site, "A", "Lay tiles").await;
    assert_eq!(task["status_for_contractor"], "in_progress");
    assert_eq!(task["status_for_site_incharge"], "pending_verification");
    assert_eq!(task["progress_percentage"], 0);

    let details = app
        .get(&format!("/api/projects/{}", site.project_id), &site.admin)
        .await;
    assert_eq!(details.status, StatusCode::OK);
    assert_eq!(details.body["data"]["units"]["A"].as_array().unwrap().len(), 1);
    assert!(
        details.body["data"]["contractors"]
            .as_array()
            .unwrap()
            .contains(&json!(site.carl_user.id))
    );
}

#[tokio::test]
async fn submission_then_approval_completes_task() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let submitted = app
        .patch(
            &contractor_uri(&site, task_id),
            &site.carl,
            json!({
                "photos": ["https://cdn.example.com/tiles-1.jpg"],
                "evidence_title": "Tiles laid",
                "progress_percentage": 100,
                "status": "completed",
                "should_submit": true,
            }),
        )
        .await;
    assert_eq!(submitted.status, StatusCode::OK, "{}", submitted.body);
    assert_eq!(submitted.body["data"]["is_approved_by_contractor"], true);
    assert!(!submitted.body["data"]["submitted_by_contractor_on"].is_null());

    let awaiting = app.get("/api/projects/tasks", &site.incharge).await;
    assert_eq!(awaiting.status, StatusCode::OK);
    assert!(
        awaiting.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["id"] == task_id)
    );

    let reviewed = app
        .patch(
            &review_uri(&site, task_id),
            &site.incharge,
            json!({
                "verification_decision": "approved",
                "quality_assessment": "good",
                "note": "Looks right",
                "photos": ["https://cdn.example.com/check-1.jpg"],
            }),
        )
        .await;
    assert_eq!(reviewed.status, StatusCode::OK, "{}", reviewed.body);
    let data = &reviewed.body["data"];
    assert_eq!(data["status_for_site_incharge"], "approved");
    assert_eq!(data["is_approved_by_site_manager"], true);
    assert_eq!(data["is_approved_by_contractor"], true);
    assert_eq!(data["contractor_uploaded_photos"].as_array().unwrap().len(), 1);
    assert_eq!(data["site_incharge_uploaded_photos"].as_array().unwrap().len(), 1);

    let stored = TaskRepository::new(&app.state.pool)
        .get_task_by_id(task_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_done());
}

#[tokio::test]
async fn review_before_submission_is_recorded_but_not_done() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Plaster walls").await;
    let task_id = task["id"].as_str().unwrap();

    let reviewed = app
        .patch(
            &review_uri(&site, task_id),
            &site.incharge,
            json!({ "verification_decision": "approved" }),
        )
        .await;

    assert_eq!(reviewed.status, StatusCode::OK);
    assert_eq!(reviewed.body["data"]["is_approved_by_site_manager"], true);
    assert_eq!(reviewed.body["data"]["is_approved_by_contractor"], false);

    let stored = TaskRepository::new(&app.state.pool)
        .get_task_by_id(task_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_done());
}

#[tokio::test]
async fn strict_policy_rejects_review_before_submission() {
    let mut config = test_config();
    config.review_requires_contractor_submission = true;
    let app = spawn_app_with(config).await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Plaster walls").await;
    let task_id = task["id"].as_str().unwrap();

    let reviewed = app
        .patch(
            &review_uri(&site, task_id),
            &site.incharge,
            json!({ "verification_decision": "approved" }),
        )
        .await;

    assert_eq!(reviewed.status, StatusCode::BAD_REQUEST);
    assert_eq!(reviewed.error_type(), Some("invalid_operation"));
}

#[tokio::test]
async fn rework_decision_keeps_task_open() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Paint ceiling").await;
    let task_id = task["id"].as_str().unwrap();

    app.patch(
        &contractor_uri(&site, task_id),
        &site.carl,
        json!({ "status": "completed", "progress_percentage": 100, "should_submit": true }),
    )
    .await;

    let reviewed = app
        .patch(
            &review_uri(&site, task_id),
            &site.incharge,
            json!({ "verification_decision": "rework", "note": "Second coat needed" }),
        )
        .await;

    assert_eq!(reviewed.status, StatusCode::OK);
    assert_eq!(reviewed.body["data"]["status_for_site_incharge"], "rework");
    assert_eq!(reviewed.body["data"]["is_approved_by_site_manager"], false);
    assert_eq!(reviewed.body["data"]["site_incharge_note"], "Second coat needed");
}

#[tokio::test]
async fn assigning_contractor_to_unit_twice_is_idempotent() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let uri = format!("/api/projects/{}/contractors", site.project_id);
    let body = json!({ "unit": "B", "contractor_id": site.dana_user.id });

    let first = app.post(&uri, &site.admin, body.clone()).await;
    let second = app.post(&uri, &site.admin, body).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(second.status, StatusCode::OK);

    let data = &second.body["data"];
    assert_eq!(data["assigned_contractors"]["B"], json!([site.dana_user.id]));
    let roster: Vec<&Value> = data["contractors"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|id| **id == json!(site.dana_user.id))
        .collect();
    assert_eq!(roster.len(), 1);
}

#[tokio::test]
async fn other_contractor_cannot_update_task() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let response = app
        .patch(
            &contractor_uri(&site, task_id),
            &site.dana,
            json!({ "progress_percentage": 50 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_type(), Some("permission_denied"));
}

#[tokio::test]
async fn contractor_cannot_use_site_incharge_route() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let response = app
        .patch(
            &review_uri(&site, task_id),
            &site.carl,
            json!({ "verification_decision": "approved" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_the_project_site_incharge_can_review() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    app.seed_user("Olga", "olga@example.com", "site_incharge").await;
    let olga = app.login("olga@example.com").await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let response = app
        .patch(
            &review_uri(&site, task_id),
            &olga,
            json!({ "verification_decision": "approved" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_type(), Some("permission_denied"));
}

#[tokio::test]
async fn concurrent_photo_uploads_are_all_kept() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();
    let uri = contractor_uri(&site, task_id);

    let (first, second) = tokio::join!(
        app.patch(&uri, &site.carl, json!({ "photos": ["https://cdn.example.com/1.jpg"] })),
        app.patch(&uri, &site.carl, json!({ "photos": ["https://cdn.example.com/2.jpg"] })),
    );
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);

    let stored = TaskRepository::new(&app.state.pool)
        .get_task_by_id(task_id)
        .await
        .unwrap()
        .unwrap();
    let mut photos = stored.contractor_uploaded_photos.clone();
    photos.sort();
    assert_eq!(
        photos,
        vec![
            "https://cdn.example.com/1.jpg".to_string(),
            "https://cdn.example.com/2.jpg".to_string(),
        ]
    );
}

#[tokio::test]
async fn pending_review_status_is_rejected() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let response = app
        .patch(
            &contractor_uri(&site, task_id),
            &site.carl,
            json!({ "status": "pending_review" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quick_update_to_completed_marks_contractor_approval() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let response = app
        .patch(
            &format!(
                "/api/projects/{}/tasks/{}/progress",
                site.project_id, task_id
            ),
            &site.carl,
            json!({ "progress_percentage": 100, "construction_phase": "finishing" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["data"]["is_approved_by_contractor"], true);
    assert_eq!(response.body["data"]["construction_phase"], "finishing");
}

#[tokio::test]
async fn task_from_another_project_is_not_found() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let task = create_task(&app, &site, "A", "Lay tiles").await;
    let task_id = task["id"].as_str().unwrap();

    let other = app
        .post(
            "/api/projects",
            &site.admin,
            json!({
                "name": "Tower B",
                "building_id": "B2",
                "floor_unit_id": "F1",
                "unit_id": "U101",
                "site_incharge_id": site.incharge_user.id,
            }),
        )
        .await;
    assert_eq!(other.status, StatusCode::CREATED, "{}", other.body);
    let other_id = other.body["data"]["id"].as_str().unwrap();

    let response = app
        .patch(
            &format!("/api/projects/{}/tasks/{}/contractor", other_id, task_id),
            &site.carl,
            json!({ "progress_percentage": 10 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assignment_for_quality_issue_points_issue_at_contractor() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    let issue = app
        .post(
            &format!("/api/projects/{}/quality-issues", site.project_id),
            &site.incharge,
            json!({ "unit": "A", "title": "Cracked tile", "severity": "major" }),
        )
        .await;
    assert_eq!(issue.status, StatusCode::CREATED, "{}", issue.body);
    let issue_id = issue.body["data"]["id"].as_str().unwrap().to_string();

    let assigned = app
        .post(
            "/api/projects/assign-task",
            &site.admin,
            json!({
                "title": "Replace cracked tile",
                "contractor_id": site.dana_user.id,
                "project_id": site.project_id,
                "unit": "A",
                "priority": "high",
                "deadline": DEADLINE,
                "quality_issue_id": issue_id,
            }),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::CREATED, "{}", assigned.body);
    assert_eq!(assigned.body["data"]["contractor_id"], site.dana_user.id.as_str());

    let stored = QualityIssueRepository::new(&app.state.pool)
        .get_issue_by_id(&issue_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.contractor_id.as_deref(), Some(site.dana_user.id.as_str()));
}

#[tokio::test]
async fn unknown_quality_issue_creates_no_task() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    let response = app
        .post(
            "/api/projects/assign-task",
            &site.admin,
            json!({
                "title": "Replace cracked tile",
                "contractor_id": site.dana_user.id,
                "project_id": site.project_id,
                "unit": "A",
                "deadline": DEADLINE,
                "quality_issue_id": "does-not-exist",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let tasks = TaskRepository::new(&app.state.pool)
        .get_tasks_by_contractor(&site.dana_user.id)
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn contractor_task_listing_is_sorted_by_priority() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    for (title, priority) in [("low", "low"), ("high", "high"), ("medium", "medium")] {
        let response = app
            .post(
                &format!("/api/projects/{}/tasks", site.project_id),
                &site.admin,
                json!({
                    "unit": "A",
                    "contractor_id": site.carl_user.id,
                    "title": title,
                    "deadline": DEADLINE,
                    "priority": priority,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app.get("/api/projects/tasks", &site.carl).await;

    assert_eq!(response.status, StatusCode::OK);
    let titles: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["high", "medium", "low"]);
}

#[tokio::test]
async fn contractor_sees_only_projects_on_their_roster() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    create_task(&app, &site, "A", "Lay tiles").await;

    let carl = app.get("/api/projects", &site.carl).await;
    let dana = app.get("/api/projects", &site.dana).await;

    assert_eq!(carl.body["data"].as_array().unwrap().len(), 1);
    assert!(dana.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn assignment_notifies_connected_contractor() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let mut receiver = app.state.notifications.subscribe(&site.carl_user.id).await;

    create_task(&app, &site, "A", "Lay tiles").await;

    let notification = receiver.try_recv().expect("notification delivered");
    assert_eq!(notification.kind, "task_assigned");
    assert_eq!(notification.data["project_id"], site.project_id.as_str());
}

#[tokio::test]
async fn assignment_emails_contractor_when_mailer_configured() {
    let (sent, mut outbox) = mpsc::unbounded_channel();
    let app = spawn_app_customized(test_config(), move |state| {
        state.with_mailer(Arc::new(RecordingMailer { sent }))
    })
    .await;
    let site = setup(&app).await;

    create_task(&app, &site, "A", "Lay tiles").await;

    let (to, subject) = tokio::time::timeout(Duration::from_secs(5), outbox.recv())
        .await
        .expect("email sent in time")
        .expect("mailer alive");
    assert_eq!(to, "carl@example.com");
    assert!(subject.contains("Lay tiles"));
}

#[tokio::test]
async fn workflow_consults_injected_authorizer() {
    let app = spawn_app_customized(test_config(), |state| {
        state.with_authorizer(Arc::new(DenyAll))
    })
    .await;
    app.seed_user("Admin", "admin@example.com", "admin").await;
    let incharge = app
        .seed_user("Sam", "sam@example.com", "site_incharge")
        .await;
    let admin = app.login("admin@example.com").await;

    let response = app
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

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_type(), Some("permission_denied"));
}

#[tokio::test]
async fn project_requires_a_site_incharge() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let accountant = app
        .seed_user("Ada", "ada@example.com", "accountant")
        .await;

    let response = app
        .post(
            "/api/projects",
            &site.admin,
            json!({
                "name": "Tower C",
                "building_id": "B3",
                "floor_unit_id": "F1",
                "unit_id": "U101",
                "site_incharge_id": accountant.id,
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", response.body);
    assert_eq!(response.error_type(), Some("not_found"));
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Site incharge")
    );

    let roster_with_incharge = app
        .post(
            "/api/projects",
            &site.admin,
            json!({
                "name": "Tower C",
                "building_id": "B3",
                "floor_unit_id": "F1",
                "unit_id": "U101",
                "site_incharge_id": site.incharge_user.id,
                "contractors": [site.incharge_user.id],
            }),
        )
        .await;
    assert_eq!(roster_with_incharge.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tasks_can_only_go_to_contractors() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    let created = app
        .post(
            &format!("/api/projects/{}/tasks", site.project_id),
            &site.admin,
            json!({
                "unit": "A",
                "contractor_id": site.incharge_user.id,
                "title": "Lay tiles",
                "deadline": DEADLINE,
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::NOT_FOUND, "{}", created.body);
    assert!(
        created.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Contractor")
    );

    let assigned = app
        .post(
            "/api/projects/assign-task",
            &site.admin,
            json!({
                "title": "Replace cracked tile",
                "contractor_id": site.incharge_user.id,
                "project_id": site.project_id,
                "unit": "A",
                "deadline": DEADLINE,
            }),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::NOT_FOUND);

    let unit = app
        .post(
            &format!("/api/projects/{}/contractors", site.project_id),
            &site.admin,
            json!({ "unit": "A", "contractor_id": site.incharge_user.id }),
        )
        .await;
    assert_eq!(unit.status, StatusCode::NOT_FOUND);

    let details = app
        .get(&format!("/api/projects/{}", site.project_id), &site.admin)
        .await;
    assert!(details.body["data"]["contractors"].as_array().unwrap().is_empty());
    assert!(details.body["data"]["units"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn quality_issues_are_listed_for_reporter_and_assignee() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    let mut issue_ids = Vec::new();
    for title in ["Cracked tile", "Loose railing"] {
        let issue = app
            .post(
                &format!("/api/projects/{}/quality-issues", site.project_id),
                &site.incharge,
                json!({ "unit": "A", "title": title, "severity": "minor" }),
            )
            .await;
        assert_eq!(issue.status, StatusCode::CREATED);
        issue_ids.push(issue.body["data"]["id"].as_str().unwrap().to_string());
    }

    let assigned = app
        .post(
            "/api/projects/assign-task",
            &site.admin,
            json!({
                "title": "Fix railing",
                "contractor_id": site.dana_user.id,
                "project_id": site.project_id,
                "unit": "A",
                "deadline": DEADLINE,
                "quality_issue_id": issue_ids[1],
            }),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::CREATED);

    let reporter = app.get("/api/projects/quality-issues", &site.incharge).await;
    assert_eq!(reporter.status, StatusCode::OK);
    let titles: Vec<&str> = reporter.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|issue| issue["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Loose railing", "Cracked tile"]);

    let assignee = app.get("/api/projects/quality-issues", &site.dana).await;
    let issues = assignee.body["data"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["id"], issue_ids[1].as_str());

    let bystander = app.get("/api/projects/quality-issues", &site.carl).await;
    assert!(bystander.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn quality_issue_status_accepts_only_known_states() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    let issue = app
        .post(
            &format!("/api/projects/{}/quality-issues", site.project_id),
            &site.incharge,
            json!({ "unit": "A", "title": "Cracked tile", "severity": "major" }),
        )
        .await;
    let issue_id = issue.body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/projects/quality-issues/{}/status", issue_id);

    let updated = app
        .patch(&uri, &site.incharge, json!({ "status": "under_review" }))
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["data"]["status"], "under_review");

    let invalid = app
        .patch(&uri, &site.incharge, json!({ "status": "closed" }))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error_type(), Some("validation_error"));

    let contractor = app
        .patch(&uri, &site.carl, json!({ "status": "resolved" }))
        .await;
    assert_eq!(contractor.status, StatusCode::FORBIDDEN);

    let unknown = app
        .patch(
            "/api/projects/quality-issues/does-not-exist/status",
            &site.incharge,
            json!({ "status": "resolved" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let stored = QualityIssueRepository::new(&app.state.pool)
        .get_issue_by_id(&issue_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, IssueStatus::UnderReview);
}

#[tokio::test]
async fn site_incharge_sees_contractor_completion() {
    let app = spawn_app().await;
    let site = setup(&app).await;

    let approved = create_task(&app, &site, "A", "Lay tiles").await;
    create_task(&app, &site, "A", "Grout tiles").await;
    create_task(&app, &site, "B", "Seal tiles").await;
    let reviewed = app
        .patch(
            &review_uri(&site, approved["id"].as_str().unwrap()),
            &site.incharge,
            json!({ "verification_decision": "approved" }),
        )
        .await;
    assert_eq!(reviewed.status, StatusCode::OK);

    let unit = app
        .post(
            &format!("/api/projects/{}/contractors", site.project_id),
            &site.admin,
            json!({ "unit": "B", "contractor_id": site.dana_user.id }),
        )
        .await;
    assert_eq!(unit.status, StatusCode::OK);

    let response = app
        .get("/api/projects/site-incharge/contractors", &site.incharge)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let contractors = response.body["data"].as_array().unwrap();
    assert_eq!(contractors.len(), 2);
    assert_eq!(contractors[0]["id"], site.carl_user.id.as_str());
    assert_eq!(contractors[0]["total_tasks"], 3);
    assert_eq!(contractors[0]["completed_tasks"], 1);
    assert_eq!(contractors[0]["completion_rate"], 33.3);
    assert_eq!(contractors[0]["projects"], json!(["Tower A"]));
    assert_eq!(contractors[1]["id"], site.dana_user.id.as_str());
    assert_eq!(contractors[1]["total_tasks"], 0);
    assert_eq!(contractors[1]["completion_rate"], 0.0);

    let forbidden = app
        .get("/api/projects/site-incharge/contractors", &site.carl)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn contractor_tasks_are_scoped_to_supervised_projects() {
    let app = spawn_app().await;
    let site = setup(&app).await;
    app.seed_user("Olga", "olga@example.com", "site_incharge").await;
    let olga = app.login("olga@example.com").await;

    for (title, priority) in [("low", "low"), ("high", "high")] {
        let response = app
            .post(
                &format!("/api/projects/{}/tasks", site.project_id),
                &site.admin,
                json!({
                    "unit": "A",
                    "contractor_id": site.carl_user.id,
                    "title": title,
                    "deadline": DEADLINE,
                    "priority": priority,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }
    create_task(&app, &site, "B", "medium").await;

    let uri = format!(
        "/api/projects/site-incharge/contractors/{}/tasks",
        site.carl_user.id
    );
    let own = app.get(&uri, &site.incharge).await;
    assert_eq!(own.status, StatusCode::OK);
    let titles: Vec<&str> = own.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["high", "medium", "low"]);

    let outsider = app.get(&uri, &olga).await;
    assert_eq!(outsider.status, StatusCode::OK);
    assert!(outsider.body["data"].as_array().unwrap().is_empty());

    let dana = format!(
        "/api/projects/site-incharge/contractors/{}/tasks",
        site.dana_user.id
    );
    assert!(
        app.get(&dana, &site.incharge).await.body["data"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}
