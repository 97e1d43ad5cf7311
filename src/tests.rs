//! Integration tests for the grant backend.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::Service;

use crate::db::{init_database, seed_if_empty, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::build(false).await
    }

    async fn seeded() -> Self {
        Self::build(true).await
    }

    async fn build(seed: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path, 5).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        if seed {
            seed_if_empty(&repo).await.expect("Failed to seed");
        }

        let app = create_router(AppState { repo });

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn put_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> u16 {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        resp.status().as_u16()
    }

    async fn create_tag(&self, name: &str) -> i64 {
        let (status, body) = self.post_json("/api/tags", json!({ "name": name })).await;
        assert_eq!(status, 201);
        body["id"].as_i64().unwrap()
    }

    async fn create_grant(&self, body: Value) -> i64 {
        let (status, body) = self.post_json("/api/grants", body).await;
        assert_eq!(status, 201);
        body["id"].as_i64().unwrap()
    }
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

fn tag_ids(grant: &Value) -> HashSet<i64> {
    ids(&grant["tags"]).into_iter().collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    for path in ["/health", "/api/health"] {
        let (status, body) = fixture.get_json(path).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "OK");
    }
}

#[tokio::test]
async fn test_grant_crud() {
    let fixture = TestFixture::new().await;
    let tag_id = fixture.create_tag("Education").await;

    // Create grant
    let grant_id = fixture
        .create_grant(json!({
            "title": "Library Fund",
            "description": "Books for rural schools",
            "amount": 1500.5,
            "deadline": "2024-09-01",
            "organization": "Reading Trust",
            "contact_email": "fund@reading.org",
            "website": "https://reading.org",
            "tags": [tag_id]
        }))
        .await;

    // Get grant
    let (status, grant) = fixture.get_json(&format!("/api/grants/{}", grant_id)).await;
    assert_eq!(status, 200);
    assert_eq!(grant["title"], "Library Fund");
    assert_eq!(grant["amount"], 1500.5);
    assert_eq!(grant["deadline"], "2024-09-01");
    assert_eq!(grant["status"], "active");
    assert_eq!(grant["tags"][0]["name"], "Education");
    assert_eq!(grant["tags"][0]["color"], "#007bff");
    assert!(grant["created_at"].is_string());
    assert_eq!(grant["created_at"], grant["updated_at"]);

    // Update grant
    let (status, body) = fixture
        .put_json(
            &format!("/api/grants/{}", grant_id),
            json!({ "status": "closed", "deadline": null }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Grant updated successfully");

    let (_, updated) = fixture.get_json(&format!("/api/grants/{}", grant_id)).await;
    assert_eq!(updated["status"], "closed");
    assert_eq!(updated["deadline"], Value::Null);
    assert_eq!(updated["title"], "Library Fund");
    assert_eq!(tag_ids(&updated), HashSet::from([tag_id]));

    // Delete grant
    assert_eq!(
        fixture.delete(&format!("/api/grants/{}", grant_id)).await,
        200
    );

    // Verify deleted
    let (status, body) = fixture.get_json(&format!("/api/grants/{}", grant_id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_grant_requires_title() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json("/api/grants", json!({ "description": "No title" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, grants) = fixture.get_json("/api/grants").await;
    assert!(grants.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_grant_skips_unknown_tags() {
    let fixture = TestFixture::new().await;
    let tag_id = fixture.create_tag("Real").await;
    let missing = tag_id + 1;

    let grant_id = fixture
        .create_grant(json!({ "title": "X", "tags": [tag_id, missing] }))
        .await;

    let (_, grant) = fixture.get_json(&format!("/api/grants/{}", grant_id)).await;
    assert_eq!(ids(&grant["tags"]), vec![tag_id]);
}

#[tokio::test]
async fn test_update_grant_replaces_tags() {
    let fixture = TestFixture::new().await;
    let a = fixture.create_tag("A").await;
    let b = fixture.create_tag("B").await;
    let c = fixture.create_tag("C").await;
    let grant_id = fixture
        .create_grant(json!({ "title": "Tagged", "tags": [a, b] }))
        .await;

    let (status, _) = fixture
        .put_json(
            &format!("/api/grants/{}", grant_id),
            json!({ "tags": [c, a, 9999] }),
        )
        .await;
    assert_eq!(status, 200);

    let (_, grant) = fixture.get_json(&format!("/api/grants/{}", grant_id)).await;
    assert_eq!(tag_ids(&grant), HashSet::from([a, c]));
    let parse = |field: &str| {
        chrono::DateTime::parse_from_rfc3339(grant[field].as_str().unwrap()).unwrap()
    };
    assert!(parse("updated_at") >= parse("created_at"));
}

#[tokio::test]
async fn test_update_missing_grant() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .put_json("/api/grants/42", json!({ "title": "Nope" }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    assert_eq!(fixture.delete("/api/grants/42").await, 404);
}

#[tokio::test]
async fn test_tag_crud() {
    let fixture = TestFixture::new().await;

    // Create tag
    let (status, body) = fixture
        .post_json(
            "/api/tags",
            json!({ "name": "Arts", "color": "#6f42c1", "description": "Culture" }),
        )
        .await;
    assert_eq!(status, 201);
    let tag_id = body["id"].as_i64().unwrap();

    // Get tag
    let (status, tag) = fixture.get_json(&format!("/api/tags/{}", tag_id)).await;
    assert_eq!(status, 200);
    assert_eq!(tag["name"], "Arts");
    assert_eq!(tag["color"], "#6f42c1");
    assert_eq!(tag["description"], "Culture");
    assert!(tag["created_at"].is_string());

    // Update tag
    let (status, _) = fixture
        .put_json(
            &format!("/api/tags/{}", tag_id),
            json!({ "name": "Fine Arts" }),
        )
        .await;
    assert_eq!(status, 200);

    // List tags
    let (status, tags) = fixture.get_json("/api/tags").await;
    assert_eq!(status, 200);
    assert_eq!(tags[0]["name"], "Fine Arts");
    assert_eq!(tags[0]["color"], "#6f42c1");

    // Delete tag
    assert_eq!(fixture.delete(&format!("/api/tags/{}", tag_id)).await, 200);
    let (status, _) = fixture.get_json(&format!("/api/tags/{}", tag_id)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_tag_validation_and_conflicts() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post_json("/api/tags", json!({ "name": "" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    fixture.create_tag("Health").await;
    let other = fixture.create_tag("Science").await;

    let (status, body) = fixture
        .post_json("/api/tags", json!({ "name": "Health", "color": "#000000" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = fixture
        .put_json(&format!("/api/tags/{}", other), json!({ "name": "Health" }))
        .await;
    assert_eq!(status, 409);

    let (status, _) = fixture
        .put_json("/api/tags/999", json!({ "name": "Ghost" }))
        .await;
    assert_eq!(status, 404);

    let (_, tags) = fixture.get_json("/api/tags").await;
    let names: Vec<&str> = tags
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Health", "Science"]);
}

#[tokio::test]
async fn test_delete_tag_keeps_grants() {
    let fixture = TestFixture::new().await;
    let keep = fixture.create_tag("Keep").await;
    let gone = fixture.create_tag("Gone").await;
    let first = fixture
        .create_grant(json!({ "title": "First", "tags": [keep, gone] }))
        .await;
    let second = fixture
        .create_grant(json!({ "title": "Second", "tags": [gone] }))
        .await;

    assert_eq!(fixture.delete(&format!("/api/tags/{}", gone)).await, 200);

    let (_, grants) = fixture.get_json("/api/grants").await;
    assert_eq!(ids(&grants), vec![first, second]);
    for grant in grants.as_array().unwrap() {
        assert!(!tag_ids(grant).contains(&gone));
    }
    assert_eq!(tag_ids(&grants[0]), HashSet::from([keep]));
}

#[tokio::test]
async fn test_list_grants_search_and_filters() {
    let fixture = TestFixture::seeded().await;

    // Seed: STEM Education Initiative (Education Foundation), Mental Health
    // Research Grant, Green Technology Innovation.
    let (status, found) = fixture.get_json("/api/grants?search=Education").await;
    assert_eq!(status, 200);
    let titles: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["STEM Education Initiative"]);

    let (_, found) = fixture.get_json("/api/grants?search=Foundation").await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (_, tags) = fixture.get_json("/api/tags").await;
    let technology = tags
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "Technology")
        .map(|t| t["id"].as_i64().unwrap())
        .unwrap();

    let (_, tagged) = fixture
        .get_json(&format!("/api/grants?tag={}", technology))
        .await;
    assert_eq!(tagged.as_array().unwrap().len(), 2);

    // Close one of the two Technology grants; the intersection shrinks.
    let closed = ids(&tagged)[1];
    fixture
        .put_json(
            &format!("/api/grants/{}", closed),
            json!({ "status": "closed" }),
        )
        .await;

    let (_, active) = fixture
        .get_json(&format!("/api/grants?tag={}&status=active", technology))
        .await;
    assert_eq!(ids(&active), vec![ids(&tagged)[0]]);

    let (_, by_tag) = fixture
        .get_json(&format!("/api/tags/{}/grants", technology))
        .await;
    assert_eq!(ids(&by_tag), ids(&tagged));

    // Empty params are ignored; a tag value that is not an id matches nothing.
    let (status, all) = fixture.get_json("/api/grants?search=&tag=").await;
    assert_eq!(status, 200);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (status, none) = fixture.get_json("/api/grants?tag=abc").await;
    assert_eq!(status, 200);
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_grants_pagination() {
    let fixture = TestFixture::seeded().await;

    let (_, first) = fixture.get_json("/api/grants?limit=1&offset=0").await;
    let (_, second) = fixture.get_json("/api/grants?limit=1&offset=1").await;
    let (_, all) = fixture.get_json("/api/grants").await;

    assert_eq!(ids(&first).len(), 1);
    assert_eq!(ids(&second).len(), 1);
    assert_ne!(ids(&first), ids(&second));
    assert_eq!(ids(&second)[0], ids(&all)[1]);

    let (_, beyond) = fixture.get_json("/api/grants?offset=10").await;
    assert!(beyond.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_grants_by_unknown_tag() {
    let fixture = TestFixture::seeded().await;

    let (status, grants) = fixture.get_json("/api/tags/9999/grants").await;
    assert_eq!(status, 200);
    assert!(grants.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_form_style_payload() {
    let fixture = TestFixture::new().await;

    // Shape submitted by the web client's grant form.
    let grant_id = fixture
        .create_grant(json!({
            "title": "Form Grant",
            "description": "",
            "amount": "2500",
            "deadline": "",
            "status": "active",
            "organization": "",
            "contact_email": "",
            "website": "",
            "tags": []
        }))
        .await;

    let (_, grant) = fixture.get_json(&format!("/api/grants/{}", grant_id)).await;
    assert_eq!(grant["amount"], 2500.0);
    assert_eq!(grant["deadline"], Value::Null);

    let (status, body) = fixture
        .post_json("/api/grants", json!({ "title": "Bad", "deadline": "tomorrow" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_requests() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/grants"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = fixture.get_json("/api/grants/not-a-number").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_cors_preflight_in_process() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("cors.sqlite"), 1)
        .await
        .unwrap();
    let mut app = create_router(AppState {
        repo: Arc::new(Repository::new(pool)),
    });

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/grants")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app.call(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let req = Request::builder()
        .uri("/api/unknown")
        .body(Body::empty())
        .unwrap();
    let resp = app.call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
