use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt; // for .collect()
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{AppConfig, ServerConfig, SupabaseConfig};
use crate::routes;
use crate::state::AppState;
use crate::supabase::Supabase;

fn test_app(backend_url: &str) -> Router {
    let config = AppConfig {
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 8000 },
        supabase: SupabaseConfig {
            url: backend_url.to_string(),
            anon_key: "anon-key".to_string(),
            service_key: "service-key".to_string(),
            bucket: "archive-files".to_string(),
        },
    };
    let supabase = Supabase::new(&config.supabase);
    routes::router(AppState::new(supabase, config))
}

fn profile_json(id: &str, role: &str) -> Value {
    json!({
        "id": id,
        "name": format!("User {}", id),
        "email": format!("{}@example.com", id),
        "role": role,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
    })
}

fn archive_json(id: &str, created_by: &str, title: &str, file_url: Option<&str>) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "category": "docs",
        "tags": ["a"],
        "file_url": file_url,
        "file_metadata": null,
        "created_by": created_by,
        "created_at": "2024-01-02T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z",
    })
}

/// Mocks GoTrue token validation plus the profile lookup for `user_id`.
async fn mock_caller(server: &MockServer, user_id: &str, role: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "id": user_id,
                "email": format!("{}@example.com", user_id),
            })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json(user_id, role)])))
        .mount(server)
        .await;
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn liveness_endpoint_answers_without_backend() {
    let app = test_app("http://127.0.0.1:9");

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Archive API is running!");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn route_directory_is_anonymous() {
    // Backend unreachable: optional auth must stay silent
    let app = test_app("http://127.0.0.1:9");

    let response = app.oneshot(get("/api")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["routes"].is_array());
    assert!(json.get("caller").is_none());
}

#[tokio::test]
async fn route_directory_reports_caller_role() {
    let server = MockServer::start().await;
    mock_caller(&server, "a1", "admin").await;
    let app = test_app(&server.uri());

    let response = app.oneshot(request("GET", "/api", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["caller"]["role"], "admin");
}

#[tokio::test]
async fn unmatched_route_is_404_error_shape() {
    let app = test_app("http://127.0.0.1:9");

    let response = app.oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn protected_route_without_token_is_401_and_no_backend_call() {
    // Any backend call would panic: no mocks are mounted
    let server = MockServer::start().await;
    let app = test_app(&server.uri());

    let response = app.clone().oneshot(get("/api/archives")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Authorization token required");

    // Malformed scheme counts as missing
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/archives")
                .header("authorization", "Token abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_token_is_401() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response =
        app.oneshot(request("GET", "/api/auth/user", Some("expired"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid token");
}

#[tokio::test]
async fn non_admin_on_admin_route_is_403() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    let app = test_app(&server.uri());

    let response = app.oneshot(request("GET", "/api/admin/stats", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Admin access required");
}

#[tokio::test]
async fn foreign_archive_update_is_403_and_never_mutates() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("id", "eq.a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([archive_json("a1", "u2", "Foreign", None)])),
        )
        .mount(&server)
        .await;
    // The mutation must never reach the backend
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/archive_items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request("PUT", "/api/archives/a1", Some("tok"), Some(json!({ "title": "mine" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Insufficient permissions");
}

#[tokio::test]
async fn foreign_archive_delete_is_403() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("id", "eq.a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([archive_json("a1", "u2", "Foreign", None)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/archive_items"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response =
        app.oneshot(request("DELETE", "/api/archives/a1", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_may_read_foreign_archive() {
    let server = MockServer::start().await;
    mock_caller(&server, "a1", "admin").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("id", "eq.a7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([archive_json("a7", "u2", "Foreign", None)])),
        )
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app.oneshot(request("GET", "/api/archives/a7", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["created_by"], "u2");
}

#[tokio::test]
async fn register_creates_profile_with_user_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .and(header("apikey", "service-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "u9", "email": "a@x.com" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([profile_json("u9", "user")])))
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "A", "email": "a@x.com", "password": "p" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["role"], "user");
    assert_eq!(json["id"], "u9");
}

#[tokio::test]
async fn register_requires_all_fields() {
    let app = test_app("http://127.0.0.1:9");

    let response = app
        .oneshot(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "A", "email": "a@x.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Name, email, and password are required");
}

#[tokio::test]
async fn login_passes_backend_rejection_through_as_401() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error_description": "Invalid login credentials" })),
        )
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid login credentials");
}

#[tokio::test]
async fn login_returns_profile_and_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-abc",
            "refresh_token": "ref-abc",
            "expires_in": 3600,
            "expires_at": 1700003600,
            "token_type": "bearer",
            "user": { "id": "u1", "email": "u1@example.com" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json("u1", "user")])))
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "u1@example.com", "password": "pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"]["id"], "u1");
    assert_eq!(json["session"]["access_token"], "jwt-abc");
}

#[tokio::test]
async fn archive_delete_survives_failing_blob_delete() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;

    let file_url =
        format!("{}/storage/v1/object/public/archive-files/u1/123-f.txt", server.uri());
    Mock::given(method("GET"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("id", "eq.a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([archive_json("a1", "u1", "Mine", Some(&file_url))])),
        )
        .mount(&server)
        .await;
    // Storage is down: blob removal fails
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/archive-files/u1/123-f.txt"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "storage down" })))
        .expect(1)
        .mount(&server)
        .await;
    // The record deletion must still happen
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("id", "eq.a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response =
        app.oneshot(request("DELETE", "/api/archives/a1", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Archive deleted successfully");
}

#[tokio::test]
async fn user_listing_paginates() {
    let server = MockServer::start().await;
    mock_caller(&server, "a1", "admin").await;

    let rows: Vec<Value> = (10..20).map(|i| profile_json(&format!("u{}", i), "user")).collect();
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("offset", "10"))
        .and(query_param("limit", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "10-19/25")
                .set_body_json(Value::Array(rows)),
        )
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request("GET", "/api/users?page=2&limit=10", Some("tok"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 10);
    assert_eq!(json["pagination"]["page"], 2);
    assert_eq!(json["pagination"]["limit"], 10);
    assert_eq!(json["pagination"]["total"], 25);
    assert_eq!(json["pagination"]["totalPages"], 3);
}

#[tokio::test]
async fn search_is_scoped_to_caller_and_case_insensitive_pattern() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("created_by", "eq.u1"))
        .and(query_param("or", "(title.ilike.*invoice*,description.ilike.*invoice*)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([archive_json("a2", "u1", "Invoice 2024", None)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request("GET", "/api/archives/search?q=invoice", Some("tok"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["title"], "Invoice 2024");
}

#[tokio::test]
async fn search_without_query_is_400() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    let app = test_app(&server.uri());

    let response =
        app.oneshot(request("GET", "/api/archives/search", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_stats_joins_both_counts() {
    let server = MockServer::start().await;
    mock_caller(&server, "a1", "admin").await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "*/25"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/archive_items"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "*/7"))
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app.oneshot(request("GET", "/api/admin/stats", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["totalUsers"], 25);
    assert_eq!(json["totalArchives"], 7);
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn admin_role_update_validates_role_value() {
    let server = MockServer::start().await;
    mock_caller(&server, "a1", "admin").await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request(
            "PUT",
            "/api/admin/users/u5/role",
            Some("tok"),
            Some(json!({ "role": "superuser" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid role. Must be \"user\" or \"admin\"");
}

#[tokio::test]
async fn admin_role_update_patches_profile() {
    let server = MockServer::start().await;
    mock_caller(&server, "a1", "admin").await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json("u5", "admin")])))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request(
            "PUT",
            "/api/admin/users/u5/role",
            Some("tok"),
            Some(json!({ "role": "admin" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["role"], "admin");
}

#[tokio::test]
async fn missing_archive_is_404() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/archive_items"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response =
        app.oneshot(request("GET", "/api/archives/missing", Some("tok"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Archive not found");
}

#[tokio::test]
async fn create_archive_stamps_caller_as_owner() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/archive_items"))
        .and(header("Prefer", "return=representation"))
        .and(wiremock::matchers::body_partial_json(json!({ "created_by": "u1" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([archive_json("a3", "u1", "Fresh", None)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request(
            "POST",
            "/api/archives",
            Some("tok"),
            Some(json!({ "title": "Fresh", "category": "docs" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["created_by"], "u1");
}

#[tokio::test]
async fn profile_update_rejects_empty_patch() {
    let server = MockServer::start().await;
    mock_caller(&server, "u1", "user").await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(request("PUT", "/api/users/profile", Some("tok"), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
