use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::middleware::MaybeAuth;

// Liveness endpoint - no backend round trip
pub async fn root() -> impl IntoResponse {
    let body = serde_json::json!({
        "message": "Archive API is running!",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

/// Route directory. Anonymous callers get the plain listing; authenticated
/// callers additionally see the role their token currently resolves to.
pub async fn api_index(MaybeAuth(caller): MaybeAuth) -> impl IntoResponse {
    let routes = serde_json::json!([
        { "method": "POST",   "path": "/api/auth/register",          "description": "Register a new user",        "auth": false, "admin": false },
        { "method": "POST",   "path": "/api/auth/login",             "description": "User login",                 "auth": false, "admin": false },
        { "method": "POST",   "path": "/api/auth/logout",            "description": "User logout",                "auth": false, "admin": false },
        { "method": "GET",    "path": "/api/auth/user",              "description": "Get current user",           "auth": true,  "admin": false },
        { "method": "GET",    "path": "/api/users/profile",          "description": "Get user profile",           "auth": true,  "admin": false },
        { "method": "PUT",    "path": "/api/users/profile",          "description": "Update user profile",        "auth": true,  "admin": false },
        { "method": "GET",    "path": "/api/users",                  "description": "Get all users",              "auth": true,  "admin": true },
        { "method": "GET",    "path": "/api/users/{id}",             "description": "Get user by ID",             "auth": true,  "admin": true },
        { "method": "DELETE", "path": "/api/users/{id}",             "description": "Delete user",                "auth": true,  "admin": true },
        { "method": "GET",    "path": "/api/archives",               "description": "Get user archives",          "auth": true,  "admin": false },
        { "method": "GET",    "path": "/api/archives/search",        "description": "Search user archives",       "auth": true,  "admin": false },
        { "method": "POST",   "path": "/api/archives",               "description": "Create new archive",         "auth": true,  "admin": false },
        { "method": "POST",   "path": "/api/archives/upload",        "description": "Upload archive file",        "auth": true,  "admin": false },
        { "method": "GET",    "path": "/api/archives/{id}",          "description": "Get archive by ID",          "auth": true,  "admin": false },
        { "method": "PUT",    "path": "/api/archives/{id}",          "description": "Update archive",             "auth": true,  "admin": false },
        { "method": "DELETE", "path": "/api/archives/{id}",          "description": "Delete archive",             "auth": true,  "admin": false },
        { "method": "GET",    "path": "/api/admin/stats",            "description": "Get system statistics",      "auth": true,  "admin": true },
        { "method": "GET",    "path": "/api/admin/users",            "description": "List all users (paginated)", "auth": true,  "admin": true },
        { "method": "GET",    "path": "/api/admin/archives",         "description": "List all archives (paginated)", "auth": true, "admin": true },
        { "method": "PUT",    "path": "/api/admin/users/{id}/role",  "description": "Update user role",           "auth": true,  "admin": true },
        { "method": "DELETE", "path": "/api/admin/users/{id}",       "description": "Delete user",                "auth": true,  "admin": true },
        { "method": "DELETE", "path": "/api/admin/archives/{id}",    "description": "Delete any archive",         "auth": true,  "admin": true },
    ]);

    let mut body = serde_json::json!({
        "title": "Archive Management API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API for managing archives with Supabase backend",
        "routes": routes,
    });
    if let Some(ctx) = caller {
        body["caller"] = serde_json::json!({ "id": ctx.profile.id, "role": ctx.profile.role });
    }

    (StatusCode::OK, Json(body))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Not found" })))
}
