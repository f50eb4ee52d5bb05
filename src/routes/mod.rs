//! HTTP route handlers and router assembly.
//!
//! Each route's authorization requirement is declared exactly once, here,
//! as a router layer: `require_auth` for authenticated routes, plus
//! `require_admin` for admin routes. Handlers that need `owner-or-admin`
//! apply it themselves after fetching the resource.

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::Router;

use crate::middleware::auth::{optional_auth, require_admin, require_auth};
use crate::state::AppState;

pub mod admin;
pub mod archives;
pub mod auth;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let authenticated = from_fn_with_state(state.clone(), require_auth);
    let admin_only = from_fn(require_admin);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(
            Router::new()
                .route("/user", get(auth::current_user))
                .route_layer(authenticated.clone()),
        );

    let user_routes = Router::new()
        .route("/profile", get(users::get_profile).put(users::update_profile))
        .route_layer(authenticated.clone())
        .merge(
            Router::new()
                .route("/", get(users::list_users))
                .route("/{id}", get(users::get_user).delete(users::delete_user))
                .route_layer(admin_only.clone())
                .route_layer(authenticated.clone()),
        );

    let archive_routes = Router::new()
        .route("/", get(archives::list).post(archives::create))
        .route("/search", get(archives::search))
        .route("/upload", post(archives::upload))
        .route("/{id}", get(archives::get_one).put(archives::update).delete(archives::delete_one))
        .route_layer(authenticated.clone());

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::list_users))
        .route("/archives", get(admin::list_archives))
        .route("/users/{id}/role", put(admin::update_role))
        .route("/users/{id}", axum::routing::delete(admin::delete_user))
        .route("/archives/{id}", axum::routing::delete(admin::delete_archive))
        .route_layer(admin_only)
        .route_layer(authenticated);

    Router::new()
        .route("/", get(health::root))
        .route(
            "/api",
            get(health::api_index).layer(from_fn_with_state(state.clone(), optional_auth)),
        )
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/archives", archive_routes)
        .nest("/api/admin", admin_routes)
        .fallback(health::not_found)
        .with_state(state)
}
