//! Admin-only operations: system statistics, global listings, role
//! management and account deletion. The `role:admin` requirement is
//! enforced by the router layers, not here.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::error::{AppError, AppResult, Json, OptionExt};
use crate::state::AppState;
use crate::types::{PageQuery, SystemStats, UpdateRoleRequest};

use super::archives::delete_blob_best_effort;

/// GET /api/admin/stats
///
/// The two counts are independent read-only lookups and run concurrently.
pub async fn stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let (total_users, total_archives) =
        tokio::try_join!(state.supabase.count_profiles(), state.supabase.count_archives())?;

    Ok(Json(SystemStats {
        total_users,
        total_archives,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, limit) = query.normalized();
    let users = state.supabase.list_profiles(page, limit).await?;
    Ok(Json(users))
}

/// GET /api/admin/archives
pub async fn list_archives(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, limit) = query.normalized();
    let archives = state.supabase.list_archives(page, limit).await?;
    Ok(Json(archives))
}

/// PUT /api/admin/users/{id}/role
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    let role = crate::types::Role::parse(&body.role).ok_or_else(|| {
        AppError::Validation("Invalid role. Must be \"user\" or \"admin\"".to_string())
    })?;

    let profile = state.supabase.update_user_role(&id, role).await?.ok_or_not_found("User")?;
    Ok(Json(profile))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.supabase.delete_profile(&id).await?;
    state.supabase.admin_delete_user(&id).await?;
    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}

/// DELETE /api/admin/archives/{id} - any owner
pub async fn delete_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let existing = state.supabase.get_archive(&id).await?.ok_or_not_found("Archive")?;

    delete_blob_best_effort(&state, existing.file_url.as_deref()).await;
    state.supabase.delete_archive(&id).await?;

    Ok(Json(serde_json::json!({ "message": "Archive deleted successfully" })))
}
