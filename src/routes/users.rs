//! Self-service profile routes plus the admin-only user management.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::error::{AppError, AppResult, Json, OptionExt};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;
use crate::supabase::db::ProfileUpdate;
use crate::types::PageQuery;

/// GET /api/users/profile (authenticated)
///
/// The profile was re-read from the backend during authorization; no second
/// lookup needed.
pub async fn get_profile(ctx: AuthContext) -> impl IntoResponse {
    Json(ctx.profile)
}

/// PUT /api/users/profile (authenticated)
///
/// Owner-editable fields only; the role is deliberately not updatable here.
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<crate::types::UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let patch = ProfileUpdate { name: body.name, email: body.email };
    if patch.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let profile =
        state.supabase.update_profile(&ctx.profile.id, &patch).await?.ok_or_not_found("User")?;
    Ok(Json(profile))
}

/// GET /api/users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, limit) = query.normalized();
    let users = state.supabase.list_profiles(page, limit).await?;
    Ok(Json(users))
}

/// GET /api/users/{id} (admin)
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let profile = state.supabase.get_profile(&id).await?.ok_or_not_found("User")?;
    Ok(Json(profile))
}

/// DELETE /api/users/{id} (admin)
///
/// Profile row first, then the auth account via the elevated client.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.supabase.delete_profile(&id).await?;
    state.supabase.admin_delete_user(&id).await?;
    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}
