//! Registration, login, logout and current-user lookup.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::error::{AppError, AppResult, Json};
use crate::middleware::auth::{bearer_token, AuthContext};
use crate::state::AppState;
use crate::supabase::db::NewProfile;
use crate::supabase::SupabaseError;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, Role};

/// POST /api/auth/register
///
/// Creates the auth user with the elevated client, then the matching
/// profile row with role `user`.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    if body.name.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("Name, email, and password are required".to_string()));
    }

    let user = state.supabase.admin_create_user(&body.email, &body.password, &body.name).await?;
    let profile = state
        .supabase
        .insert_profile(&NewProfile {
            id: user.id,
            name: body.name,
            email: body.email,
            role: Role::User,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /api/auth/login
///
/// Password grant. A backend rejection (wrong credentials, unconfirmed
/// account) comes back as 401 with the backend's message.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".to_string()));
    }

    let (user, session) = state.supabase.sign_in(&body.email, &body.password).await.map_err(
        |err| match err {
            SupabaseError::Api(msg) => AppError::Authentication(msg),
            other => other.into(),
        },
    )?;

    let profile = state
        .supabase
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid token".to_string()))?;

    Ok(Json(AuthResponse { user: profile, session }))
}

/// POST /api/auth/logout
///
/// The token is implied by the backend session; when the caller sends one
/// it is forwarded so the session is actually revoked.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    state.supabase.sign_out(bearer_token(&headers)).await?;
    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}

/// GET /api/auth/user (authenticated)
pub async fn current_user(ctx: AuthContext) -> impl IntoResponse {
    Json(ctx.profile)
}
