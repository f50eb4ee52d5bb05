//! The authorization contract.
//!
//! Every protected route declares its requirement at router construction:
//! [`require_auth`] for `authenticated`, [`require_auth`] + [`require_admin`]
//! for `role:admin`, and handlers holding the resource apply
//! [`ensure_owner_or_admin`]. [`optional_auth`] is the one non-failing
//! variant, for routes that adapt to the caller but never reject anonymous
//! requests.
//!
//! Identity and role are re-verified against the backend on every request.
//! There is no local caching, so a role change takes effect on the next
//! request. Failures short-circuit: the handler never runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::supabase::SupabaseError;
use crate::types::{Identity, Profile, Role};

/// Resolved caller: identity from the token, profile from the database.
#[derive(Clone)]
pub struct AuthContext {
    pub identity: Identity,
    pub profile: Profile,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.profile.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::Authentication("Authorization token required".to_string()))
    }
}

/// Never-failing companion extractor for routes behind [`optional_auth`].
pub struct MaybeAuth(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<AuthContext>().cloned()))
    }
}

/// The token part of a well-formed `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Token → identity → profile, or the precise authentication failure.
/// A valid token whose profile row is missing is an inconsistent state and
/// therefore an authentication failure, not a 404.
async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Authentication("Authorization token required".to_string()))?;

    let identity = state.supabase.get_user(token).await.map_err(|err| match err {
        SupabaseError::Api(_) => AppError::Authentication("Invalid token".to_string()),
        other => other.into(),
    })?;

    let profile = state
        .supabase
        .get_profile(&identity.id)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid token".to_string()))?;

    Ok(AuthContext { identity, profile })
}

/// Requirement `authenticated`: rejects with 401 before the handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = resolve(&state, req.headers()).await?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Requirement `role:admin`. Layered inside [`require_auth`], so a missing
/// context means the layering is wrong and is treated as unauthenticated.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<AuthContext>() {
        Some(ctx) if ctx.is_admin() => Ok(next.run(req).await),
        Some(_) => Err(AppError::Authorization("Admin access required".to_string())),
        None => Err(AppError::Authentication("Authorization token required".to_string())),
    }
}

/// Non-failing variant: attaches the caller when the token resolves and
/// stays silent otherwise.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match resolve(&state, req.headers()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
        }
        Err(err) => {
            tracing::debug!("optional auth not resolved: {}", err);
        }
    }
    next.run(req).await
}

/// Requirement `owner-or-admin`, applied by handlers that have fetched the
/// resource.
pub fn ensure_owner_or_admin(ctx: &AuthContext, created_by: &str) -> Result<(), AppError> {
    if ctx.is_admin() || ctx.profile.id == created_by {
        Ok(())
    } else {
        Err(AppError::Authorization("Insufficient permissions".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ctx(id: &str, role: Role) -> AuthContext {
        AuthContext {
            identity: Identity {
                id: id.to_string(),
                email: None,
                issued_at: None,
                expiry: None,
            },
            profile: Profile {
                id: id.to_string(),
                name: "Test".to_string(),
                email: "t@example.com".to_string(),
                role,
                created_at: "2024-01-01T00:00:00Z".to_string(),
                updated_at: "2024-01-01T00:00:00Z".to_string(),
            },
        }
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-123"));
        assert_eq!(bearer_token(&headers), Some("tok-123"));
    }

    #[test]
    fn owner_or_admin_rule() {
        let owner = ctx("u1", Role::User);
        assert!(ensure_owner_or_admin(&owner, "u1").is_ok());
        assert!(matches!(
            ensure_owner_or_admin(&owner, "u2"),
            Err(AppError::Authorization(_))
        ));

        let admin = ctx("a1", Role::Admin);
        assert!(ensure_owner_or_admin(&admin, "u2").is_ok());
    }
}
