//! GoTrue operations: token validation, password grant, sign-out and the
//! elevated admin user lifecycle.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Method;
use serde::Deserialize;

use super::{api_error, Supabase, SupabaseError, SupabaseResult};
use crate::types::{Identity, Session};

/// Auth user as GoTrue returns it. Only the fields the gateway needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    token_type: String,
    user: AuthUser,
}

impl Supabase {
    /// Validates a user access token and resolves the caller's identity.
    pub async fn get_user(&self, token: &str) -> SupabaseResult<Identity> {
        let response = self.gotrue(Method::GET, "user").bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| SupabaseError::Malformed(format!("auth user: {}", e)))?;

        let (issued_at, expiry) = token_claims(token).unwrap_or((None, None));
        Ok(Identity { id: user.id, email: user.email, issued_at, expiry })
    }

    /// Password grant. Returns the signed-in user and the session to hand
    /// back to the client.
    pub async fn sign_in(&self, email: &str, password: &str) -> SupabaseResult<(AuthUser, Session)> {
        let response = self
            .gotrue(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| SupabaseError::Malformed(format!("token grant: {}", e)))?;

        let session = Session {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_in: grant.expires_in,
            expires_at: grant.expires_at,
            token_type: grant.token_type,
        };
        Ok((grant.user, session))
    }

    /// Revokes the session behind `token` when one is supplied; the anon key
    /// is used otherwise so the call still reaches the backend.
    pub async fn sign_out(&self, token: Option<&str>) -> SupabaseResult<()> {
        let bearer = token.unwrap_or(&self.anon_key);
        let response = self.gotrue(Method::POST, "logout").bearer_auth(bearer).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Creates an auth user with the elevated client. Email is marked
    /// confirmed so the account is usable immediately after registration.
    pub async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> SupabaseResult<AuthUser> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": { "name": name },
        });
        let response = self.gotrue_admin(Method::POST, "users").json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response.json().await.map_err(|e| SupabaseError::Malformed(format!("created user: {}", e)))
    }

    /// Deletes an auth user with the elevated client.
    pub async fn admin_delete_user(&self, user_id: &str) -> SupabaseResult<()> {
        let response = self.gotrue_admin(Method::DELETE, &format!("users/{}", user_id)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

/// Best-effort peek at the `iat`/`exp` claims of a JWT. The backend has
/// already validated the token; this only fills identity metadata.
fn token_claims(token: &str) -> Option<(Option<i64>, Option<i64>)> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    Some((claims.get("iat").and_then(|v| v.as_i64()), claims.get("exp").and_then(|v| v.as_i64())))
}
