//! Thin client adapter over the Supabase backend's HTTP surface.
//!
//! Three concerns, one shared `reqwest::Client`:
//! - `auth`: GoTrue token validation, password sign-in/out, admin user
//!   lifecycle (the only elevated access in the system),
//! - `db`: PostgREST row operations on `profiles` and `archive_items`,
//! - `storage`: object upload/removal in the archive bucket.
//!
//! The adapter is a direct pass-through: no retries, no batching, no
//! caching. Reliability and consistency are the backend's job.

use reqwest::{Client, Method, RequestBuilder};
use thiserror::Error;

use crate::config::SupabaseConfig;

pub mod auth;
pub mod db;
pub mod storage;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success response from the backend; displays as the
    /// backend-reported message so it can be passed through verbatim.
    #[error("{0}")]
    Api(String),

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

pub type SupabaseResult<T> = Result<T, SupabaseError>;

/// Handle to the Supabase project, shared read-only across all requests.
pub struct Supabase {
    http: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
    bucket: String,
}

impl Supabase {
    pub fn new(cfg: &SupabaseConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: cfg.url.trim_end_matches('/').to_string(),
            anon_key: cfg.anon_key.clone(),
            service_key: cfg.service_key.clone(),
            bucket: cfg.bucket.clone(),
        }
    }

    /// Request against PostgREST with standard (anon) privileges.
    fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.http.request(method, url).header("apikey", &self.anon_key).bearer_auth(&self.anon_key)
    }

    /// Request against GoTrue with standard (anon) privileges.
    fn gotrue(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/auth/v1/{}", self.base_url, path);
        self.http.request(method, url).header("apikey", &self.anon_key)
    }

    /// Request against GoTrue with elevated (service-role) privileges.
    /// Used only for account lifecycle administration.
    fn gotrue_admin(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/auth/v1/admin/{}", self.base_url, path);
        self.http
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn storage_object(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        self.http.request(method, url).header("apikey", &self.anon_key).bearer_auth(&self.anon_key)
    }
}

/// Extracts the backend's own error message from a non-success response.
/// GoTrue, PostgREST and Storage disagree on the field name.
async fn api_error(response: reqwest::Response) -> SupabaseError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| body.get(key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| if text.is_empty() { format!("HTTP {}", status) } else { text });
    SupabaseError::Api(message)
}

/// Total row count from a PostgREST `Content-Range` header, e.g. `0-9/25`
/// or `*/25`.
fn content_range_total(headers: &reqwest::header::HeaderMap) -> SupabaseResult<u64> {
    headers
        .get("content-range")
        .and_then(|value| value.to_str().ok())
        .and_then(|range| range.rsplit('/').next())
        .and_then(|total| total.parse::<u64>().ok())
        .ok_or_else(|| SupabaseError::Malformed("missing Content-Range total".to_string()))
}
