//! Storage operations for the archive bucket: upload, public URL
//! derivation and best-effort removal.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use super::{api_error, Supabase, SupabaseResult};

impl Supabase {
    /// Uploads a blob under `object_path` in the archive bucket.
    pub async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SupabaseResult<()> {
        let response = self
            .storage_object(Method::POST, object_path)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Public download URL for an object in the archive bucket.
    pub fn public_object_url(&self, object_path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, object_path)
    }

    /// Removes an object from the archive bucket.
    pub async fn remove_object(&self, object_path: &str) -> SupabaseResult<()> {
        let response = self.storage_object(Method::DELETE, object_path).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Recovers the bucket-relative object path from a public URL produced
    /// by [`Self::public_object_url`]. `None` for foreign or malformed URLs.
    pub fn object_path_from_url(&self, file_url: &str) -> Option<String> {
        let url = url::Url::parse(file_url).ok()?;
        let mut segments = url.path_segments()?;
        // .../storage/v1/object/public/<bucket>/<owner>/<file>
        segments.by_ref().find(|s| *s == "public")?;
        let bucket = segments.next()?;
        if bucket != self.bucket {
            return None;
        }
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return None;
        }
        Some(rest.join("/"))
    }
}

/// Object key for a fresh upload: `{owner_id}/{timestamp_ms}-{name}`, with
/// the original name reduced to a safe character set.
pub fn object_key(owner_id: &str, original_name: &str) -> String {
    let safe_name: String = original_name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!("{}/{}-{}", owner_id, chrono::Utc::now().timestamp_millis(), safe_name)
}
