//! PostgREST row operations on `profiles` and `archive_items`.
//!
//! Single-row reads fetch a window of one and take the first element, so an
//! absent row is `Ok(None)` instead of a backend error. Writes ask for
//! `return=representation` and surface the affected row.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{api_error, content_range_total, Supabase, SupabaseError, SupabaseResult};
use crate::types::{ArchiveItem, FileMetadata, Page, Profile, Role};

const PROFILES: &str = "profiles";
const ARCHIVES: &str = "archive_items";

/// Insert payload for a profile row, created during registration.
#[derive(Debug, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Patch payload for a profile row. Only the owner-editable fields; role
/// changes go through [`Supabase::update_user_role`].
#[derive(Debug, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// Insert payload for an archive item. `created_by` is always the caller.
#[derive(Debug, Serialize)]
pub struct NewArchive {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<FileMetadata>,
    pub created_by: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ArchiveUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<FileMetadata>,
}

impl ArchiveUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.file_url.is_none()
            && self.file_metadata.is_none()
    }
}

impl Supabase {
    // ---- profiles ----

    pub async fn get_profile(&self, id: &str) -> SupabaseResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .fetch_rows(PROFILES, &[("select", "*"), ("id", &eq(id)), ("limit", "1")])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert_profile(&self, profile: &NewProfile) -> SupabaseResult<Profile> {
        let response = self
            .rest(Method::POST, PROFILES)
            .header("Prefer", "return=representation")
            .json(profile)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        first_row(response, "inserted profile").await
    }

    pub async fn update_profile(
        &self,
        id: &str,
        patch: &ProfileUpdate,
    ) -> SupabaseResult<Option<Profile>> {
        self.patch_row(PROFILES, id, patch).await
    }

    pub async fn update_user_role(&self, id: &str, role: Role) -> SupabaseResult<Option<Profile>> {
        self.patch_row(PROFILES, id, &serde_json::json!({ "role": role })).await
    }

    pub async fn list_profiles(&self, page: u64, limit: u64) -> SupabaseResult<Page<Profile>> {
        self.fetch_page(PROFILES, page, limit).await
    }

    pub async fn delete_profile(&self, id: &str) -> SupabaseResult<()> {
        self.delete_rows(PROFILES, id).await
    }

    pub async fn count_profiles(&self) -> SupabaseResult<u64> {
        self.count_rows(PROFILES).await
    }

    // ---- archive items ----

    /// All items owned by `user_id`, newest first.
    pub async fn get_archives(&self, user_id: &str) -> SupabaseResult<Vec<ArchiveItem>> {
        self.fetch_rows(
            ARCHIVES,
            &[("select", "*"), ("created_by", &eq(user_id)), ("order", "created_at.desc")],
        )
        .await
    }

    pub async fn get_archive(&self, id: &str) -> SupabaseResult<Option<ArchiveItem>> {
        let rows: Vec<ArchiveItem> = self
            .fetch_rows(ARCHIVES, &[("select", "*"), ("id", &eq(id)), ("limit", "1")])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert_archive(&self, archive: &NewArchive) -> SupabaseResult<ArchiveItem> {
        let response = self
            .rest(Method::POST, ARCHIVES)
            .header("Prefer", "return=representation")
            .json(archive)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        first_row(response, "inserted archive").await
    }

    pub async fn update_archive(
        &self,
        id: &str,
        patch: &ArchiveUpdate,
    ) -> SupabaseResult<Option<ArchiveItem>> {
        self.patch_row(ARCHIVES, id, patch).await
    }

    pub async fn delete_archive(&self, id: &str) -> SupabaseResult<()> {
        self.delete_rows(ARCHIVES, id).await
    }

    /// Case-insensitive substring match on title or description, scoped to
    /// the owner. `term` must already be sanitized (see the search route).
    pub async fn search_archives(
        &self,
        user_id: &str,
        term: &str,
    ) -> SupabaseResult<Vec<ArchiveItem>> {
        let pattern = format!("(title.ilike.*{term}*,description.ilike.*{term}*)");
        self.fetch_rows(
            ARCHIVES,
            &[
                ("select", "*"),
                ("created_by", &eq(user_id)),
                ("or", &pattern),
                ("order", "created_at.desc"),
            ],
        )
        .await
    }

    pub async fn list_archives(&self, page: u64, limit: u64) -> SupabaseResult<Page<ArchiveItem>> {
        self.fetch_page(ARCHIVES, page, limit).await
    }

    pub async fn count_archives(&self) -> SupabaseResult<u64> {
        self.count_rows(ARCHIVES).await
    }

    // ---- shared plumbing ----

    async fn fetch_rows<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> SupabaseResult<Vec<T>> {
        let response = self.rest(Method::GET, table).query(query).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response.json().await.map_err(|e| SupabaseError::Malformed(format!("{}: {}", table, e)))
    }

    /// One page of rows, newest first, with the exact total from the
    /// `Content-Range` header.
    async fn fetch_page<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        page: u64,
        limit: u64,
    ) -> SupabaseResult<Page<T>> {
        let offset = (page - 1) * limit;
        let limit_param = limit.to_string();
        let offset_param = offset.to_string();
        let response = self
            .rest(Method::GET, table)
            .header("Prefer", "count=exact")
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
                ("limit", limit_param.as_str()),
                ("offset", offset_param.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let total = content_range_total(response.headers())?;
        let data: Vec<T> =
            response.json().await.map_err(|e| SupabaseError::Malformed(format!("{}: {}", table, e)))?;
        Ok(Page::new(data, page, limit, total))
    }

    async fn patch_row<T, P>(&self, table: &str, id: &str, patch: &P) -> SupabaseResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
        P: Serialize,
    {
        let response = self
            .rest(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&[("id", &eq(id))])
            .json(patch)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let rows: Vec<T> =
            response.json().await.map_err(|e| SupabaseError::Malformed(format!("{}: {}", table, e)))?;
        Ok(rows.into_iter().next())
    }

    async fn delete_rows(&self, table: &str, id: &str) -> SupabaseResult<()> {
        let response =
            self.rest(Method::DELETE, table).query(&[("id", &eq(id))]).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Exact row count without fetching rows (HEAD + `count=exact`).
    async fn count_rows(&self, table: &str) -> SupabaseResult<u64> {
        let response = self
            .rest(Method::HEAD, table)
            .header("Prefer", "count=exact")
            .query(&[("select", "id")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        content_range_total(response.headers())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

async fn first_row<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    what: &str,
) -> SupabaseResult<T> {
    let rows: Vec<T> =
        response.json().await.map_err(|e| SupabaseError::Malformed(format!("{}: {}", what, e)))?;
    rows.into_iter()
        .next()
        .ok_or_else(|| SupabaseError::Malformed(format!("{}: empty representation", what)))
}
