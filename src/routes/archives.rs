//! Archive item CRUD, caller-scoped search and file upload.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::error::{AppError, AppResult, Json, OptionExt};
use crate::middleware::auth::{ensure_owner_or_admin, AuthContext};
use crate::state::AppState;
use crate::supabase::db::{ArchiveUpdate, NewArchive};
use crate::supabase::storage;
use crate::types::{
    CreateArchiveRequest, FileMetadata, SearchQuery, UpdateArchiveRequest, UploadResponse,
};

/// GET /api/archives (authenticated) - caller's items, newest first
pub async fn list(State(state): State<AppState>, ctx: AuthContext) -> AppResult<impl IntoResponse> {
    let archives = state.supabase.get_archives(&ctx.profile.id).await?;
    Ok(Json(archives))
}

/// POST /api/archives (authenticated)
pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateArchiveRequest>,
) -> AppResult<impl IntoResponse> {
    if body.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let archive = state
        .supabase
        .insert_archive(&NewArchive {
            title: body.title,
            description: body.description,
            category: body.category,
            tags: body.tags,
            file_url: body.file_url,
            file_metadata: body.file_metadata,
            created_by: ctx.profile.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(archive)))
}

/// GET /api/archives/{id} (owner-or-admin)
pub async fn get_one(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let archive = state.supabase.get_archive(&id).await?.ok_or_not_found("Archive")?;
    ensure_owner_or_admin(&ctx, &archive.created_by)?;
    Ok(Json(archive))
}

/// PUT /api/archives/{id} (owner-or-admin)
pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(body): Json<UpdateArchiveRequest>,
) -> AppResult<impl IntoResponse> {
    let existing = state.supabase.get_archive(&id).await?.ok_or_not_found("Archive")?;
    ensure_owner_or_admin(&ctx, &existing.created_by)?;

    let patch = ArchiveUpdate {
        title: body.title,
        description: body.description,
        category: body.category,
        tags: body.tags,
        file_url: body.file_url,
        file_metadata: body.file_metadata,
    };
    if patch.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let archive = state.supabase.update_archive(&id, &patch).await?.ok_or_not_found("Archive")?;
    Ok(Json(archive))
}

/// DELETE /api/archives/{id} (owner-or-admin)
///
/// Blob removal is best-effort: a failed storage call is logged and the
/// record deletion still proceeds.
pub async fn delete_one(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let existing = state.supabase.get_archive(&id).await?.ok_or_not_found("Archive")?;
    ensure_owner_or_admin(&ctx, &existing.created_by)?;

    delete_blob_best_effort(&state, existing.file_url.as_deref()).await;
    state.supabase.delete_archive(&id).await?;

    Ok(Json(serde_json::json!({ "message": "Archive deleted successfully" })))
}

/// GET /api/archives/search?q= (authenticated)
pub async fn search(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let term = sanitize_search_term(&query.q)?;
    let archives = state.supabase.search_archives(&ctx.profile.id, &term).await?;
    Ok(Json(archives))
}

/// POST /api/archives/upload (authenticated)
///
/// Multipart with a single `file` field. The object key is derived from the
/// caller, so uploads never collide across users.
pub async fn upload(
    State(state): State<AppState>,
    ctx: AuthContext,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type =
            field.content_type().unwrap_or("application/octet-stream").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?;
        if data.is_empty() {
            return Err(AppError::Validation("No file provided".to_string()));
        }

        let key = storage::object_key(&ctx.profile.id, &name);
        state.supabase.upload_object(&key, data.to_vec(), &content_type).await?;

        return Ok(Json(UploadResponse {
            url: state.supabase.public_object_url(&key),
            metadata: FileMetadata { name, size: data.len() as u64, content_type },
        }));
    }

    Err(AppError::Validation("No file provided".to_string()))
}

/// Removes the blob behind `file_url`, tolerating every failure.
pub(super) async fn delete_blob_best_effort(state: &AppState, file_url: Option<&str>) {
    let Some(file_url) = file_url else { return };
    match state.supabase.object_path_from_url(file_url) {
        Some(path) => {
            if let Err(err) = state.supabase.remove_object(&path).await {
                tracing::warn!("Error deleting file {}: {}", path, err);
            }
        }
        None => tracing::warn!("Cannot derive object path from file_url {}", file_url),
    }
}

/// Keeps the search term from escaping the backend's filter grammar.
/// PostgREST treats `,`, `(`, `)` and `*` specially inside `or=` filters.
fn sanitize_search_term(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Search query cannot be empty".to_string()));
    }
    if trimmed.chars().count() > 200 {
        return Err(AppError::Validation("Search query too long".to_string()));
    }
    let sanitized: String = trimmed
        .chars()
        .filter(|ch| !ch.is_control() && !matches!(ch, ',' | '(' | ')' | '*' | '\\' | '"' | '\''))
        .collect();
    if sanitized.trim().is_empty() {
        return Err(AppError::Validation(
            "Search query contains only special characters".to_string(),
        ));
    }
    Ok(sanitized)
}
