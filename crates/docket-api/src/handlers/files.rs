//! Folder tree and file objects for the authenticated owner.
//!
//! Metadata lives in Postgres; bytes go through the configured
//! [`StorageBackend`](docket_db::StorageBackend) under
//! `"{user_id}/{path}/{leaf}"`. A file's key is fixed at upload time, so
//! renaming a folder only rewrites paths in the database.

use std::collections::BTreeSet;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use docket_core::{
    defaults, join_path, object_key, CreateFileRequest, Error, Folder, StoredFile,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::upload::{check_upload, detect_content_type, read_form, sanitize_file_name};
use crate::AppState;

const MSG_FILE_NOT_FOUND: &str = "File tidak ditemukan";
const MSG_FOLDER_NOT_FOUND: &str = "Folder tidak ditemukan";
const MSG_UNSUPPORTED_TYPE: &str =
    "Format file tidak didukung. Hanya gambar, PDF, dan dokumen Word yang diizinkan.";

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderBody {
    pub name: Option<String>,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    #[serde(rename = "newName")]
    pub new_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub preview_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub file_type: String,
    pub file_size: i64,
}

impl From<StoredFile> for FileEntry {
    fn from(file: StoredFile) -> Self {
        let preview_url = file
            .file_type
            .starts_with("image/")
            .then(|| file.file_url.clone());
        Self {
            id: file.id,
            name: file.original_name,
            url: file.file_url,
            preview_url,
            created_at: file.created_at,
            kind: "file",
            file_type: file.file_type,
            file_size: file.file_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FolderEntry {
    pub id: i64,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub created_at: DateTime<Utc>,
}

impl From<Folder> for FolderEntry {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            path: folder.path,
            kind: "folder",
            created_at: folder.created_at,
        }
    }
}

/// Normalize a client path: no leading/trailing slashes, no empty or dot
/// segments.
pub fn normalize_path(raw: &str) -> Result<String, ApiError> {
    let mut segments = Vec::new();
    for segment in raw.split('/').map(str::trim).filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains('\\') {
            return Err(ApiError::bad_request("Path tidak valid"));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Validate a folder or file name: non-blank, single path segment.
pub fn validate_name(raw: Option<&str>, empty_msg: &str) -> Result<String, ApiError> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::bad_request(empty_msg));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(ApiError::bad_request("Nama tidak boleh mengandung karakter path"));
    }
    Ok(name.to_string())
}

/// `Content-Disposition` value with a header-safe fallback file name.
pub fn attachment_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

pub async fn list_files(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let path = normalize_path(&query.path)?;
    let listing = state.db.files.list(claims.user_id, &path).await?;

    let files: Vec<FileEntry> = listing.files.into_iter().map(FileEntry::from).collect();
    let folders: Vec<FolderEntry> = listing.folders.into_iter().map(FolderEntry::from).collect();

    Ok(Json(json!({
        "success": true,
        "data": { "files": files, "folders": folders },
    })))
}

pub async fn create_folder(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateFolderBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = validate_name(body.name.as_deref(), "Nama folder tidak boleh kosong")?;
    let path = normalize_path(&body.path)?;

    let marker = object_key(claims.user_id, &join_path(&path, &name), defaults::FOLDER_MARKER);
    state.storage.write(&marker, &[]).await?;

    let folder = state
        .db
        .files
        .create_folder(claims.user_id, &name, &path)
        .await
        .map_err(|e| match e {
            Error::Conflict(_) => ApiError::Conflict(format!("Folder {name} sudah ada")),
            other => other.into(),
        })?;

    info!(
        subsystem = "api",
        component = "files",
        op = "create_folder",
        user_id = claims.user_id,
        folder_id = folder.id,
        "Folder created"
    );
    Ok(Json(json!({
        "success": true,
        "data": { "folder": FolderEntry::from(folder) },
    })))
}

pub async fn upload_file(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_form(multipart, "file").await?;
    let path = normalize_path(form.field("path").unwrap_or_default())?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("Tidak ada file yang diunggah"))?;

    let accepted = check_upload(
        &file.data,
        &file.content_type,
        defaults::MAX_UPLOAD_BYTES,
        defaults::ALLOWED_UPLOAD_TYPES,
        MSG_UNSUPPORTED_TYPE,
    )?;

    let folder_id = if path.is_empty() {
        None
    } else {
        let folder = state
            .db
            .files
            .find_folder_by_path(claims.user_id, &path)
            .await?
            .ok_or_else(|| ApiError::not_found(MSG_FOLDER_NOT_FOUND))?;
        Some(folder.id)
    };

    let original_name = sanitize_file_name(&file.file_name);
    let leaf = format!("{}-{}", Utc::now().timestamp_millis(), original_name);
    let key = object_key(claims.user_id, &path, &leaf);

    state.storage.write(&key, &file.data).await?;

    let request = CreateFileRequest {
        user_id: claims.user_id,
        filename: leaf,
        original_name,
        path,
        file_url: format!("/uploads/{key}"),
        file_type: accepted.content_type,
        file_size: accepted.size as i64,
        folder_id,
        storage_key: key.clone(),
    };
    let stored = match state.db.files.create_file(&request).await {
        Ok(stored) => stored,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                warn!(subsystem = "api", component = "files", storage_key = %key, error = %cleanup, "Orphaned object after failed insert");
            }
            return Err(e.into());
        }
    };

    info!(
        subsystem = "api",
        component = "files",
        op = "upload",
        user_id = claims.user_id,
        file_id = stored.id,
        size = stored.file_size,
        "File uploaded"
    );
    Ok(Json(json!({
        "success": true,
        "file": FileEntry::from(stored),
    })))
}

pub async fn download_file(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let file = state
        .db
        .files
        .get_file(id, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_FILE_NOT_FOUND))?;

    let data = state.storage.read(&file.storage_key).await.map_err(|e| match e {
        Error::NotFound(_) => ApiError::not_found("File tidak ditemukan di server"),
        other => other.into(),
    })?;

    let content_type = HeaderValue::from_str(&file.file_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&attachment_disposition(&file.original_name))
        .unwrap_or(HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

/// Serve an object by key at its public URL.
pub async fn serve_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.storage.read(&key).await.map_err(|e| match e {
        Error::NotFound(_) | Error::Storage(_) => ApiError::not_found(MSG_FILE_NOT_FOUND),
        other => other.into(),
    })?;
    let content_type = HeaderValue::from_str(&detect_content_type(&data, ""))
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}

pub async fn delete_file(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let file = state
        .db
        .files
        .delete_file(id, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_FILE_NOT_FOUND))?;

    if let Err(e) = state.storage.delete(&file.storage_key).await {
        warn!(subsystem = "api", component = "files", storage_key = %file.storage_key, error = %e, "Object delete failed");
    }

    info!(
        subsystem = "api",
        component = "files",
        op = "delete_file",
        user_id = claims.user_id,
        file_id = id,
        "File deleted"
    );
    Ok(Json(json!({
        "success": true,
        "message": format!("File {} berhasil dihapus", file.original_name),
    })))
}

pub async fn delete_folder(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let folder = state
        .db
        .files
        .get_folder(id, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_FOLDER_NOT_FOUND))?;

    // Keys of files inside the folder plus anything stored under its
    // current prefix (markers, objects of nested folders).
    let mut keys: BTreeSet<String> = state
        .db
        .files
        .files_in_folder(&folder)
        .await?
        .into_iter()
        .map(|f| f.storage_key)
        .collect();
    let prefix = object_key(claims.user_id, &folder.full_path(), "");
    keys.extend(state.storage.list(&prefix).await?);

    for key in &keys {
        state.storage.delete(key).await?;
    }
    debug!(
        subsystem = "api",
        component = "files",
        folder_id = id,
        result_count = keys.len(),
        "Folder objects removed"
    );

    let files_removed = state.db.files.delete_folder(&folder).await.map_err(|e| match e {
        Error::NotFound(_) => ApiError::not_found(MSG_FOLDER_NOT_FOUND),
        other => other.into(),
    })?;

    info!(
        subsystem = "api",
        component = "files",
        op = "delete_folder",
        user_id = claims.user_id,
        folder_id = id,
        files_removed,
        "Folder deleted"
    );
    Ok(Json(json!({
        "success": true,
        "message": "Folder berhasil dihapus",
    })))
}

pub async fn rename(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(body): Json<RenameBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let new_name = validate_name(body.new_name.as_deref(), "Nama baru tidak boleh kosong")?;

    let renamed = match kind.as_str() {
        "folder" => state.db.files.rename_folder(id, claims.user_id, &new_name).await,
        "file" => state.db.files.rename_file(id, claims.user_id, &new_name).await,
        other => return Err(ApiError::bad_request(format!("Tipe tidak dikenal: {other}"))),
    }
    .map_err(|e| match e {
        Error::Conflict(_) => ApiError::Conflict(format!("Nama {new_name} sudah digunakan")),
        other => other.into(),
    })?;

    if !renamed {
        let msg = if kind == "folder" {
            MSG_FOLDER_NOT_FOUND
        } else {
            MSG_FILE_NOT_FOUND
        };
        return Err(ApiError::not_found(msg));
    }

    debug!(
        subsystem = "api",
        component = "files",
        op = "rename",
        user_id = claims.user_id,
        kind = %kind,
        id,
        "Renamed"
    );
    Ok(Json(json!({ "success": true })))
}
