//! Multipart form reading and upload content checks.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;

/// One file part of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A parsed multipart form: the file part named `file_field` plus every text field.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<FilePart>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Drain a multipart body.
pub async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Error upload file: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Error upload file: {e}")))?
                .to_vec();
            form.file = Some(FilePart {
                file_name,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Error upload file: {e}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Detect the content type of `data`.
///
/// Magic bytes win. Without a match only a claimed `text/*` type is kept;
/// anything else becomes `application/octet-stream`.
pub fn detect_content_type(data: &[u8], claimed: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    if claimed.starts_with("text/") {
        return claimed.to_string();
    }
    "application/octet-stream".to_string()
}

/// A payload that passed the size and type checks.
#[derive(Debug, Clone)]
pub struct AcceptedUpload {
    pub content_type: String,
    pub size: usize,
}

/// Validate size and detected type against an allow list.
pub fn check_upload(
    data: &[u8],
    claimed: &str,
    max_bytes: usize,
    allowed: &[&str],
    rejected_msg: &str,
) -> Result<AcceptedUpload, ApiError> {
    if data.is_empty() {
        return Err(ApiError::bad_request("Tidak ada file yang diunggah"));
    }
    if data.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "Ukuran file terlalu besar (maksimal {}MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    let content_type = detect_content_type(data, claimed);
    if !allowed.contains(&content_type.as_str()) {
        return Err(ApiError::bad_request(rejected_msg));
    }

    Ok(AcceptedUpload {
        content_type,
        size: data.len(),
    })
}

/// Keep only the final path component of a client-supplied file name.
pub fn sanitize_file_name(name: &str) -> String {
    let leaf = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = leaf
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => cleaned,
    }
}

/// Lower-cased extension including the dot, or empty.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}
