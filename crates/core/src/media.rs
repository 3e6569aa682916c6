//! Order media: kinds, upload validation and stored file naming.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

/// Default upload size limit (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Longest original file name kept after sanitizing.
pub const MAX_FILE_NAME_LENGTH: usize = 120;

/// Accepted extensions and the content type served for each.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("svg", "image/svg+xml"),
    ("ai", "application/postscript"),
    ("eps", "application/postscript"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Artwork or reference images supplied with the request.
    Reference,
    SamplePhoto,
    ProductionPhoto,
    Document,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Reference,
        MediaKind::SamplePhoto,
        MediaKind::ProductionPhoto,
        MediaKind::Document,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Reference => "reference",
            MediaKind::SamplePhoto => "sample_photo",
            MediaKind::ProductionPhoto => "production_photo",
            MediaKind::Document => "document",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        MediaKind::ALL
            .into_iter()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid media kind '{value}'. Must be one of: reference, sample_photo, \
                     production_photo, document"
                ))
            })
    }

    /// Whether `role` may upload media of this kind.
    pub fn uploadable_by(self, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::Manufacturer => matches!(
                self,
                MediaKind::SamplePhoto | MediaKind::ProductionPhoto | MediaKind::Document
            ),
            Role::Client => matches!(self, MediaKind::Reference | MediaKind::Document),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased extension of `file_name`, if any.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Content type served for an accepted extension.
pub fn content_type_for(ext: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, ct)| *ct)
}

/// Validated facts about an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCheck {
    pub extension: String,
    pub content_type: &'static str,
    pub original_name: String,
}

/// Check an upload's name and size. Returns the normalized extension and
/// the content type to store.
pub fn validate_upload(file_name: &str, size: u64, max_bytes: u64) -> Result<UploadCheck, CoreError> {
    if size == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "File exceeds the maximum upload size of {max_bytes} bytes"
        )));
    }
    let extension = extension_of(file_name).ok_or_else(|| {
        CoreError::Validation(format!("File '{file_name}' has no extension"))
    })?;
    let content_type = content_type_for(&extension).ok_or_else(|| {
        let allowed: Vec<&str> = ALLOWED_TYPES.iter().map(|(e, _)| *e).collect();
        CoreError::Validation(format!(
            "Unsupported file type '.{extension}'. Allowed: {}",
            allowed.join(", ")
        ))
    })?;
    Ok(UploadCheck {
        original_name: sanitize_file_name(file_name),
        extension,
        content_type,
    })
}

/// Strip path components and anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LENGTH)
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Relative storage path for an upload: `orders/<order_id>/<token>.<ext>`.
pub fn storage_path(order_id: DbId, token: &str, extension: &str) -> String {
    format!("orders/{order_id}/{token}.{extension}")
}
