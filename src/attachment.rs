//! Attachment encoding
//!
//! Turns a user-selected file into a named, typed, base64 payload that can
//! ride along with a chat message or a deep-study request.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Default cap on imported file size (20MB)
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An encoded file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Standard base64 of the raw bytes, without any data-URI prefix
    pub data: String,
}

/// Raw file handed in by the front end
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl Attachment {
    /// Build from a browser-style data URL (`data:<mime>;base64,<payload>`).
    ///
    /// Everything up to and including the first comma is dropped; input
    /// without a comma is taken as bare base64.
    #[allow(dead_code)] // For front ends that read files as data URLs
    pub fn from_data_url(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        url: &str,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: strip_data_uri_prefix(url).to_string(),
        }
    }

    pub fn from_upload(upload: FileUpload) -> Self {
        Self {
            name: upload.name,
            mime_type: upload.mime_type,
            data: BASE64.encode(&upload.bytes),
        }
    }

    /// Decode the payload back into the original bytes
    #[allow(dead_code)] // Providers that upload raw bytes
    pub fn decode(&self) -> Result<Vec<u8>, AttachmentError> {
        Ok(BASE64.decode(self.data.as_bytes())?)
    }
}

/// Encode an upload. No upload means no attachment, and no error.
pub fn encode(upload: Option<FileUpload>) -> Option<Attachment> {
    upload.map(Attachment::from_upload)
}

/// Read a file from disk into an upload, guessing its MIME type from the
/// extension.
pub async fn read_upload(path: &Path, max_bytes: u64) -> Result<FileUpload, AttachmentError> {
    let display = path.display().to_string();

    let metadata = fs::metadata(path).await.map_err(|source| AttachmentError::Read {
        path: display.clone(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(AttachmentError::NotAFile(display));
    }

    if metadata.len() > max_bytes {
        return Err(AttachmentError::TooLarge {
            size: metadata.len(),
            max: max_bytes,
        });
    }

    let bytes = fs::read(path).await.map_err(|source| AttachmentError::Read {
        path: display.clone(),
        source,
    })?;

    let name = path
        .file_name()
        .map_or_else(|| display.clone(), |n| n.to_string_lossy().into_owned());

    let mime_type = mime_guess::from_path(path)
        .first()
        .map_or_else(|| FALLBACK_MIME_TYPE.to_string(), |m| m.essence_str().to_string());

    tracing::debug!(name = %name, mime_type = %mime_type, size = bytes.len(), "Read upload");

    Ok(FileUpload {
        name,
        mime_type,
        bytes,
    })
}

fn strip_data_uri_prefix(url: &str) -> &str {
    match url.split_once(',') {
        Some((_, payload)) => payload,
        None => url,
    }
}
