use base64::Engine;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::error::ChatError;
use crate::feed::MediaType;

/// Media staged for the next message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    pub media_type: MediaType,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
    pub file_name: String,
    pub size_bytes: usize,
}

/// Guess a MIME type from the file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

/// Media kind for a MIME type; only `image/*` and `video/*` are accepted
pub fn media_type_for_mime(mime: &str) -> Option<MediaType> {
    if mime.starts_with("image/") {
        Some(MediaType::Image)
    } else if mime.starts_with("video/") {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Read a local file and encode it as an inline attachment
///
/// Only the MIME prefix is checked; size and content are not validated.
pub async fn load_attachment(path: impl AsRef<Path>) -> Result<MediaAttachment, ChatError> {
    let path = path.as_ref();
    let mime = mime_for_path(path);

    let media_type = media_type_for_mime(mime).ok_or_else(|| {
        ChatError::validation(format!(
            "unsupported media type {} for {}",
            mime,
            path.display()
        ))
    })?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ChatError::Io(format!("failed to read {}: {}", path.display(), e)))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

    info!(
        "Staged {} attachment {} ({} bytes)",
        mime,
        path.display(),
        bytes.len()
    );

    Ok(MediaAttachment {
        media_type,
        data_url: format!("data:{};base64,{}", mime, encoded),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_bytes: bytes.len(),
    })
}
