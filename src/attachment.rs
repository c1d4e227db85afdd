//! Image attachments.
//!
//! The selection step ([`ImageMimeType::from_path`]) decides whether a file is
//! an acceptable image; [`read_file`] then loads and base64-encodes it.

use std::fmt;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::{Blob, Part};
use crate::{Error, Result};

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMimeType {
    #[serde(rename = "image/png")]
    Png,

    #[serde(rename = "image/jpeg")]
    Jpeg,

    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMimeType {
    /// Determines the media type from the file extension.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything but png, jpeg/jpg or webp.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => Ok(ImageMimeType::Png),
            Some("jpg") | Some("jpeg") => Ok(ImageMimeType::Jpeg),
            Some("webp") => Ok(ImageMimeType::Webp),
            _ => Err(Error::validation(
                format!(
                    "unsupported image type for {}; expected png, jpeg or webp",
                    path.display()
                ),
                Some("attachment".to_string()),
            )),
        }
    }

    /// Returns the IANA media type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMimeType::Png => "image/png",
            ImageMimeType::Jpeg => "image/jpeg",
            ImageMimeType::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A base64-encoded image ready to be sent with a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// IANA media type.
    pub mime_type: String,

    /// Standard base64 payload, without a `data:` URL prefix.
    pub data: String,
}

impl Attachment {
    /// Create an attachment from an already-encoded payload.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encodes raw bytes.
    pub fn from_bytes(mime_type: ImageMimeType, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.as_str().to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Returns the size of the decoded payload in bytes, approximately.
    pub fn approx_size(&self) -> usize {
        self.data.len() / 4 * 3
    }

    /// Converts the attachment into an inline-data request part.
    pub fn to_part(&self) -> Part {
        Part::inline_data(Blob::new(self.mime_type.clone(), self.data.clone()))
    }
}

/// Reads and encodes an image file.
///
/// The media type is taken from the selection step and not re-validated.
///
/// ```
/// # tokio_test::block_on(async {
/// use wormzero::attachment::{ImageMimeType, read_file};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("pixel.png");
/// std::fs::write(&path, b"\x89PNG").unwrap();
///
/// let mime_type = ImageMimeType::from_path(&path).unwrap();
/// let attachment = read_file(&path, mime_type).await.unwrap();
/// assert_eq!(attachment.mime_type, "image/png");
/// assert_eq!(attachment.data, "iVBORw==");
/// # });
/// ```
///
/// # Errors
///
/// Returns [`Error::FileRead`] if the file cannot be read.
pub async fn read_file<P: AsRef<Path>>(path: P, mime_type: ImageMimeType) -> Result<Attachment> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| Error::file_read(format!("failed to read {}", path.display()), err))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), %mime_type, "read attachment");
    Ok(Attachment::from_bytes(mime_type, &bytes))
}
