//! Image uploads and the image-to-code prompt.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

const IMAGE_PROMPT_PREAMBLE: &str =
    "Analyze this UI design image and generate responsive HTML/CSS code based on it.\n\n[Image Base64 Below]\n";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image type for {path}: only PNG and JPEG are accepted")]
    UnsupportedType { path: PathBuf },

    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    /// Infers the type from a file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-selected design image, held fully in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: ImageMime,
    bytes: Arc<[u8]>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime: ImageMime, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime,
            bytes: bytes.into(),
        }
    }

    /// Reads the whole file. Anything but PNG/JPEG is refused before reading.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let mime = ImageMime::from_path(path).ok_or_else(|| ImageError::UnsupportedType {
            path: path.to_path_buf(),
        })?;
        let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(file_name, mime, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// The single user message sent for image-to-code conversion.
pub fn image_prompt(upload: &ImageUpload) -> String {
    format!("{IMAGE_PROMPT_PREAMBLE}{}", upload.data_uri())
}
