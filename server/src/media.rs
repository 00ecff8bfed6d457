//! Image validation and the filesystem-backed media store.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use thiserror::Error;
use uuid::Uuid;

/// Allowed image formats for recipe images.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("No file was submitted.")]
    Missing,

    #[error("File too large. Maximum size is {max} bytes")]
    TooLarge { max: usize },

    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    NotAnImage,

    #[error("Unsupported image format: {0:?}. Allowed: JPEG, PNG, GIF, WebP")]
    Unsupported(ImageFormat),
}

/// Detect the format from magic bytes and make sure the whole image decodes.
pub fn validate_image(data: &[u8]) -> Result<ImageFormat, ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| ImageError::NotAnImage)?;

    let format = reader.format().ok_or(ImageError::NotAnImage)?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(ImageError::Unsupported(format));
    }

    reader.decode().map_err(|e| {
        tracing::debug!("Failed to decode {:?} upload: {}", format, e);
        ImageError::NotAnImage
    })?;

    Ok(format)
}

/// Stores uploaded objects under a root directory and hands out their
/// public URLs.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
    max_file_size: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Write a validated recipe image and return its storage key.
    pub fn save_recipe_image(&self, data: &[u8], format: ImageFormat) -> io::Result<String> {
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let key = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", Uuid::new_v4());

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;

        Ok(key)
    }

    /// Remove a stored object. Missing objects are not an error.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.root.join(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.root.join(key).is_file()
    }

    pub fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}
