//! Store photo uploads.
//!
//! A photo goes through three steps: the declared MIME type is checked (only
//! `image/*` is accepted, before anything touches the disk), a unique
//! `<uuid>.<subtype>` filename is generated, and the decoded image is
//! downscaled to the configured maximum width and written to the upload
//! directory. Decoding and encoding run on the blocking thread pool.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while storing a photo.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The declared content type is not an image.
    #[error("That filetype isn't allowed!")]
    UnsupportedFileType(String),

    /// The bytes could not be decoded or re-encoded as an image.
    #[error("could not process image: {0}")]
    Image(#[from] image::ImageError),

    /// Writing the file failed.
    #[error("could not write photo: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking image task panicked or was cancelled.
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UploadError {
    /// Message to show on the form when the upload itself was bad, or `None`
    /// for server-side failures.
    #[must_use]
    pub fn rejection_message(&self) -> Option<String> {
        match self {
            Self::UnsupportedFileType(_) => Some(self.to_string()),
            Self::Image(_) => Some("That image could not be read.".to_string()),
            Self::Io(_) | Self::Task(_) => None,
        }
    }
}

/// A file part received from a store form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Declared MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Browsers send an empty, unnamed part when no file was chosen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Writes resized store photos into the public upload directory.
#[derive(Debug, Clone)]
pub struct PhotoUploader {
    dir: PathBuf,
    max_width: u32,
}

impl PhotoUploader {
    /// Create an uploader writing to `dir`, capping width at `max_width` pixels.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_width: u32) -> Self {
        Self {
            dir: dir.into(),
            max_width: max_width.max(1),
        }
    }

    /// Directory photos are written to (and served from).
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate a fresh filename for an upload of `content_type`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::UnsupportedFileType`] unless the type is `image/<subtype>`.
    pub fn filename_for(content_type: &str) -> Result<String, UploadError> {
        let unsupported = || UploadError::UnsupportedFileType(content_type.to_string());

        let essence = content_type.split(';').next().unwrap_or_default().trim();
        let subtype = essence
            .strip_prefix("image/")
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c)))
            .ok_or_else(unsupported)?;

        Ok(format!("{}.{}", Uuid::new_v4(), subtype.to_ascii_lowercase()))
    }

    /// Validate, resize and write a photo, returning its stored filename.
    ///
    /// An absent or empty upload is not an error and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::UnsupportedFileType`] for non-image types (nothing
    /// is written), or an image/IO error if processing fails.
    pub async fn store(&self, upload: Option<PhotoUpload>) -> Result<Option<String>, UploadError> {
        let Some(upload) = upload.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let filename = Self::filename_for(&upload.content_type)?;
        let path = self.dir.join(&filename);
        let dir = self.dir.clone();
        let max_width = self.max_width;

        tokio::task::spawn_blocking(move || -> Result<(), UploadError> {
            let image = image::load_from_memory(&upload.bytes)?;
            let image = downscale(image, max_width);
            let format = ImageFormat::from_path(&path)?;
            let image = if format == ImageFormat::Jpeg {
                // JPEG has no alpha channel
                DynamicImage::ImageRgb8(image.to_rgb8())
            } else {
                image
            };

            std::fs::create_dir_all(&dir)?;
            image.save_with_format(&path, format)?;
            Ok(())
        })
        .await??;

        tracing::info!(photo = %filename, "Photo stored");
        Ok(Some(filename))
    }
}

impl PhotoUploader {
    /// Remove a stored photo that ended up unreferenced. Failures are logged.
    pub async fn discard(&self, filename: &str) {
        let path = self.dir.join(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(photo = %filename, "Discarded unreferenced photo"),
            Err(e) => tracing::warn!(photo = %filename, error = %e, "Failed to discard photo"),
        }
    }
}

/// Shrink `image` to `max_width` keeping its aspect ratio; narrower images are untouched.
fn downscale(image: DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image;
    }
    image.resize(max_width, u32::MAX, FilterType::Triangle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::{Rgb, RgbImage};

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("delicious-uploads-{}", Uuid::new_v4()))
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 80, 40])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn upload(content_type: &str, bytes: Vec<u8>) -> Option<PhotoUpload> {
        Some(PhotoUpload {
            content_type: content_type.to_string(),
            bytes,
        })
    }

    #[test]
    fn test_filename_uses_mime_subtype() {
        let name = PhotoUploader::filename_for("image/jpeg").unwrap();
        assert!(name.ends_with(".jpeg"));
        assert_eq!(name.len(), 36 + ".jpeg".len());
    }

    #[test]
    fn test_filename_rejects_non_images() {
        for content_type in ["text/plain", "application/pdf", "image/", "imagejpeg", ""] {
            assert!(matches!(
                PhotoUploader::filename_for(content_type),
                Err(UploadError::UnsupportedFileType(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_absent_upload_passes_through() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        assert_eq!(uploader.store(None).await.unwrap(), None);
        assert_eq!(
            uploader.store(upload("application/octet-stream", Vec::new())).await.unwrap(),
            None
        );
        assert!(!uploader.dir().exists());
    }

    #[tokio::test]
    async fn test_non_image_rejected_without_writing() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let err = uploader
            .store(upload("text/plain", b"hello".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedFileType(_)));
        assert!(!uploader.dir().exists());
    }

    #[tokio::test]
    async fn test_wide_image_is_downscaled() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let name = uploader
            .store(upload("image/png", png(1600, 400)))
            .await
            .unwrap()
            .unwrap();
        assert!(name.ends_with(".png"));

        let dims = image::image_dimensions(uploader.dir().join(&name)).unwrap();
        assert_eq!(dims, (800, 200));
        std::fs::remove_dir_all(uploader.dir()).unwrap();
    }

    #[tokio::test]
    async fn test_narrow_image_kept() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let name = uploader
            .store(upload("image/png", png(200, 100)))
            .await
            .unwrap()
            .unwrap();

        let dims = image::image_dimensions(uploader.dir().join(&name)).unwrap();
        assert_eq!(dims, (200, 100));
        std::fs::remove_dir_all(uploader.dir()).unwrap();
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_names() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let bytes = png(10, 10);
        let first = uploader.store(upload("image/png", bytes.clone())).await.unwrap();
        let second = uploader.store(upload("image/png", bytes)).await.unwrap();
        assert_ne!(first, second);
        std::fs::remove_dir_all(uploader.dir()).unwrap();
    }

    #[tokio::test]
    async fn test_discard_removes_stored_photo() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let name = uploader
            .store(upload("image/png", png(10, 10)))
            .await
            .unwrap()
            .unwrap();
        assert!(uploader.dir().join(&name).exists());

        uploader.discard(&name).await;
        assert!(!uploader.dir().join(&name).exists());

        // Already gone: logged, not a panic.
        uploader.discard(&name).await;
        std::fs::remove_dir_all(uploader.dir()).unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_image_errors() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let err = uploader
            .store(upload("image/png", b"not a png".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Image(_)));
        assert_eq!(
            err.rejection_message().as_deref(),
            Some("That image could not be read.")
        );
        assert!(!uploader.dir().exists());
    }

    #[tokio::test]
    async fn test_undecodable_image_subtypes_are_rejected() {
        let uploader = PhotoUploader::new(temp_dir(), 800);
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
        let err = uploader
            .store(upload("image/svg+xml", svg.to_vec()))
            .await
            .unwrap_err();
        assert!(err.rejection_message().is_some());
    }

    #[test]
    fn test_rejection_message_only_for_bad_input() {
        let unsupported = UploadError::UnsupportedFileType("text/plain".to_string());
        assert_eq!(
            unsupported.rejection_message().as_deref(),
            Some("That filetype isn't allowed!")
        );

        let io = UploadError::Io(std::io::Error::other("disk full"));
        assert_eq!(io.rejection_message(), None);
    }
}
