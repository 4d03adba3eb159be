//! Uploaded product images.
//!
//! Files are written under the configured media directory and served back
//! from [`MEDIA_URL_PREFIX`]. Stored names are random; the client's filename
//! only contributes its extension.

use std::path::Path;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// URL prefix the media directory is mounted at.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Subdirectory for product images.
const PRODUCT_IMAGE_DIR: &str = "products";

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported image type")]
    UnsupportedType,
    #[error("Image is empty")]
    Empty,
    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded file as it came off the wire.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Extension to store the file under, from the filename or else the
    /// declared content type. Only common web image formats are accepted.
    fn extension(&self) -> Result<&'static str, MediaError> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .and_then(|ext| IMAGE_TYPES.iter().find(|(e, _)| *e == ext).map(|(e, _)| *e));

        let from_type = || {
            let declared = self.content_type.as_deref()?.trim().to_ascii_lowercase();
            IMAGE_TYPES
                .iter()
                .find(|(_, mime)| *mime == declared)
                .map(|(e, _)| *e)
        };

        from_name.or_else(from_type).ok_or(MediaError::UnsupportedType)
    }
}

/// Relative path (under the media directory) for a new product image.
fn product_image_path(extension: &str) -> String {
    format!("{PRODUCT_IMAGE_DIR}/{}.{extension}", Uuid::new_v4().simple())
}

/// Write a product image and return the URL it is served at.
///
/// # Errors
///
/// Returns `MediaError::UnsupportedType` for anything but jpg, png, gif or
/// webp, `MediaError::Empty` for a zero-byte upload, and `MediaError::Io` if
/// the file cannot be written.
pub async fn save_product_image(
    media_dir: &Path,
    upload: &ImageUpload,
) -> Result<String, MediaError> {
    if upload.bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    let relative = product_image_path(upload.extension()?);
    let target = media_dir.join(&relative);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &upload.bytes).await?;

    info!(path = %target.display(), bytes = upload.bytes.len(), "Product image stored");
    Ok(format!("{MEDIA_URL_PREFIX}/{relative}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(file_name: Option<&str>, content_type: Option<&str>) -> ImageUpload {
        ImageUpload {
            file_name: file_name.map(str::to_owned),
            content_type: content_type.map(str::to_owned),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_extension_from_filename() {
        assert_eq!(upload(Some("lamp.PNG"), None).extension().unwrap(), "png");
        assert_eq!(upload(Some("a.b.jpeg"), None).extension().unwrap(), "jpeg");
    }

    #[test]
    fn test_extension_falls_back_to_content_type() {
        let image = upload(Some("blob"), Some("image/webp"));
        assert_eq!(image.extension().unwrap(), "webp");
    }

    #[test]
    fn test_non_images_are_rejected() {
        assert!(matches!(
            upload(Some("run.sh"), Some("text/x-shellscript")).extension(),
            Err(MediaError::UnsupportedType)
        ));
        assert!(upload(None, None).extension().is_err());
    }

    #[test]
    fn test_client_path_never_reaches_disk() {
        let path = product_image_path(upload(Some("../../etc/x.png"), None).extension().unwrap());
        assert!(path.starts_with("products/"));
        assert!(!path.contains(".."));
        assert!(path.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_save_writes_under_media_dir() {
        let media_dir = std::env::temp_dir().join(format!("bazaar-media-{}", Uuid::new_v4()));
        let image = upload(Some("lamp.png"), Some("image/png"));

        let url = save_product_image(&media_dir, &image).await.unwrap();
        assert!(url.starts_with("/media/products/"));

        let relative = url.trim_start_matches("/media/");
        let written = tokio::fs::read(media_dir.join(relative)).await.unwrap();
        assert_eq!(written, image.bytes);

        tokio::fs::remove_dir_all(&media_dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let mut image = upload(Some("lamp.png"), None);
        image.bytes.clear();
        let err = save_product_image(Path::new("unused"), &image).await.unwrap_err();
        assert!(matches!(err, MediaError::Empty));
    }
}
