use gatehouse_error::error::ServerError;
use image::ImageFormat;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

pub const IMAGE_DIR: &str = "images";

/// Write a validated profile image below the media root
///
/// # Returns
///
/// * `String` - path of the stored file relative to the media root
pub async fn store_image(
    media_root: &str,
    data: &[u8],
    format: ImageFormat,
) -> Result<String, ServerError> {
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    let relative_path = format!("{}/{}.{}", IMAGE_DIR, Uuid::new_v4(), extension);

    let directory = Path::new(media_root).join(IMAGE_DIR);
    tokio::fs::create_dir_all(&directory)
        .await
        .map_err(|e| ServerError::ImageError(e.to_string()))?;

    let full_path = Path::new(media_root).join(&relative_path);
    tokio::fs::write(&full_path, data)
        .await
        .map_err(|e| ServerError::ImageError(e.to_string()))?;

    debug!("Stored image at {}", full_path.display());

    Ok(relative_path)
}

/// Remove an image stored by [`store_image`] whose record was never saved
pub async fn discard_image(media_root: &str, relative_path: &str) {
    let full_path = Path::new(media_root).join(relative_path);
    if let Err(e) = tokio::fs::remove_file(&full_path).await {
        warn!("Failed to remove image {}: {}", full_path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_image() {
        let dir = tempfile::tempdir().unwrap();
        let media_root = dir.path().to_string_lossy().to_string();

        let path = store_image(&media_root, b"bytes", ImageFormat::Png)
            .await
            .unwrap();
        assert!(path.starts_with("images/"));
        assert!(path.ends_with(".png"));

        let stored = tokio::fs::read(Path::new(&media_root).join(&path))
            .await
            .unwrap();
        assert_eq!(stored, b"bytes");
    }

    #[tokio::test]
    async fn test_discard_image() {
        let dir = tempfile::tempdir().unwrap();
        let media_root = dir.path().to_string_lossy().to_string();

        let path = store_image(&media_root, b"bytes", ImageFormat::Png)
            .await
            .unwrap();
        discard_image(&media_root, &path).await;
        assert!(!Path::new(&media_root).join(&path).exists());

        // already gone
        discard_image(&media_root, &path).await;
    }
}
