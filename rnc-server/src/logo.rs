//! Company logo storage
//!
//! A single file named `logo` in the data folder. The image format is
//! sniffed from the bytes on upload and again when served.

use printpdf::image_crate::{self, ImageFormat};
use rnc_common::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Detect a supported image format, or reject the bytes
pub fn sniff(bytes: &[u8]) -> Result<ImageFormat> {
    let format = image_crate::guess_format(bytes)
        .map_err(|_| Error::InvalidInput("logo must be a PNG, JPEG, GIF or BMP image".into()))?;

    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::Bmp => Ok(format),
        other => Err(Error::InvalidInput(format!(
            "unsupported logo format {:?}",
            other
        ))),
    }
}

/// Replace the stored logo
pub async fn save(path: &Path, bytes: &[u8]) -> Result<ImageFormat> {
    let format = sniff(bytes)?;
    tokio::fs::write(path, bytes).await?;
    info!("Logo updated ({:?}, {} bytes)", format, bytes.len());
    Ok(format)
}

/// Stored logo bytes and MIME type, `None` when no logo was uploaded
pub async fn load(path: &Path) -> Result<Option<(Vec<u8>, &'static str)>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let format = sniff(&bytes)?;
            Ok(Some((bytes, format.to_mime_type())))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete the stored logo. Returns `false` if there was none.
pub async fn remove(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!("Logo removed");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_sniff_rejects_text() {
        assert!(matches!(sniff(b"hello"), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo");

        assert!(load(&path).await.unwrap().is_none());

        save(&path, PNG_MAGIC).await.unwrap();
        let (bytes, mime) = load(&path).await.unwrap().unwrap();
        assert_eq!(bytes, PNG_MAGIC);
        assert_eq!(mime, "image/png");

        assert!(remove(&path).await.unwrap());
        assert!(!remove(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_upload_keeps_previous_logo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo");
        save(&path, PNG_MAGIC).await.unwrap();

        assert!(save(&path, b"not an image").await.is_err());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG_MAGIC);
    }
}
