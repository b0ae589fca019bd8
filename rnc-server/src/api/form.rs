//! Request body helpers: JSON parsing with API errors, multipart forms with
//! a JSON part plus photo files

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use printpdf::image_crate;
use rnc_common::db::NewPhoto;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Field names accepted for photo files
const PHOTO_FIELDS: [&str; 2] = ["photo", "photos"];

/// Parse a JSON body, reporting problems as 400 with the serde message
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {}", e)))
}

/// A decoded multipart form
#[derive(Debug, Default)]
pub struct Form {
    pub fields: HashMap<String, String>,
    pub photos: Vec<NewPhoto>,
}

impl Form {
    /// Read every part. File parts named `photo`/`photos` become photos
    /// (empty ones, as sent by a blank file input, are dropped); other parts
    /// are kept as text fields.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Form::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if PHOTO_FIELDS.contains(&name.as_str()) {
                let filename = field.file_name().map(str::to_string);
                let data: Bytes = field.bytes().await?;
                if data.is_empty() {
                    continue;
                }
                form.photos.push(NewPhoto {
                    filename,
                    mime_type: photo_mime_type(&data),
                    data: data.to_vec(),
                });
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Deserialize the JSON text part named `name`
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> ApiResult<T> {
        let text = self
            .fields
            .get(name)
            .ok_or_else(|| ApiError::BadRequest(format!("missing '{}' part", name)))?;
        parse_json(text.as_bytes())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Sniffed image type, else opaque bytes; the declared type is never trusted
fn photo_mime_type(data: &[u8]) -> String {
    image_crate::guess_format(data)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_mime_type_ignores_declared_type() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(photo_mime_type(png), "image/png");
        assert_eq!(photo_mime_type(b"<html><script></script>"), "application/octet-stream");
    }

    #[test]
    fn test_parse_json_error_is_bad_request() {
        let err = parse_json::<serde_json::Value>(b"{").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
