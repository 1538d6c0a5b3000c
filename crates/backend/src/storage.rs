//! Object storage: uploads and public URLs.

use serde::Serialize;
use tracing::instrument;

use crate::client::{BackendClient, read_response, send};
use crate::error::BackendError;

/// Bucket holding product photos.
pub const PRODUCT_IMAGES_BUCKET: &str = "product-images";

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Client for the `/storage/v1` endpoints.
pub struct StorageClient<'a> {
    client: &'a BackendClient,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl<'a> StorageClient<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{}",
            self.client.base_url(),
            path.trim_start_matches('/')
        )
    }

    /// Upload `bytes` to `bucket/path`, replacing any existing object.
    ///
    /// Returns the object's public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is refused or fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let path = path.trim_start_matches('/');
        let url = format!(
            "{}/storage/v1/object/{bucket}/{path}",
            self.client.base_url()
        );
        let request = self
            .client
            .authorize(self.client.http().post(url))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        read_response(send(request, "storage/upload").await?, "storage/upload").await?;
        Ok(self.public_url(bucket, path))
    }

    /// Delete objects from a bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), BackendError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{bucket}", self.client.base_url());
        let request = self
            .client
            .authorize(self.client.http().delete(url))
            .json(&RemoveRequest { prefixes: paths });
        read_response(send(request, "storage/remove").await?, "storage/remove").await?;
        Ok(())
    }
}

/// Reduce an uploaded file name to `[a-z0-9._-]`, keeping the extension.
///
/// Falls back to `upload` when nothing usable remains.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Whether a content type is an accepted image format.
#[must_use]
pub fn is_supported_image(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/jpeg" | "image/png" | "image/webp" | "image/avif"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    #[test]
    fn test_public_url() {
        let client = BackendClient::new(&BackendConfig::new("https://db.parfumerie.test/", "k"));
        let storage = StorageClient::new(&client);
        assert_eq!(
            storage.public_url(PRODUCT_IMAGES_BUCKET, "/12/front.jpg"),
            "https://db.parfumerie.test/storage/v1/object/public/product-images/12/front.jpg"
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Front Shot.JPG"), "front-shot.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\bottle.png"), "bottle.png");
        assert_eq!(sanitize_file_name("***"), "upload");
    }

    #[test]
    fn test_supported_images() {
        assert!(is_supported_image("image/webp"));
        assert!(!is_supported_image("image/svg+xml"));
    }
}
