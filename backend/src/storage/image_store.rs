use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use hex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// S3-backed store for uploaded images. Objects are keyed by content
/// hash under a per-user prefix, so re-uploading the same image is
/// idempotent. The returned key doubles as the record's `image_url`.
#[derive(Clone)]
pub struct ImageStore {
    client: Client,
    bucket_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("no storage mapping for MIME type {0:?}")]
    UnsupportedFormat(String),
}

impl ImageStore {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    pub fn content_hash(image_data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(image_data);
        hex::encode(hasher.finalize())
    }

    pub fn object_key(user_id: Uuid, content_hash: &str, extension: &str) -> String {
        format!("images/{}/{}.{}", user_id, content_hash, extension)
    }

    pub fn extension_for_mime(mime_type: &str) -> Result<&'static str, StorageError> {
        match mime_type {
            "image/jpeg" => Ok("jpg"),
            "image/png" => Ok("png"),
            "application/dicom" => Ok("dcm"),
            _ => Err(StorageError::UnsupportedFormat(mime_type.to_string())),
        }
    }

    pub fn mime_for_key(key: &str) -> &'static str {
        match key.rsplit_once('.').map(|(_, ext)| ext) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("dcm") => "application/dicom",
            _ => "application/octet-stream",
        }
    }

    pub async fn store(
        &self,
        user_id: Uuid,
        image_data: &[u8],
        mime_type: &str,
    ) -> Result<String, StorageError> {
        let extension = Self::extension_for_mime(mime_type)?;
        let key = Self::object_key(user_id, &Self::content_hash(image_data), extension);

        let body = ByteStream::from(image_data.to_vec());
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(body)
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        Ok(key)
    }

    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        let body = result
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_and_hex_encoded() {
        let a = ImageStore::content_hash(b"scan bytes");
        let b = ImageStore::content_hash(b"scan bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(ImageStore::content_hash(b"other"), a);
    }

    #[test]
    fn object_key_nests_under_the_user_prefix() {
        let user_id = Uuid::new_v4();
        let key = ImageStore::object_key(user_id, "abc123", "png");
        assert_eq!(key, format!("images/{}/abc123.png", user_id));
    }

    #[test]
    fn extension_mapping_covers_the_upload_policy() {
        assert_eq!(ImageStore::extension_for_mime("image/jpeg").unwrap(), "jpg");
        assert_eq!(ImageStore::extension_for_mime("image/png").unwrap(), "png");
        assert_eq!(
            ImageStore::extension_for_mime("application/dicom").unwrap(),
            "dcm"
        );
        assert!(ImageStore::extension_for_mime("image/gif").is_err());
    }

    #[test]
    fn mime_recovers_from_the_stored_key() {
        assert_eq!(ImageStore::mime_for_key("images/u/h.jpg"), "image/jpeg");
        assert_eq!(ImageStore::mime_for_key("images/u/h.dcm"), "application/dicom");
        assert_eq!(
            ImageStore::mime_for_key("images/u/noext"),
            "application/octet-stream"
        );
    }
}
