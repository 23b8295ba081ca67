//! Image ingestion: validate an uploaded label photo and persist it under a
//! generated name.
//!
//! Checks run in order: declared content type, size bound, magic bytes.
//! Nothing touches storage until all three pass.

pub mod format;
pub mod storage;

pub use format::*;
pub use storage::*;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: usize },

    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    #[error("Invalid stored name: {0}")]
    InvalidName(String),

    #[error("Stored image not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload policy handed to ingestion by the caller.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub max_bytes: usize,
    pub allowed_types: Vec<String>,
    /// Reject payloads whose leading bytes are not an allowed image format.
    pub sniff_content: bool,
}

/// One uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImageRef {
    pub generated_name: String,
    /// Public path the image is served from, e.g. `/uploads/<name>`.
    pub storage_path: String,
}

/// Validate the declared content type against the allow-list.
///
/// Returns the normalized type. Called before any body bytes are read.
pub fn check_declared_type(
    config: &IngestionConfig,
    content_type: Option<&str>,
) -> Result<String, IngestionError> {
    let declared = content_type.map(normalize_content_type).unwrap_or_default();
    if declared.is_empty() || !is_allowed_type(&config.allowed_types, &declared) {
        return Err(IngestionError::UnsupportedMediaType(if declared.is_empty() {
            "missing content type".into()
        } else {
            declared
        }));
    }
    Ok(declared)
}

/// Accumulates an upload body chunk by chunk, failing as soon as the bound is crossed.
#[derive(Debug)]
pub struct BoundedBody {
    limit: usize,
    bytes: Vec<u8>,
}

impl BoundedBody {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            bytes: Vec::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<(), IngestionError> {
        if self.bytes.len() + chunk.len() > self.limit {
            return Err(IngestionError::PayloadTooLarge { limit: self.limit });
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Validate an upload and write it to storage under a fresh unique name.
pub fn ingest_image(
    storage: &dyn BlobStorage,
    config: &IngestionConfig,
    upload: ImageUpload,
) -> Result<StoredImageRef, IngestionError> {
    let declared = check_declared_type(config, upload.content_type.as_deref())?;

    if upload.bytes.len() > config.max_bytes {
        return Err(IngestionError::PayloadTooLarge {
            limit: config.max_bytes,
        });
    }

    if config.sniff_content {
        match sniff_image_type(&upload.bytes) {
            Some(sniffed) if is_allowed_type(&config.allowed_types, sniffed) => {}
            Some(sniffed) => {
                return Err(IngestionError::UnsupportedMediaType(sniffed.to_string()));
            }
            None => {
                return Err(IngestionError::UnsupportedMediaType(format!(
                    "content is not a recognized image (declared {declared})"
                )));
            }
        }
    }

    let generated_name = generate_stored_name(upload.filename.as_deref(), &declared);
    let storage_path = storage.put(&upload.bytes, &generated_name)?;

    tracing::info!(
        generated_name = %generated_name,
        bytes = upload.bytes.len(),
        content_type = %declared,
        "Image stored"
    );

    Ok(StoredImageRef {
        generated_name,
        storage_path,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::png_bytes;
    use super::*;

    fn config() -> IngestionConfig {
        IngestionConfig {
            max_bytes: 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".into(),
                "image/jpg".into(),
                "image/png".into(),
                "image/gif".into(),
            ],
            sniff_content: true,
        }
    }

    fn upload(bytes: Vec<u8>, content_type: &str, filename: &str) -> ImageUpload {
        ImageUpload {
            bytes,
            content_type: Some(content_type.into()),
            filename: Some(filename.into()),
        }
    }

    fn stored_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn stores_png_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "/uploads");
        let stored = ingest_image(&storage, &config(), upload(png_bytes(), "image/png", "Label.PNG"))
            .unwrap();

        assert!(stored.generated_name.ends_with(".png"));
        assert_ne!(stored.generated_name, "Label.PNG");
        assert_eq!(stored.storage_path, format!("/uploads/{}", stored.generated_name));
        assert_eq!(storage.get(&stored.generated_name).unwrap(), png_bytes());
    }

    #[test]
    fn same_filename_twice_gets_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "/uploads");
        let a = ingest_image(&storage, &config(), upload(png_bytes(), "image/png", "a.png")).unwrap();
        let b = ingest_image(&storage, &config(), upload(png_bytes(), "image/png", "a.png")).unwrap();
        assert_ne!(a.generated_name, b.generated_name);
        assert_eq!(stored_files(dir.path()), 2);
    }

    #[test]
    fn non_image_type_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "/uploads");
        let result = ingest_image(
            &storage,
            &config(),
            upload(b"%PDF-1.7 ...".to_vec(), "application/pdf", "rx.pdf"),
        );
        assert!(matches!(result, Err(IngestionError::UnsupportedMediaType(_))));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[test]
    fn missing_content_type_is_rejected() {
        let result = check_declared_type(&config(), None);
        assert!(matches!(result, Err(IngestionError::UnsupportedMediaType(_))));
    }

    #[test]
    fn declared_type_parameters_are_ignored() {
        let declared = check_declared_type(&config(), Some("Image/PNG; charset=binary")).unwrap();
        assert_eq!(declared, "image/png");
    }

    #[test]
    fn disguised_payload_is_rejected_by_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "/uploads");
        let result = ingest_image(
            &storage,
            &config(),
            upload(b"<html>not an image</html>".to_vec(), "image/png", "x.png"),
        );
        assert!(matches!(result, Err(IngestionError::UnsupportedMediaType(_))));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[test]
    fn sniffing_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "/uploads");
        let mut cfg = config();
        cfg.sniff_content = false;
        let result = ingest_image(&storage, &cfg, upload(b"raw".to_vec(), "image/png", "x.png"));
        assert!(result.is_ok());
    }

    #[test]
    fn oversized_payload_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "/uploads");
        let mut cfg = config();
        cfg.max_bytes = 16;
        let result = ingest_image(&storage, &cfg, upload(png_bytes(), "image/png", "x.png"));
        assert!(matches!(result, Err(IngestionError::PayloadTooLarge { limit: 16 })));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[test]
    fn bounded_body_fails_on_the_chunk_that_crosses_the_limit() {
        let mut body = BoundedBody::new(10);
        body.push(b"12345").unwrap();
        body.push(b"67890").unwrap();
        assert_eq!(body.len(), 10);
        let err = body.push(b"1").unwrap_err();
        assert!(matches!(err, IngestionError::PayloadTooLarge { limit: 10 }));
        assert_eq!(body.into_bytes(), b"1234567890");
    }

    #[test]
    fn write_failure_surfaces_as_storage_write_failed() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the upload directory should be
        let blocker = dir.path().join("uploads");
        std::fs::write(&blocker, b"").unwrap();
        let storage = LocalBlobStorage::new(&blocker, "/uploads");
        let result = ingest_image(&storage, &config(), upload(png_bytes(), "image/png", "x.png"));
        assert!(matches!(result, Err(IngestionError::StorageWriteFailed(_))));
    }
}
