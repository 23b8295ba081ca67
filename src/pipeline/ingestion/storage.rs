use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::IngestionError;

/// Durable home for uploaded images.
pub trait BlobStorage: Send + Sync {
    /// Write `bytes` under `name`, returning the public storage path.
    fn put(&self, bytes: &[u8], name: &str) -> Result<String, IngestionError>;

    fn get(&self, name: &str) -> Result<Vec<u8>, IngestionError>;
}

/// Reject anything that could escape the storage root.
pub fn validate_stored_name(name: &str) -> Result<(), IngestionError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.contains("..")
    {
        return Err(IngestionError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Files in one directory, publicly mounted under `public_prefix`.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStorage {
    pub fn new(root: &Path, public_prefix: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_path(&self, name: &str) -> String {
        format!("{}/{name}", self.public_prefix)
    }

    fn write_atomically(&self, bytes: &[u8], target: &Path, partial: &Path) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut file = fs::File::create(partial)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(partial, target)
    }
}

impl BlobStorage for LocalBlobStorage {
    fn put(&self, bytes: &[u8], name: &str) -> Result<String, IngestionError> {
        validate_stored_name(name)?;
        let target = self.root.join(name);
        let partial = self.root.join(format!("{name}.part"));

        if let Err(e) = self.write_atomically(bytes, &target, &partial) {
            // Never leave a half-written file behind
            let _ = fs::remove_file(&partial);
            tracing::error!(name, error = %e, "Failed to write uploaded image");
            return Err(IngestionError::StorageWriteFailed(e.to_string()));
        }
        Ok(self.public_path(name))
    }

    fn get(&self, name: &str) -> Result<Vec<u8>, IngestionError> {
        validate_stored_name(name)?;
        match fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IngestionError::NotFound(name.to_string()))
            }
            Err(e) => Err(IngestionError::Io(e)),
        }
    }
}
