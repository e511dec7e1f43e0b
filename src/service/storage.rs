use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::ServiceError;

pub const ATTACHMENT_BUCKET: &str = "ticket-attachments";

/// How many neighbouring millisecond slots `put` tries before giving up.
const MAX_NAME_ATTEMPTS: i64 = 16;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Resolves `relative` under `base`, refusing anything that climbs out of it.
fn ensure_within(base: &Path, relative: &str) -> Result<PathBuf, ServiceError> {
    let mut resolved = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::CurDir => {}
            _ => {
                return Err(ServiceError::Validation(
                    "Invalid attachment path".to_string(),
                ))
            }
        }
    }
    if resolved == base || !resolved.starts_with(base) {
        return Err(ServiceError::Validation(
            "Invalid attachment path".to_string(),
        ));
    }
    Ok(resolved)
}

/// Lowercase alphanumeric extension of `file_name`, or `bin`.
fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// Object key `{ticket_id}/{unix_millis}.{ext}`.
pub fn object_path(ticket_id: Uuid, file_name: &str, at: DateTime<Utc>) -> String {
    format!("{}/{}.{}", ticket_id, at.timestamp_millis(), extension(file_name))
}

/// Local filesystem bucket for ticket attachments.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    bucket_path: PathBuf,
    max_size: usize,
}

impl AttachmentStore {
    pub async fn new(root: PathBuf, max_size: usize) -> Result<Self, ServiceError> {
        let bucket_path = root.join(ATTACHMENT_BUCKET);
        fs::create_dir_all(&bucket_path).await.map_err(|e| {
            ServiceError::Storage(format!(
                "Failed to create attachment directory '{}': {}",
                bucket_path.display(),
                e
            ))
        })?;
        let bucket_path = bucket_path.canonicalize().unwrap_or(bucket_path);

        info!(path = %bucket_path.display(), "Attachment store initialized");

        Ok(Self {
            bucket_path,
            max_size,
        })
    }

    fn check_size(&self, size: usize) -> Result<(), ServiceError> {
        if size == 0 {
            return Err(ServiceError::Validation("Empty attachment".to_string()));
        }
        if size > self.max_size {
            return Err(ServiceError::AttachmentTooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Writes `bytes` at `path` unless something is already stored there.
    /// Returns `Ok(false)` when the path is taken.
    pub async fn upload(&self, path: &str, bytes: &[u8]) -> Result<bool, ServiceError> {
        self.check_size(bytes.len())?;
        let target = ensure_within(&self.bucket_path, path)?;
        self.ensure_parent(&target).await?;

        let opened = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await;

        let mut handle = match opened {
            Ok(handle) => handle,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(ServiceError::Storage(format!(
                    "Failed to create {}: {}",
                    path, e
                )))
            }
        };
        handle
            .write_all(bytes)
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to write {}: {}", path, e)))?;
        handle
            .flush()
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to write {}: {}", path, e)))?;

        debug!(path, size = bytes.len(), "Stored attachment");
        Ok(true)
    }

    /// Stores a new object for `ticket_id` and returns its key. A clash on
    /// the millisecond slot moves to the next one.
    pub async fn put(
        &self,
        ticket_id: Uuid,
        file: &UploadedFile,
        at: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let key = object_path(ticket_id, &file.file_name, at + chrono::Duration::milliseconds(attempt));
            if self.upload(&key, &file.bytes).await? {
                return Ok(key);
            }
        }

        Err(ServiceError::Storage(
            "Could not allocate an attachment name".to_string(),
        ))
    }

    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        let target = ensure_within(&self.bucket_path, path)?;
        fs::read(&target)
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to read {}: {}", path, e)))
    }

    async fn ensure_parent(&self, target: &Path) -> Result<(), ServiceError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServiceError::Storage(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}
