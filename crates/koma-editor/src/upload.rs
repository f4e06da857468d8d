//! Upload storage seam.
//!
//! Uploaded bytes go to an [`AssetStore`] that answers with a content
//! reference; the composer only ever stores references. Like generation,
//! uploads are begun against a target and completed by id.

use crate::generation::PendingTarget;
use async_trait::async_trait;
use koma_render::images::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload is empty")]
    Empty,

    #[error("upload rejected: {0}")]
    Rejected(String),

    #[error("{0:?} already has an upload in flight")]
    Busy(PendingTarget),

    #[error("upload target is gone")]
    TargetGone,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Where uploaded content is kept.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` and return the reference to draw them by.
    async fn store(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn store(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        Ok(self.store_bytes(name, bytes))
    }
}

/// An upload in flight. `target` is `None` for a brand-new library entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTicket {
    pub name: String,
    pub target: Option<PendingTarget>,
}

impl UploadTicket {
    pub async fn run<S: AssetStore + ?Sized>(
        &self,
        store: &S,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        store.store(&self.name, bytes).await
    }
}
