//! Filesystem image source.

use async_trait::async_trait;
use koma_render::{ImageError, ImageSource};
use std::path::{Component, Path, PathBuf};

/// Resolves content references as paths below a root directory.
///
/// A `file://` prefix is accepted and stripped. References that would
/// escape the root are reported as not found.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let relative = Path::new(reference.strip_prefix("file://").unwrap_or(reference));
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ImageSource for FileSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ImageError> {
        let path = self
            .resolve(reference)
            .ok_or_else(|| ImageError::NotFound(reference.to_owned()))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ImageError::NotFound(reference.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
