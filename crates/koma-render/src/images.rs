//! Decoded raster cache and the image-fetch seam.
//!
//! Decoding is the only suspension point of the render pipeline: images
//! are fetched and decoded up front, after which compositing reads the
//! cache synchronously. A reference that is missing from the cache simply
//! draws nothing.

use koma_core::{PanelId, SceneGraph};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tiny_skia::{ColorU8, Pixmap};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has zero size")]
    Empty,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode task failed: {0}")]
    Task(String),
}

/// Where raster bytes come from, keyed by content reference.
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ImageError>;
}

/// In-memory content store. Serves as an [`ImageSource`] and, through the
/// editor's upload seam, as an asset store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    counter: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: &str, bytes: Vec<u8>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(reference.to_owned(), bytes);
    }

    /// Store bytes under a fresh `mem://` reference derived from `name`.
    pub fn store_bytes(&self, name: &str, bytes: Vec<u8>) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let reference = format!("mem://{n}/{name}");
        self.insert(&reference, bytes);
        reference
    }

    pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(reference).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ImageSource for MemoryStore {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ImageError> {
        self.get(reference)
            .ok_or_else(|| ImageError::NotFound(reference.to_owned()))
    }
}

/// Decode PNG/JPEG/WebP bytes into a premultiplied pixmap.
pub fn decode(bytes: &[u8]) -> Result<Pixmap, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut pixmap = Pixmap::new(w, h).ok_or(ImageError::Empty)?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Decoded images by content reference.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    images: HashMap<String, Pixmap>,
}

impl ImageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: &str, pixmap: Pixmap) {
        self.images.insert(reference.to_owned(), pixmap);
    }

    /// Decode synchronously and cache. For hosts without a blocking pool.
    pub fn insert_encoded(&mut self, reference: &str, bytes: &[u8]) -> Result<(), ImageError> {
        let pixmap = decode(bytes)?;
        self.insert(reference, pixmap);
        Ok(())
    }

    pub fn get(&self, reference: &str) -> Option<&Pixmap> {
        self.images.get(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.images.contains_key(reference)
    }

    pub fn remove(&mut self, reference: &str) -> Option<Pixmap> {
        self.images.remove(reference)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Fetch and decode one reference unless it is already cached.
    /// Decoding runs on the blocking pool.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn load<S: ImageSource + ?Sized>(
        &mut self,
        source: &S,
        reference: &str,
    ) -> Result<(), ImageError> {
        if self.contains(reference) {
            return Ok(());
        }
        let bytes = source.fetch(reference).await?;
        let pixmap = tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|e| ImageError::Task(e.to_string()))??;
        log::debug!("decoded {reference} ({}x{})", pixmap.width(), pixmap.height());
        self.insert(reference, pixmap);
        Ok(())
    }

    /// Load every reference, continuing past failures. Failed references
    /// stay uncached and render as nothing; they are returned for
    /// reporting.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn load_all<S: ImageSource + ?Sized>(
        &mut self,
        source: &S,
        references: &[String],
    ) -> Vec<(String, ImageError)> {
        let mut failures = Vec::new();
        for reference in references {
            if let Err(e) = self.load(source, reference).await {
                log::warn!("could not load {reference}: {e}");
                failures.push((reference.clone(), e));
            }
        }
        failures
    }
}

/// Every raster reference the given panels draw: backgrounds, scene
/// images and placed assets. Deduplicated, in first-use order.
pub fn image_refs(graph: &SceneGraph, panels: &[PanelId]) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut push = |r: &str| {
        if !refs.iter().any(|x| x == r) {
            refs.push(r.to_owned());
        }
    };
    for &panel_id in panels {
        let Some(panel) = graph.panel(panel_id) else {
            continue;
        };
        if let Some(bg) = &panel.background {
            push(bg.as_str());
        }
        for scene in &panel.scenes {
            if let Some(img) = &scene.image {
                push(img.as_str());
            }
        }
        for object in graph.objects_in_panel(panel_id) {
            if let Some(placement) = object.as_asset()
                && let Some(asset) = graph.asset(placement.asset_id)
            {
                push(asset.source.as_str());
            }
        }
    }
    refs
}
