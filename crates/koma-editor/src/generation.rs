//! Scene-generation collaborator seam.
//!
//! Generation is a two-phase exchange around an opaque async call:
//!
//! 1. `begin` marks the target pending and hands out a ticket
//! 2. the host awaits [`SceneGenerator`] without holding the composer
//! 3. `complete` clears the pending mark and writes the result if the
//!    target still exists
//!
//! Pending state is keyed by target, so editing continues elsewhere while
//! a request is in flight. There is no cancellation; a completion for a
//! deleted target is dropped.

use async_trait::async_trait;
use koma_core::geometry::Rect;
use koma_core::model::SceneLayout;
use koma_core::{AssetId, ObjectId, PanelId};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Failed(String),

    #[error("{0:?} already has a request in flight")]
    Busy(PendingTarget),

    #[error("unknown panel: {0}")]
    UnknownPanel(PanelId),

    #[error("unknown scene {scene} in panel {panel}")]
    UnknownScene { panel: PanelId, scene: ObjectId },

    #[error("expected {expected} output")]
    UnexpectedOutput { expected: &'static str },
}

/// What an in-flight async operation will write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingTarget {
    Panel(PanelId),
    Scene { panel: PanelId, scene: ObjectId },
    Asset(AssetId),
}

/// Targets with a request in flight.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    targets: HashSet<PendingTarget>,
}

impl PendingSet {
    /// Mark `target` pending. `false` if it already was.
    pub fn begin(&mut self, target: PendingTarget) -> bool {
        self.targets.insert(target)
    }

    pub fn finish(&mut self, target: PendingTarget) {
        self.targets.remove(&target);
    }

    pub fn is_pending(&self, target: PendingTarget) -> bool {
        self.targets.contains(&target)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenerationMode {
    /// One script for the whole panel.
    Single,
    /// Split the panel into `count` scenes arranged by `layout`.
    Multi { count: usize, layout: SceneLayout },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub panel: PanelId,
    pub prompt: String,
    pub mode: GenerationMode,
}

/// One scene proposed by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDraft {
    pub description: String,
    /// Placement inside the panel; `None` lets the layout decide.
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    Single {
        dialogue: String,
        stage_direction: String,
    },
    Multi(Vec<SceneDraft>),
}

/// Request for one scene's raster.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneImageRequest {
    pub panel: PanelId,
    pub scene: ObjectId,
    pub description: String,
}

/// The AI collaborator. Both calls are opaque and may fail.
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError>;

    /// Produce a raster for a scene and return its content reference.
    async fn paint_scene(&self, request: SceneImageRequest) -> Result<String, GenerationError>;
}

/// Proof that a generation was begun. Consumed by completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    pub request: GenerationRequest,
}

impl GenerationTicket {
    pub fn target(&self) -> PendingTarget {
        PendingTarget::Panel(self.request.panel)
    }

    /// Run the collaborator call for this ticket.
    pub async fn run<G: SceneGenerator + ?Sized>(
        &self,
        generator: &G,
    ) -> Result<GenerationOutput, GenerationError> {
        generator.generate(self.request.clone()).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneImageTicket {
    pub request: SceneImageRequest,
}

impl SceneImageTicket {
    pub fn target(&self) -> PendingTarget {
        PendingTarget::Scene {
            panel: self.request.panel,
            scene: self.request.scene,
        }
    }

    pub async fn run<G: SceneGenerator + ?Sized>(
        &self,
        generator: &G,
    ) -> Result<String, GenerationError> {
        generator.paint_scene(self.request.clone()).await
    }
}
