pub mod config;
pub mod error;
pub mod geometry;
pub mod id;
pub mod layout;
pub mod model;
pub mod scene;
pub mod seed;
pub mod shape;
pub mod snapshot;

pub use config::ComposerConfig;
pub use error::{ComposeError, ConfigError, SnapshotError};
pub use geometry::{MinSize, Rect, Viewport};
pub use id::{AssetId, EpisodeId, GroupId, ObjectId, PageId, PanelId};
pub use model::*;
pub use scene::{AssetInit, BubbleInit, HistoryState, PanelStep, SceneGraph, TextInit};
pub use shape::{BubbleShape, LayerPaint, LayerRole, ShapeLayer};
