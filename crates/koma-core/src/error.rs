use crate::id::{AssetId, ObjectId};

/// Errors from scene-graph operations.
///
/// Geometry violations are never errors (they are clamped) and history
/// underflow is a no-op; what remains are missing targets and refused
/// deletions.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("unknown episode {0}")]
    UnknownEpisode(ObjectId),

    #[error("unknown page {0}")]
    UnknownPage(ObjectId),

    #[error("unknown panel {0}")]
    UnknownPanel(ObjectId),

    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    #[error("asset {asset} is still placed {placements} time(s)")]
    AssetInUse { asset: AssetId, placements: usize },

    #[error("grouping needs at least two objects in the same panel")]
    InvalidGroup,

    #[error("no active panel")]
    NoActivePanel,
}

/// Errors from saving or loading a document snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("json snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Errors from loading a `ComposerConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T, E = ComposeError> = std::result::Result<T, E>;
