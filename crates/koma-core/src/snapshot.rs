//! Document snapshots.
//!
//! The whole [`SceneGraph`] (panels, objects, assets, groups, masks)
//! round-trips losslessly through JSON or MessagePack. The selection and
//! the active config are session state and are not saved.

use crate::error::SnapshotError;
use crate::scene::SceneGraph;

impl SceneGraph {
    /// Human-readable snapshot.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let graph: SceneGraph = serde_json::from_str(json)?;
        log::debug!("loaded json snapshot ({} bytes)", json.len());
        Ok(graph)
    }

    /// Compact binary snapshot. Structs are written as maps so optional
    /// fields added later still load.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let graph: SceneGraph = rmp_serde::from_slice(bytes)?;
        log::debug!("loaded msgpack snapshot ({} bytes)", bytes.len());
        Ok(graph)
    }
}
