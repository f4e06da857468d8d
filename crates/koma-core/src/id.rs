use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for object IDs: fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity of every entity in a composer document: episodes, pages,
/// panels, scenes, bubbles, text elements, placements, assets, groups.
///
/// Internally a 4-byte `Spur` index with O(1) equality and hashing. Ids are
/// unique across the whole document, not per panel, so a clipboard can
/// carry objects between panels without remapping collisions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Spur);

pub type EpisodeId = ObjectId;
pub type PageId = ObjectId;
pub type PanelId = ObjectId;
pub type AssetId = ObjectId;
pub type GroupId = ObjectId;

impl ObjectId {
    /// Intern a string as an ObjectId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        ObjectId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a fresh id with a kind prefix (e.g. `bubble_3`, `panel_12`).
    ///
    /// Candidates that were already interned (typically ids read back from
    /// a saved snapshot) are skipped, so a fresh id never aliases a live one.
    pub fn with_prefix(prefix: &str) -> Self {
        loop {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{prefix}_{n}");
            if INTERNER.get(&candidate).is_none() {
                return Self::intern(&candidate);
            }
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ObjectId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ObjectId::intern("bubble_hero");
        let b = ObjectId::intern("bubble_hero");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "bubble_hero");
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = ObjectId::with_prefix("bubble");
        let b = ObjectId::with_prefix("bubble");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("bubble_"));
    }

    #[test]
    fn prefixed_ids_skip_loaded_names() {
        // Pretend a snapshot already holds the next few candidates.
        let next = COUNTER.load(Ordering::Relaxed);
        for n in next..next + 4 {
            ObjectId::intern(&format!("text_{n}"));
        }
        let fresh = ObjectId::with_prefix("text");
        let suffix: u64 = fresh.as_str()["text_".len()..].parse().unwrap();
        assert!(suffix >= next + 4);
    }
}
