//! Tool selection.
//!
//! The active tool decides which objects a pointer-down may grab and
//! whether the canvas is painted instead.

use koma_core::model::ObjectKind;

/// The active tool determines how pointer input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Bubble,
    Text,
    Asset,
    Mask,
}

impl ToolKind {
    /// Whether a pointer-down with this tool may grab an object of `kind`.
    /// `Select` grabs anything; the mask tool grabs nothing.
    pub fn grabs(self, kind: ObjectKind) -> bool {
        match self {
            ToolKind::Select => true,
            ToolKind::Bubble => kind == ObjectKind::Bubble,
            ToolKind::Text => kind == ObjectKind::Text,
            ToolKind::Asset => kind == ObjectKind::Asset,
            ToolKind::Mask => false,
        }
    }
}

/// Mask tool sub-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    #[default]
    Brush,
    Eraser,
}

impl MaskMode {
    pub fn toggled(self) -> Self {
        match self {
            MaskMode::Brush => MaskMode::Eraser,
            MaskMode::Eraser => MaskMode::Brush,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_grab_their_own_kind() {
        assert!(ToolKind::Select.grabs(ObjectKind::Asset));
        assert!(ToolKind::Bubble.grabs(ObjectKind::Bubble));
        assert!(!ToolKind::Bubble.grabs(ObjectKind::Text));
        assert!(!ToolKind::Mask.grabs(ObjectKind::Bubble));
    }
}
