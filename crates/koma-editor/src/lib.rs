pub mod clipboard;
pub mod composer;
pub mod generation;
pub mod gesture;
pub mod history;
pub mod input;
pub mod resize;
pub mod shortcuts;
pub mod snap;
pub mod tools;
pub mod upload;

pub use clipboard::Clipboard;
pub use composer::{Composer, UploadOutcome, View};
pub use generation::{
    GenerationError, GenerationMode, GenerationOutput, GenerationRequest, GenerationTicket,
    PendingTarget, SceneDraft, SceneGenerator, SceneImageRequest, SceneImageTicket,
};
pub use gesture::{Gesture, GestureKind};
pub use history::{MaskHistory, SnapshotStack};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use resize::{Handle, ResizeHandle};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use snap::{Guide, GuideAxis};
pub use tools::{MaskMode, ToolKind};
pub use upload::{AssetStore, StorageError, UploadTicket};
