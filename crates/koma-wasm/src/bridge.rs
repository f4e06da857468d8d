//! JSON and string plumbing between the page and the composer.
//!
//! Everything here is plain Rust so it can be tested off the browser.

use koma_core::geometry::Rect;
use koma_core::model::{Color, FontSizePolicy, ObjectPatch};
use koma_editor::{
    GenerationError, GenerationOutput, GenerationTicket, SceneDraft, SceneImageTicket,
    StorageError, ToolKind, UploadTicket,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Parse a snake_case enum name the way snapshots spell it.
pub fn parse_enum<T: DeserializeOwned>(name: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(name.to_owned())).ok()
}

pub fn tool_from_name(name: &str) -> ToolKind {
    match name {
        "bubble" => ToolKind::Bubble,
        "text" => ToolKind::Text,
        "asset" => ToolKind::Asset,
        "mask" => ToolKind::Mask,
        _ => ToolKind::Select,
    }
}

pub fn tool_name(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::Select => "select",
        ToolKind::Bubble => "bubble",
        ToolKind::Text => "text",
        ToolKind::Asset => "asset",
        ToolKind::Mask => "mask",
    }
}

/// Build a single-attribute patch from a properties-panel edit.
/// `None` when the key is unknown or the value does not parse.
pub fn patch_for(key: &str, value: &str) -> Option<ObjectPatch> {
    let mut patch = ObjectPatch::default();
    let number = || value.trim().parse::<f32>().ok().filter(|v| v.is_finite());
    let flag = || value.trim().parse::<bool>().ok();
    match key {
        "x" => patch.x = Some(number()?),
        "y" => patch.y = Some(number()?),
        "width" => patch.width = Some(number()?),
        "height" => patch.height = Some(number()?),
        "rotation" => patch.rotation = Some(number()?),
        "flipH" => patch.flip_h = Some(flag()?),
        "flipV" => patch.flip_v = Some(flag()?),
        "hidden" => patch.hidden = Some(flag()?),
        "inverted" => patch.inverted = Some(flag()?),
        "text" => patch.text = Some(value.to_owned()),
        "bubbleType" => patch.bubble_type = Some(parse_enum(value)?),
        "tail" => {
            patch.tail = Some(match value {
                "" | "none" => None,
                name => Some(parse_enum(name)?),
            })
        }
        "fontSize" => {
            patch.font_size = Some(match value {
                "" | "auto" => FontSizePolicy::Auto,
                _ => FontSizePolicy::Fixed(number()?),
            })
        }
        "color" => patch.color = Some(Color::from_hex(value)?),
        "background" => {
            patch.background = Some(match value {
                "" | "none" => None,
                hex => Some(Color::from_hex(hex)?),
            })
        }
        "zIndex" => {
            patch.z_index = Some(match value.trim() {
                "" => None,
                n => Some(n.parse().ok()?),
            })
        }
        _ => return None,
    }
    Some(patch)
}

// ─── Collaborator results ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SceneJson {
    pub description: String,
    #[serde(default)]
    pub rect: Option<Rect>,
}

/// What the page posts back after a generation call.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GeneratedJson {
    Failed {
        error: String,
    },
    Scenes {
        scenes: Vec<SceneJson>,
    },
    Script {
        dialogue: String,
        #[serde(default)]
        stage_direction: String,
    },
}

impl GeneratedJson {
    pub fn into_result(self) -> Result<GenerationOutput, GenerationError> {
        match self {
            GeneratedJson::Failed { error } => Err(GenerationError::Failed(error)),
            GeneratedJson::Scenes { scenes } => Ok(GenerationOutput::Multi(
                scenes
                    .into_iter()
                    .map(|s| SceneDraft {
                        description: s.description,
                        rect: s.rect,
                    })
                    .collect(),
            )),
            GeneratedJson::Script {
                dialogue,
                stage_direction,
            } => Ok(GenerationOutput::Single {
                dialogue,
                stage_direction,
            }),
        }
    }
}

/// Parse a generation result; malformed JSON counts as a failed call.
pub fn parse_generated(json: &str) -> Result<GenerationOutput, GenerationError> {
    match serde_json::from_str::<GeneratedJson>(json) {
        Ok(parsed) => parsed.into_result(),
        Err(e) => Err(GenerationError::Failed(format!("malformed result: {e}"))),
    }
}

/// A reference on success, the error text otherwise.
pub fn reference_result(reference: &str, error: &str) -> Result<String, String> {
    if error.is_empty() && !reference.is_empty() {
        Ok(reference.to_owned())
    } else if error.is_empty() {
        Err("empty result".to_owned())
    } else {
        Err(error.to_owned())
    }
}

pub fn storage_result(reference: &str, error: &str) -> Result<String, StorageError> {
    reference_result(reference, error).map_err(StorageError::Rejected)
}

// ─── Tickets ─────────────────────────────────────────────────────────────

/// Work handed to the page, waiting for its completion call.
#[derive(Debug)]
pub enum Ticket {
    Generation(GenerationTicket),
    SceneImage(SceneImageTicket),
    Upload(UploadTicket),
}

/// Open tickets by number. Numbers are never reused.
#[derive(Debug, Default)]
pub struct Tickets {
    open: HashMap<u32, Ticket>,
    next: u32,
}

impl Tickets {
    pub fn issue(&mut self, ticket: Ticket) -> u32 {
        self.next += 1;
        self.open.insert(self.next, ticket);
        self.next
    }

    pub fn take(&mut self, number: u32) -> Option<Ticket> {
        self.open.remove(&number)
    }

    /// Return a ticket taken by mistake, e.g. completed through the wrong
    /// call.
    pub fn put_back(&mut self, number: u32, ticket: Ticket) {
        self.open.insert(number, ticket);
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use koma_core::model::{BubbleType, TailDirection};
    use pretty_assertions::assert_eq;

    #[test]
    fn patches_parse_typed_values() {
        assert_eq!(patch_for("rotation", "45").unwrap().rotation, Some(45.0));
        assert_eq!(patch_for("bubbleType", "shout").unwrap().bubble_type, Some(BubbleType::Shout));
        assert_eq!(
            patch_for("tail", "bottom_right").unwrap().tail,
            Some(Some(TailDirection::BottomRight))
        );
        assert_eq!(patch_for("tail", "none").unwrap().tail, Some(None));
        assert_eq!(patch_for("fontSize", "auto").unwrap().font_size, Some(FontSizePolicy::Auto));
        assert_eq!(
            patch_for("fontSize", "18").unwrap().font_size,
            Some(FontSizePolicy::Fixed(18.0))
        );
        assert_eq!(patch_for("zIndex", "").unwrap().z_index, Some(None));
    }

    #[test]
    fn bad_patches_are_rejected() {
        assert!(patch_for("width", "wide").is_none());
        assert!(patch_for("width", "NaN").is_none());
        assert!(patch_for("bubbleType", "triangle").is_none());
        assert!(patch_for("opacity", "1").is_none());
    }

    #[test]
    fn generation_json_shapes() {
        let single = parse_generated(r#"{"dialogue":"Hi","stage_direction":"Wave."}"#);
        assert_eq!(
            single,
            Ok(GenerationOutput::Single {
                dialogue: "Hi".into(),
                stage_direction: "Wave.".into()
            })
        );

        let multi = parse_generated(
            r#"{"scenes":[
                {"description":"a"},
                {"description":"b","rect":{"x":0,"y":0,"width":10,"height":10}}
            ]}"#,
        )
        .unwrap();
        let GenerationOutput::Multi(drafts) = multi else {
            panic!("expected scenes");
        };
        assert_eq!(drafts[0].rect, None);
        assert_eq!(drafts[1].rect, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));

        assert_eq!(
            parse_generated(r#"{"error":"busy"}"#),
            Err(GenerationError::Failed("busy".into()))
        );
        assert!(parse_generated("not json").is_err());
    }

    #[test]
    fn reference_needs_content_and_no_error() {
        assert_eq!(reference_result("mem://1/a.png", ""), Ok("mem://1/a.png".to_owned()));
        assert!(reference_result("", "").is_err());
        assert_eq!(reference_result("x", "denied"), Err("denied".to_owned()));
    }

    #[test]
    fn ticket_numbers_are_unique() {
        let mut tickets = Tickets::default();
        let upload = || {
            Ticket::Upload(UploadTicket {
                name: "a".into(),
                target: None,
            })
        };
        let a = tickets.issue(upload());
        let b = tickets.issue(upload());
        assert_ne!(a, b);
        assert!(tickets.take(a).is_some());
        assert!(tickets.take(a).is_none());
        assert_eq!(tickets.len(), 1);
    }
}
