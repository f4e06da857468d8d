//! WASM bridge for Koma: exposes the panel composer to the browser page.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the
//! `<canvas>`, forwards pointer, wheel and key events, and runs the slow
//! collaborator calls (scene generation, uploads) itself. Those calls are
//! begun here, which hands out a ticket number, and completed here by the
//! same number once the page has the result.

mod bridge;
mod overlay;

use bridge::{Ticket, Tickets};
use koma_core::model::{Color, HasGeometry, SceneLayout, SizePreset};
use koma_core::scene::{AssetInit, BubbleInit, PanelStep, TextInit};
use koma_core::{ComposerConfig, ObjectId, SceneGraph};
use koma_editor::resize::{HANDLE_TOLERANCE, Handle, handle_at};
use koma_editor::{
    Composer, GenerationMode, InputEvent, MaskMode, Modifiers, PointerButton, ShortcutAction,
    ShortcutMap, UploadOutcome,
};
use koma_render::{Compositor, ExportOptions, FontBook, ImageCache, export_page, export_panel};
use serde_json::json;
use tiny_skia::{Pixmap, Transform};
use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, ImageData};

/// The WASM-facing composer controller.
///
/// Holds the composer, the fonts and decoded images the compositor draws
/// with, and the tickets of collaborator calls the page is running.
#[wasm_bindgen]
pub struct KomaCanvas {
    composer: Composer,
    fonts: FontBook,
    images: ImageCache,
    tickets: Tickets,
    width: f64,
    height: f64,
    /// `false` = light (default), `true` = dark.
    dark_mode: bool,
}

#[wasm_bindgen]
impl KomaCanvas {
    /// Create a controller with an empty one-panel document.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let mut graph = SceneGraph::new();
        let episode = graph.add_episode("Episode 1");
        if let Ok(page) = graph.add_page(episode) {
            let _ = graph.add_panel(page, SizePreset::Wide);
        }
        let mut composer = Composer::new(graph);
        composer.set_screen_size(width as f32, height as f32);

        Self {
            composer,
            fonts: FontBook::new(),
            images: ImageCache::new(),
            tickets: Tickets::default(),
            width,
            height,
            dark_mode: false,
        }
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// Replace the document with a JSON snapshot. History is reset.
    pub fn load_json(&mut self, json: &str) -> bool {
        self.load(SceneGraph::from_json(json))
    }

    /// The document as a JSON snapshot, or an empty string on failure.
    pub fn save_json(&self) -> String {
        self.composer.graph().to_json().unwrap_or_else(|e| {
            log::warn!("json snapshot failed: {e}");
            String::new()
        })
    }

    pub fn load_msgpack(&mut self, bytes: &[u8]) -> bool {
        self.load(SceneGraph::from_msgpack(bytes))
    }

    pub fn save_msgpack(&self) -> Vec<u8> {
        self.composer.graph().to_msgpack().unwrap_or_else(|e| {
            log::warn!("msgpack snapshot failed: {e}");
            Vec::new()
        })
    }

    /// Apply a (partial) JSON config. Reloads the document, so history is
    /// reset.
    pub fn set_config_json(&mut self, json: &str) -> bool {
        match ComposerConfig::from_json(json) {
            Ok(config) => {
                let mut graph = self.composer.graph().clone();
                graph.set_config(config);
                self.replace_graph(graph);
                true
            }
            Err(e) => {
                log::warn!("config rejected: {e}");
                false
            }
        }
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Rasterize the active panel and draw the editing chrome on top.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let theme = if self.dark_mode {
            overlay::OverlayTheme::dark()
        } else {
            overlay::OverlayTheme::light()
        };
        let (w, h) = (self.width.max(1.0) as u32, self.height.max(1.0) as u32);
        let Some(mut pixmap) = Pixmap::new(w, h) else {
            return;
        };
        if let Some(bg) = Color::from_hex(theme.bg) {
            let [r, g, b, a] = bg.to_rgba8();
            pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
        }

        if let Some(panel) = self.composer.active_panel() {
            let view = self.composer.view();
            let base =
                Transform::from_row(view.zoom, 0.0, 0.0, view.zoom, view.offset_x, view.offset_y);
            let compositor = self.compositor();
            if let Err(e) = compositor.draw_panel(&mut pixmap, self.composer.graph(), panel, base) {
                log::warn!("render failed: {e}");
            }
        }

        let data = unpremultiply(&pixmap);
        match ImageData::new_with_u8_clamped_array_and_sh(Clamped(data.as_slice()), w, h) {
            Ok(image) => {
                let _ = ctx.put_image_data(&image, 0.0, 0.0);
            }
            Err(_) => log::warn!("ImageData {w}x{h} rejected"),
        }
        overlay::draw(ctx, &self.composer, &theme);
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_mode = is_dark;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.composer.set_screen_size(width as f32, height as f32);
    }

    /// Register a font family for bubble and text rendering.
    pub fn register_font(&mut self, family: &str, bytes: Vec<u8>, bold: bool) -> bool {
        let result = if bold {
            self.fonts.register_bold(family, bytes)
        } else {
            self.fonts.register(family, bytes)
        };
        result.inspect_err(|e| log::warn!("font {family}: {e}")).is_ok()
    }

    /// Decode image bytes fetched by the page and cache them under the
    /// content reference the document uses.
    pub fn insert_image(&mut self, reference: &str, bytes: &[u8]) -> bool {
        self.images
            .insert_encoded(reference, bytes)
            .inspect_err(|e| log::warn!("image {reference}: {e}"))
            .is_ok()
    }

    /// Content references drawn by the active page that are not cached
    /// yet, as a JSON array. The page fetches these and calls
    /// `insert_image`.
    pub fn missing_images(&self) -> String {
        let graph = self.composer.graph();
        let panels: Vec<ObjectId> = self
            .composer
            .active_panel()
            .and_then(|p| graph.panel(p))
            .map(|p| graph.panels_of(p.page_id).iter().map(|s| s.id).collect())
            .unwrap_or_default();
        let missing: Vec<String> = koma_render::image_refs(graph, &panels)
            .into_iter()
            .filter(|r| !self.images.contains(r))
            .collect();
        json!(missing).to_string()
    }

    /// Export one panel as PNG bytes. Empty on failure.
    pub fn export_panel_png(&self, panel_id: &str, scale: f32) -> Vec<u8> {
        let options = export_options(scale, self.composer.config());
        let panel = ObjectId::intern(panel_id);
        export_panel(&self.compositor(), self.composer.graph(), panel, &options)
            .and_then(|image| image.encode_png())
            .unwrap_or_else(|e| {
                log::warn!("panel export failed: {e}");
                Vec::new()
            })
    }

    /// Export a whole page, panels stacked with gutters, as PNG bytes.
    pub fn export_page_png(&self, page_id: &str, scale: f32) -> Vec<u8> {
        let options = export_options(scale, self.composer.config());
        export_page(&self.compositor(), self.composer.graph(), ObjectId::intern(page_id), &options)
            .and_then(|image| image.encode_png())
            .unwrap_or_else(|e| {
                log::warn!("page export failed: {e}");
                Vec::new()
            })
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Handle pointer down. `button` is `PointerEvent.button`. Returns
    /// `true` if a redraw is needed.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.composer.handle(&InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    pub fn handle_pointer_move(
        &mut self,
        x: f32,
        y: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.composer.handle(&InputEvent::PointerMove {
            x,
            y,
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32) -> bool {
        self.composer.handle(&InputEvent::PointerUp { x, y })
    }

    pub fn handle_pointer_leave(&mut self) -> bool {
        self.composer.handle(&InputEvent::PointerLeave)
    }

    /// Wheel zoom around the pointer. Negative `delta` zooms in.
    pub fn handle_wheel(&mut self, x: f32, y: f32, delta: f32) -> bool {
        self.composer.handle(&InputEvent::Wheel { x, y, delta })
    }

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool, "action":"<action_name>", "tool":"<tool_name>"}`
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_text_input: bool,
    ) -> String {
        let tool = bridge::tool_name(self.composer.tool());
        let action = if in_text_input {
            None
        } else {
            ShortcutMap::resolve(key, ctrl, shift, alt, meta)
        };
        let Some(action) = action else {
            return json!({ "changed": false, "action": "none", "tool": tool }).to_string();
        };
        let changed = self.composer.apply_shortcut(action);
        json!({
            "changed": changed,
            "action": action_to_name(action),
            "tool": bridge::tool_name(self.composer.tool()),
        })
        .to_string()
    }

    /// CSS cursor for the pointer at screen `(x, y)`.
    pub fn cursor_at(&self, x: f32, y: f32) -> String {
        let graph = self.composer.graph();
        let &[id] = graph.selection() else {
            return "default".into();
        };
        let Some(object) = graph.object(id) else {
            return "default".into();
        };
        let (px, py) = self.composer.screen_to_panel(x, y);
        let tolerance = HANDLE_TOLERANCE / self.composer.view().zoom;
        match handle_at(object.geometry(), px, py, tolerance) {
            Some(Handle::Rotate) => "grab".into(),
            Some(Handle::Resize(handle)) => handle.cursor().into(),
            None => "default".into(),
        }
    }

    // ─── Tools & view ────────────────────────────────────────────────────

    pub fn set_tool(&mut self, name: &str) {
        self.composer.set_tool(bridge::tool_from_name(name));
    }

    pub fn get_tool_name(&self) -> String {
        bridge::tool_name(self.composer.tool()).to_string()
    }

    pub fn set_eraser(&mut self, eraser: bool) {
        self.composer
            .set_mask_mode(if eraser { MaskMode::Eraser } else { MaskMode::Brush });
    }

    pub fn zoom(&self) -> f32 {
        self.composer.view().zoom
    }

    pub fn reset_zoom(&mut self) {
        self.composer.reset_zoom();
    }

    // ─── Panels ──────────────────────────────────────────────────────────

    pub fn get_active_panel(&self) -> String {
        self.composer
            .active_panel()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn set_active_panel(&mut self, panel_id: &str) -> bool {
        self.composer.set_active_panel(ObjectId::intern(panel_id))
    }

    /// Panels of the active page as a JSON array, in order.
    pub fn panels_json(&self) -> String {
        let graph = self.composer.graph();
        let active = self.composer.active_panel();
        let panels: Vec<serde_json::Value> = active
            .and_then(|p| graph.panel(p))
            .map(|p| graph.panels_of(p.page_id))
            .unwrap_or_default()
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id.as_str(),
                    "order": p.order,
                    "height": p.height,
                    "preset": p.size_preset,
                    "active": Some(p.id) == active,
                    "scenes": p.scenes.len(),
                })
            })
            .collect();
        serde_json::Value::Array(panels).to_string()
    }

    /// Add a panel to the active page. Returns its id or an empty string.
    pub fn add_panel(&mut self, preset: &str) -> String {
        let graph = self.composer.graph();
        let Some(page) = self
            .composer
            .active_panel()
            .and_then(|p| graph.panel(p))
            .map(|p| p.page_id)
        else {
            return String::new();
        };
        let preset = bridge::parse_enum(preset).unwrap_or_default();
        self.composer
            .add_panel(page, preset)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn delete_panel(&mut self, panel_id: &str) -> bool {
        self.composer.delete_panel(ObjectId::intern(panel_id)).is_ok()
    }

    /// Move the active panel one place up or down.
    pub fn move_active_panel(&mut self, up: bool) -> bool {
        let step = if up { PanelStep::Up } else { PanelStep::Down };
        self.composer.reorder_active_panel(step).unwrap_or(false)
    }

    pub fn set_panel_height(&mut self, panel_id: &str, height: f32) -> bool {
        self.composer
            .set_panel_height(ObjectId::intern(panel_id), height)
            .is_ok()
    }

    // ─── Objects ─────────────────────────────────────────────────────────

    /// Add a bubble of `bubble_type` (snake_case) to the active panel.
    /// Returns its id or an empty string.
    pub fn add_bubble(&mut self, bubble_type: &str, text: &str) -> String {
        let init = BubbleInit {
            bubble_type: bridge::parse_enum(bubble_type).unwrap_or_default(),
            text: text.to_owned(),
            ..Default::default()
        };
        self.composer
            .add_bubble(init)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn add_text(&mut self, text: &str) -> String {
        let init = TextInit {
            text: text.to_owned(),
            ..Default::default()
        };
        self.composer
            .add_text(init)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// Place a library asset. Pass `0` for an unknown natural size.
    pub fn place_asset(
        &mut self,
        asset_id: &str,
        natural_width: f32,
        natural_height: f32,
    ) -> String {
        let natural_size = (natural_width > 0.0 && natural_height > 0.0)
            .then_some((natural_width, natural_height));
        let init = AssetInit {
            asset_id: ObjectId::intern(asset_id),
            natural_size,
        };
        self.composer
            .place_asset(init)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// Get all selected object ids as a JSON array.
    pub fn get_selected_ids(&self) -> String {
        let ids: Vec<&str> = self
            .composer
            .graph()
            .selection()
            .iter()
            .map(|id| id.as_str())
            .collect();
        json!(ids).to_string()
    }

    /// Select an object by id; an empty id clears the selection.
    pub fn select_by_id(&mut self, object_id: &str) -> bool {
        if object_id.is_empty() {
            self.composer.clear_selection();
            return true;
        }
        self.composer.select_object(ObjectId::intern(object_id))
    }

    /// The single selected object as JSON, or `{}`.
    pub fn get_selected_props(&self) -> String {
        let graph = self.composer.graph();
        match graph.selection() {
            [id] => graph
                .object(*id)
                .and_then(|o| serde_json::to_string(o).ok())
                .unwrap_or_else(|| "{}".to_string()),
            _ => "{}".to_string(),
        }
    }

    /// Set one property on the single selected object.
    pub fn set_object_prop(&mut self, key: &str, value: &str) -> bool {
        let &[id] = self.composer.graph().selection() else {
            return false;
        };
        let Some(patch) = bridge::patch_for(key, value) else {
            log::debug!("ignored prop {key}={value}");
            return false;
        };
        self.composer.update_object(id, &patch).is_ok()
    }

    pub fn set_hidden(&mut self, object_id: &str, hidden: bool) -> bool {
        self.composer
            .set_hidden(ObjectId::intern(object_id), hidden)
            .is_ok()
    }

    pub fn delete_selected(&mut self) -> bool {
        self.composer.delete_selected() > 0
    }

    pub fn duplicate_selected(&mut self) -> bool {
        !self.composer.duplicate_selected().is_empty()
    }

    pub fn group_selected(&mut self, name: &str) -> String {
        self.composer
            .group_selection(name)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn ungroup_selected(&mut self) -> bool {
        self.composer.ungroup_selection() > 0
    }

    pub fn undo(&mut self) -> bool {
        self.composer.apply_shortcut(ShortcutAction::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.composer.apply_shortcut(ShortcutAction::Redo)
    }

    pub fn can_undo(&self) -> bool {
        self.composer.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.composer.can_redo()
    }

    pub fn clear_mask(&mut self) -> bool {
        self.composer.clear_mask()
    }

    // ─── Asset library ───────────────────────────────────────────────────

    pub fn assets_json(&self) -> String {
        let graph = self.composer.graph();
        let assets: Vec<serde_json::Value> = graph
            .assets()
            .iter()
            .map(|a| {
                json!({
                    "id": a.id.as_str(),
                    "name": a.name,
                    "source": a.source,
                    "placements": graph.placements_of(a.id),
                })
            })
            .collect();
        serde_json::Value::Array(assets).to_string()
    }

    /// Remove a library entry. Refused while it is still placed.
    pub fn remove_asset(&mut self, asset_id: &str) -> bool {
        self.composer
            .remove_asset_entry(ObjectId::intern(asset_id))
            .inspect_err(|e| log::warn!("{e}"))
            .is_ok()
    }

    // ─── Collaborators ───────────────────────────────────────────────────

    /// Start a generation for a panel. `count` > 1 asks for that many
    /// scenes laid out by `layout`. Returns
    /// `{"ticket":n,"panel":..,"prompt":..,"count":..}` or `{"error":..}`.
    pub fn begin_generation(
        &mut self,
        panel_id: &str,
        prompt: &str,
        count: u32,
        layout: &str,
    ) -> String {
        let mode = if count > 1 {
            GenerationMode::Multi {
                count: count as usize,
                layout: bridge::parse_enum::<SceneLayout>(layout).unwrap_or_default(),
            }
        } else {
            GenerationMode::Single
        };
        match self.composer.begin_generation(ObjectId::intern(panel_id), prompt, mode) {
            Ok(ticket) => {
                let body = json!({
                    "panel": panel_id,
                    "prompt": prompt,
                    "count": count.max(1),
                });
                let number = self.tickets.issue(Ticket::Generation(ticket));
                with_ticket(number, body)
            }
            Err(e) => error_json(&e),
        }
    }

    /// Number of begun calls still waiting for completion.
    pub fn open_tickets(&self) -> u32 {
        self.tickets.len() as u32
    }

    /// Complete a generation with the page's JSON result:
    /// `{"dialogue":..,"stage_direction":..}`, `{"scenes":[..]}` or
    /// `{"error":..}`.
    pub fn complete_generation(&mut self, ticket: u32, result_json: &str) -> String {
        match self.tickets.take(ticket) {
            Some(Ticket::Generation(t)) => {
                let result = bridge::parse_generated(result_json);
                match self.composer.complete_generation(t, result) {
                    Ok(written) => json!({ "ok": true, "written": written }).to_string(),
                    Err(e) => error_json(&e),
                }
            }
            other => self.wrong_ticket(ticket, other),
        }
    }

    /// Start painting one scene. Returns `{"ticket":n,"description":..}`.
    pub fn begin_scene_image(&mut self, panel_id: &str, scene_id: &str) -> String {
        let (panel, scene) = (ObjectId::intern(panel_id), ObjectId::intern(scene_id));
        match self.composer.begin_scene_image(panel, scene) {
            Ok(ticket) => {
                let body = json!({ "description": ticket.request.description });
                let number = self.tickets.issue(Ticket::SceneImage(ticket));
                with_ticket(number, body)
            }
            Err(e) => error_json(&e),
        }
    }

    /// Complete a scene image with its content reference, or with a
    /// non-empty `error`.
    pub fn complete_scene_image(&mut self, ticket: u32, reference: &str, error: &str) -> String {
        match self.tickets.take(ticket) {
            Some(Ticket::SceneImage(t)) => {
                let result = bridge::reference_result(reference, error)
                    .map_err(koma_editor::GenerationError::Failed);
                match self.composer.complete_scene_image(t, result) {
                    Ok(written) => json!({ "ok": true, "written": written }).to_string(),
                    Err(e) => error_json(&e),
                }
            }
            other => self.wrong_ticket(ticket, other),
        }
    }

    pub fn begin_background_upload(&mut self, panel_id: &str, name: &str) -> String {
        match self
            .composer
            .begin_background_upload(ObjectId::intern(panel_id), name)
        {
            Ok(ticket) => {
                let number = self.tickets.issue(Ticket::Upload(ticket));
                with_ticket(number, json!({}))
            }
            Err(e) => error_json(&e),
        }
    }

    /// Start a library upload. An empty `replace_id` adds a new entry.
    pub fn begin_asset_upload(&mut self, name: &str, replace_id: &str) -> String {
        let replace = (!replace_id.is_empty()).then(|| ObjectId::intern(replace_id));
        match self.composer.begin_asset_upload(name, replace) {
            Ok(ticket) => {
                let number = self.tickets.issue(Ticket::Upload(ticket));
                with_ticket(number, json!({}))
            }
            Err(e) => error_json(&e),
        }
    }

    /// Complete an upload with the store's content reference, or with a
    /// non-empty `error`. Returns `{"ok":true,"outcome":..,"id":..}`.
    pub fn complete_upload(&mut self, ticket: u32, reference: &str, error: &str) -> String {
        match self.tickets.take(ticket) {
            Some(Ticket::Upload(t)) => {
                let result = bridge::storage_result(reference, error);
                match self.composer.complete_upload(t, result) {
                    Ok(outcome) => {
                        let (kind, id) = match outcome {
                            UploadOutcome::Background(id) => ("background", Some(id)),
                            UploadOutcome::Asset(id) => ("asset", Some(id)),
                            UploadOutcome::Scene(id) => ("scene", Some(id)),
                            UploadOutcome::Dropped => ("dropped", None),
                        };
                        json!({
                            "ok": true,
                            "outcome": kind,
                            "id": id.map(|i| i.as_str().to_string()),
                        })
                        .to_string()
                    }
                    Err(e) => error_json(&e),
                }
            }
            other => self.wrong_ticket(ticket, other),
        }
    }
}

// ─── Private helpers ─────────────────────────────────────────────────────

impl KomaCanvas {
    fn compositor(&self) -> Compositor<'_> {
        Compositor::new(&self.images, &self.fonts, self.composer.config())
    }

    fn load(&mut self, graph: Result<SceneGraph, koma_core::SnapshotError>) -> bool {
        match graph {
            Ok(graph) => {
                self.replace_graph(graph);
                true
            }
            Err(e) => {
                log::warn!("snapshot rejected: {e}");
                false
            }
        }
    }

    fn replace_graph(&mut self, graph: SceneGraph) {
        self.composer.load(graph);
        self.composer
            .set_screen_size(self.width as f32, self.height as f32);
        // tickets for the old document can no longer complete
        self.tickets = Tickets::default();
    }

    fn wrong_ticket(&mut self, number: u32, ticket: Option<Ticket>) -> String {
        if let Some(ticket) = ticket {
            self.tickets.put_back(number, ticket);
        }
        json!({ "ok": false, "error": format!("no matching ticket {number}") }).to_string()
    }
}

fn export_options(scale: f32, config: &ComposerConfig) -> ExportOptions {
    ExportOptions {
        scale: if scale > 0.0 { scale } else { 1.0 },
        ..ExportOptions::for_config(config)
    }
}

fn with_ticket(number: u32, mut body: serde_json::Value) -> String {
    body["ticket"] = json!(number);
    body.to_string()
}

fn error_json(error: &dyn std::error::Error) -> String {
    json!({ "ok": false, "error": error.to_string() }).to_string()
}

/// Premultiplied pixmap → straight RGBA bytes for `ImageData`.
fn unpremultiply(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::ToolSelect => "toolSelect",
        ShortcutAction::ToolBubble => "toolBubble",
        ShortcutAction::ToolText => "toolText",
        ShortcutAction::ToolAsset => "toolAsset",
        ShortcutAction::ToolMask => "toolMask",
        ShortcutAction::ToggleEraser => "toggleEraser",
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::Delete => "delete",
        ShortcutAction::SelectAll => "selectAll",
        ShortcutAction::Duplicate => "duplicate",
        ShortcutAction::Copy => "copy",
        ShortcutAction::Cut => "cut",
        ShortcutAction::Paste => "paste",
        ShortcutAction::Group => "group",
        ShortcutAction::Ungroup => "ungroup",
        ShortcutAction::ZoomIn => "zoomIn",
        ShortcutAction::ZoomOut => "zoomOut",
        ShortcutAction::ZoomReset => "zoomReset",
        ShortcutAction::PreviousPanel => "previousPanel",
        ShortcutAction::NextPanel => "nextPanel",
        ShortcutAction::SendBackward => "sendBackward",
        ShortcutAction::BringForward => "bringForward",
        ShortcutAction::Deselect => "deselect",
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Koma WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Check a JSON snapshot. Returns `{"ok":true,"panels":n,"objects":n}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_snapshot(json: &str) -> String {
    match SceneGraph::from_json(json) {
        Ok(graph) => {
            let panels: Vec<ObjectId> = graph
                .episodes()
                .iter()
                .flat_map(|e| graph.pages_of(e.id))
                .flat_map(|p| graph.panels_of(p.id))
                .map(|p| p.id)
                .collect();
            let objects: usize = panels.iter().map(|p| graph.objects_in_panel(*p).len()).sum();
            json!({ "ok": true, "panels": panels.len(), "objects": objects }).to_string()
        }
        Err(e) => error_json(&e),
    }
}
