//! The composer: one document, one active panel, one gesture at a time.
//!
//! `Composer` owns the scene graph and both histories. All edits that
//! should be undoable go through it; it records the document before each
//! structural mutation and restores it on undo. Pointer and key events
//! enter through [`Composer::handle`].

use crate::clipboard::Clipboard;
use crate::generation::{
    GenerationError, GenerationMode, GenerationOutput, GenerationRequest, GenerationTicket,
    PendingSet, PendingTarget, SceneImageRequest, SceneImageTicket,
};
use crate::gesture::{Gesture, MoveOrigin, apply_rotation, clamp_group_delta, pointer_angle};
use crate::history::{MaskHistory, SnapshotStack};
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::resize::{HANDLE_TOLERANCE, Handle, ResizeHandle, handle_at, resize_box};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::snap::{Guide, guides, union};
use crate::tools::{MaskMode, ToolKind};
use crate::upload::{StorageError, UploadTicket};
use koma_core::error::Result;
use koma_core::geometry::{Rect, Viewport, clamp_into};
use koma_core::model::*;
use koma_core::scene::{AssetInit, BubbleInit, HistoryState, PanelStep, TextInit};
use koma_core::{
    AssetId, ComposeError, ComposerConfig, GroupId, ObjectId, PageId, PanelId, SceneGraph,
};
use koma_render::hit::{hit_test, to_local, visual_bounds};

/// Wheel zoom step.
const ZOOM_STEP: f32 = 1.1;

/// Screen ↔ panel mapping. Screen = panel · zoom + offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub offset_x: f32,
    pub offset_y: f32,
    pub zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl View {
    pub fn to_panel(&self, sx: f32, sy: f32) -> (f32, f32) {
        ((sx - self.offset_x) / self.zoom, (sy - self.offset_y) / self.zoom)
    }

    pub fn to_screen(&self, px: f32, py: f32) -> (f32, f32) {
        (px * self.zoom + self.offset_x, py * self.zoom + self.offset_y)
    }
}

pub struct Composer {
    graph: SceneGraph,
    history: SnapshotStack<HistoryState>,
    mask_history: MaskHistory,
    tool: ToolKind,
    mask_mode: MaskMode,
    active_panel: Option<PanelId>,
    view: View,
    /// Canvas element size in screen pixels; `(0, 0)` until the host
    /// reports it.
    screen: (f32, f32),
    gesture: Gesture,
    guides: Vec<Guide>,
    clipboard: Clipboard,
    pending: PendingSet,
}

impl Composer {
    /// Take ownership of a document. The first panel of the first page
    /// becomes active.
    pub fn new(graph: SceneGraph) -> Self {
        let config = graph.config().clone();
        let active_panel = first_panel(&graph);
        Self {
            graph,
            history: SnapshotStack::new(config.history_depth),
            mask_history: MaskHistory::new(config.mask_history_depth),
            tool: ToolKind::default(),
            mask_mode: MaskMode::default(),
            active_panel,
            view: View::default(),
            screen: (0.0, 0.0),
            gesture: Gesture::Idle,
            guides: Vec::new(),
            clipboard: Clipboard::new(),
            pending: PendingSet::default(),
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SceneGraph {
        self.graph
    }

    pub fn config(&self) -> &ComposerConfig {
        self.graph.config()
    }

    /// Replace the whole document, e.g. after loading a snapshot. History,
    /// gesture and pending work are reset.
    pub fn load(&mut self, graph: SceneGraph) {
        *self = Self::new(graph);
    }

    // ─── Tools, panels, view ─────────────────────────────────────────────

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        if self.tool != tool {
            log::debug!("tool {:?} → {tool:?}", self.tool);
            self.tool = tool;
        }
    }

    pub fn mask_mode(&self) -> MaskMode {
        self.mask_mode
    }

    pub fn set_mask_mode(&mut self, mode: MaskMode) {
        self.mask_mode = mode;
    }

    pub fn active_panel(&self) -> Option<PanelId> {
        self.active_panel
    }

    /// Switch panels. The selection and any gesture are dropped; global
    /// history is kept.
    pub fn set_active_panel(&mut self, panel: PanelId) -> bool {
        if self.graph.panel(panel).is_none() {
            return false;
        }
        if self.active_panel != Some(panel) {
            self.active_panel = Some(panel);
            self.graph.clear_selection();
            self.end_gesture();
        }
        true
    }

    /// Activate the next (`forward`) or previous sibling panel.
    pub fn step_active_panel(&mut self, forward: bool) -> bool {
        let Some(next) = self
            .active_panel
            .and_then(|p| self.graph.step_panel(p, forward))
        else {
            return false;
        };
        self.set_active_panel(next)
    }

    /// Select a single object, activating its panel first.
    pub fn select_object(&mut self, id: ObjectId) -> bool {
        let Some(panel) = self.graph.object(id).map(|o| o.panel_id()) else {
            return false;
        };
        self.set_active_panel(panel);
        self.graph.select(id);
        true
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        self.screen = (width.max(0.0), height.max(0.0));
    }

    pub fn screen_to_panel(&self, sx: f32, sy: f32) -> (f32, f32) {
        self.view.to_panel(sx, sy)
    }

    /// Zoom by `factor` keeping the panel point under `(sx, sy)` fixed.
    pub fn zoom_at(&mut self, sx: f32, sy: f32, factor: f32) {
        let (px, py) = self.view.to_panel(sx, sy);
        let config = self.graph.config();
        let zoom = (self.view.zoom * factor).clamp(config.min_zoom, config.max_zoom);
        self.view = View {
            offset_x: sx - px * zoom,
            offset_y: sy - py * zoom,
            zoom,
        };
    }

    pub fn reset_zoom(&mut self) {
        self.view = View::default();
    }

    /// The part of the active panel visible on screen, in panel
    /// coordinates. The whole panel until a screen size is known.
    pub fn visible_viewport(&self) -> Viewport {
        let whole = self
            .active_panel
            .and_then(|p| self.graph.panel_bounds(p))
            .map_or(Viewport::whole(0.0, 0.0), |b| Viewport::whole(b.width, b.height));
        if self.screen.0 <= 0.0 || self.screen.1 <= 0.0 {
            return whole;
        }
        let (x, y) = self.view.to_panel(0.0, 0.0);
        Viewport {
            x,
            y,
            width: self.screen.0 / self.view.zoom,
            height: self.screen.1 / self.view.zoom,
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Active snap guides for the current gesture.
    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Run a document mutation as one undo step. On error the document is
    /// rolled back and nothing is recorded.
    fn mutate<R>(&mut self, f: impl FnOnce(&mut SceneGraph) -> Result<R>) -> Result<R> {
        let before = self.graph.history_state();
        match f(&mut self.graph) {
            Ok(r) => {
                self.history.record(before);
                Ok(r)
            }
            Err(e) => {
                log::warn!("edit refused: {e}");
                self.graph.restore_history_state(before);
                Err(e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        if self.gesture.is_active() || !self.history.can_undo() {
            return false;
        }
        let current = self.graph.history_state();
        let Some(previous) = self.history.undo(current) else {
            return false;
        };
        self.graph.restore_history_state(previous);
        self.repair_active_panel();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.gesture.is_active() || !self.history.can_redo() {
            return false;
        }
        let current = self.graph.history_state();
        let Some(next) = self.history.redo(current) else {
            return false;
        };
        self.graph.restore_history_state(next);
        self.repair_active_panel();
        true
    }

    /// After undo/redo the active panel may be gone (or back).
    fn repair_active_panel(&mut self) {
        if self.active_panel.is_some_and(|p| self.graph.panel(p).is_none()) {
            self.active_panel = first_panel(&self.graph);
        }
    }

    pub fn can_undo_mask(&self) -> bool {
        self.active_panel.is_some_and(|p| self.mask_history.can_undo(p))
    }

    pub fn undo_mask(&mut self) -> bool {
        let Some(panel) = self.active_panel else {
            return false;
        };
        if self.gesture.is_active() || !self.mask_history.can_undo(panel) {
            return false;
        }
        let current = self.graph.mask(panel).cloned().unwrap_or_default();
        match self.mask_history.undo(panel, current) {
            Some(previous) => self.graph.set_mask(panel, previous).is_ok(),
            None => false,
        }
    }

    pub fn redo_mask(&mut self) -> bool {
        let Some(panel) = self.active_panel else {
            return false;
        };
        if self.gesture.is_active() || !self.mask_history.can_redo(panel) {
            return false;
        }
        let current = self.graph.mask(panel).cloned().unwrap_or_default();
        match self.mask_history.redo(panel, current) {
            Some(next) => self.graph.set_mask(panel, next).is_ok(),
            None => false,
        }
    }

    /// Empty the active panel's mask as one mask-undo step.
    pub fn clear_mask(&mut self) -> bool {
        let Some(panel) = self.active_panel else {
            return false;
        };
        let current = self.graph.mask(panel).cloned().unwrap_or_default();
        if current.is_empty() {
            return false;
        }
        self.mask_history.record(panel, current);
        self.graph.set_mask(panel, Mask::default()).is_ok()
    }

    // ─── Structure ───────────────────────────────────────────────────────

    fn require_panel(&self) -> Result<PanelId> {
        self.active_panel.ok_or(ComposeError::NoActivePanel)
    }

    pub fn add_panel(&mut self, page: PageId, preset: SizePreset) -> Result<PanelId> {
        let panel = self.mutate(|g| g.add_panel(page, preset))?;
        if self.active_panel.is_none() {
            self.active_panel = Some(panel);
        }
        Ok(panel)
    }

    /// Delete a panel with its objects, scenes and mask. If it was active,
    /// a sibling takes over.
    pub fn delete_panel(&mut self, panel: PanelId) -> Result<()> {
        let successor = self
            .graph
            .step_panel(panel, true)
            .or_else(|| self.graph.step_panel(panel, false));
        self.mutate(|g| g.delete_panel(panel))?;
        self.mask_history.forget(panel);
        self.pending.finish(PendingTarget::Panel(panel));
        if self.active_panel == Some(panel) {
            self.active_panel = successor;
            self.end_gesture();
        }
        Ok(())
    }

    pub fn reorder_active_panel(&mut self, step: PanelStep) -> Result<bool> {
        let panel = self.require_panel()?;
        if self.graph.step_panel(panel, step == PanelStep::Down).is_none() {
            return Ok(false);
        }
        self.mutate(|g| g.reorder_panel(panel, step))
    }

    pub fn set_panel_height(&mut self, panel: PanelId, height: f32) -> Result<()> {
        self.mutate(|g| g.set_panel_height(panel, height))
    }

    pub fn set_panel_meta(&mut self, panel: PanelId, meta: PanelMeta) -> Result<()> {
        self.mutate(|g| g.set_panel_meta(panel, meta))
    }

    // ─── Objects ─────────────────────────────────────────────────────────

    /// Add a bubble centered in the visible part of the active panel and
    /// select it.
    pub fn add_bubble(&mut self, init: BubbleInit) -> Result<ObjectId> {
        let panel = self.require_panel()?;
        let viewport = self.visible_viewport();
        let id = self.mutate(|g| g.add_bubble(panel, init, viewport))?;
        self.graph.select(id);
        Ok(id)
    }

    pub fn add_text(&mut self, init: TextInit) -> Result<ObjectId> {
        let panel = self.require_panel()?;
        let viewport = self.visible_viewport();
        let id = self.mutate(|g| g.add_text(panel, init, viewport))?;
        self.graph.select(id);
        Ok(id)
    }

    pub fn place_asset(&mut self, init: AssetInit) -> Result<ObjectId> {
        let panel = self.require_panel()?;
        let viewport = self.visible_viewport();
        let id = self.mutate(|g| g.add_asset(panel, init, viewport))?;
        self.graph.select(id);
        Ok(id)
    }

    /// Attribute edit. The box is then brought back inside the inner
    /// margin and up to the (possibly new) minimum size.
    pub fn update_object(&mut self, id: ObjectId, patch: &ObjectPatch) -> Result<()> {
        self.mutate(|g| {
            g.update_object(id, patch)?;
            enforce_bounds(g, id)
        })
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) -> Result<()> {
        self.mutate(|g| g.set_hidden(id, hidden))
    }

    pub fn select_all(&mut self) {
        if let Some(panel) = self.active_panel {
            let ids: Vec<ObjectId> = self
                .graph
                .objects_in_panel(panel)
                .iter()
                .map(|o| o.id())
                .collect();
            self.graph.set_selection(&ids);
        }
    }

    pub fn clear_selection(&mut self) {
        self.graph.clear_selection();
    }

    /// Delete every selected object. Returns how many were deleted.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.graph.selection().to_vec();
        if ids.is_empty() {
            return 0;
        }
        self.mutate(|g| {
            for id in &ids {
                g.delete_object(*id)?;
            }
            Ok(ids.len())
        })
        .unwrap_or(0)
    }

    /// Duplicate the selection; the copies become the selection.
    pub fn duplicate_selected(&mut self) -> Vec<ObjectId> {
        let ids = self.graph.selection().to_vec();
        if ids.is_empty() {
            return Vec::new();
        }
        let copies = self
            .mutate(|g| ids.iter().map(|id| g.duplicate_object(*id)).collect::<Result<Vec<_>>>())
            .unwrap_or_default();
        self.graph.set_selection(&copies);
        copies
    }

    pub fn bring_forward(&mut self) -> bool {
        self.restack_selection(true)
    }

    pub fn send_backward(&mut self) -> bool {
        self.restack_selection(false)
    }

    fn restack_selection(&mut self, forward: bool) -> bool {
        let ids = self.graph.selection().to_vec();
        if ids.is_empty() {
            return false;
        }
        self.mutate(|g| {
            let mut moved = false;
            for id in &ids {
                moved |= if forward { g.bring_forward(*id)? } else { g.send_backward(*id)? };
            }
            Ok(moved)
        })
        .unwrap_or(false)
    }

    pub fn group_selection(&mut self, name: &str) -> Result<GroupId> {
        let ids = self.graph.selection().to_vec();
        self.mutate(|g| g.group(&ids, name))
    }

    /// Dissolve every group touched by the selection.
    pub fn ungroup_selection(&mut self) -> usize {
        let mut groups: Vec<GroupId> = Vec::new();
        for id in self.graph.selection() {
            if let Some(g) = self.graph.group_of(*id)
                && !groups.contains(&g.id)
            {
                groups.push(g.id);
            }
        }
        if groups.is_empty() {
            return 0;
        }
        self.mutate(|g| Ok(groups.iter().filter_map(|id| g.ungroup(*id)).count()))
            .unwrap_or(0)
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    pub fn copy_selection(&mut self) -> usize {
        let ids = self.graph.selection().to_vec();
        self.clipboard.copy(&self.graph, &ids)
    }

    pub fn cut_selection(&mut self) -> usize {
        let copied = self.copy_selection();
        if copied > 0 {
            self.delete_selected();
        }
        copied
    }

    /// Paste into the active panel; the pasted objects become the
    /// selection.
    pub fn paste(&mut self) -> Result<Vec<ObjectId>> {
        let panel = self.require_panel()?;
        if self.clipboard.is_empty() {
            return Ok(Vec::new());
        }
        let offset = self.graph.config().duplicate_offset;
        let clipboard = &self.clipboard;
        let before = self.graph.history_state();
        match clipboard.paste(&mut self.graph, panel, offset) {
            Ok(ids) => {
                self.history.record(before);
                self.graph.set_selection(&ids);
                Ok(ids)
            }
            Err(e) => {
                self.graph.restore_history_state(before);
                Err(e)
            }
        }
    }

    // ─── Asset library ───────────────────────────────────────────────────

    pub fn add_asset_entry(&mut self, name: &str, source: &str) -> AssetId {
        let before = self.graph.history_state();
        let id = self.graph.add_asset_entry(name, source);
        self.history.record(before);
        id
    }

    pub fn remove_asset_entry(&mut self, asset: AssetId) -> Result<Asset> {
        self.mutate(|g| g.remove_asset_entry(asset))
    }

    // ─── Pointer state machine ───────────────────────────────────────────

    /// Feed one input event. Returns whether the view needs a redraw.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(*x, *y, *button, *modifiers),
            InputEvent::PointerMove { x, y, modifiers } => self.pointer_move(*x, *y, *modifiers),
            InputEvent::PointerUp { .. } => self.pointer_up(),
            InputEvent::PointerLeave => self.end_gesture(),
            InputEvent::Wheel { x, y, delta } => {
                let factor = if *delta < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                self.zoom_at(*x, *y, factor);
                true
            }
            InputEvent::Key {
                key,
                modifiers,
                in_text_input,
            } => {
                if *in_text_input {
                    return false;
                }
                match ShortcutMap::resolve(
                    key,
                    modifiers.ctrl,
                    modifiers.shift,
                    modifiers.alt,
                    modifiers.meta,
                ) {
                    Some(action) => self.apply_shortcut(action),
                    None => false,
                }
            }
        }
    }

    fn pointer_down(
        &mut self,
        sx: f32,
        sy: f32,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> bool {
        if self.gesture.is_active() {
            log::trace!("pointer-down ignored during {:?}", self.gesture.kind());
            return false;
        }
        match button {
            PointerButton::Middle => {
                self.gesture = Gesture::Panning {
                    start: (sx, sy),
                    origin_offset: (self.view.offset_x, self.view.offset_y),
                };
                return false;
            }
            PointerButton::Secondary => return false,
            PointerButton::Primary => {}
        }
        let Some(panel) = self.active_panel else {
            return false;
        };
        let (px, py) = self.view.to_panel(sx, sy);

        if self.tool == ToolKind::Mask {
            let mode = self.mask_mode;
            let mut before = Some(self.graph.mask(panel).cloned().unwrap_or_default());
            let changed = self.stroke_at(panel, mode, &mut before, px, py);
            self.gesture = Gesture::Painting { panel, mode, before };
            return changed;
        }

        if self.grab_handle(panel, px, py) {
            return true;
        }

        let tool = self.tool;
        let hit = hit_test(&self.graph, panel, px, py)
            .filter(|id| self.graph.object(*id).is_some_and(|o| tool.grabs(o.kind())));
        let Some(id) = hit else {
            if !modifiers.toggles_selection() {
                self.graph.clear_selection();
            }
            return true;
        };

        let mut narrow_to = None;
        if modifiers.toggles_selection() {
            self.graph.toggle_selection(id);
            if !self.graph.is_selected(id) {
                return true;
            }
        } else if !self.graph.is_selected(id) {
            self.graph.select(id);
        } else if self.graph.selection().len() > 1 {
            // keep the set for a drag; a plain click narrows on release
            narrow_to = Some(id);
        }
        self.gesture = Gesture::Moving {
            start: (px, py),
            origins: self.move_origins(panel),
            recorded: false,
            narrow_to,
        };
        log::trace!("moving {id}");
        true
    }

    /// Start resizing or rotating when the pointer is on the chrome of the
    /// single selected object.
    fn grab_handle(&mut self, panel: PanelId, px: f32, py: f32) -> bool {
        let &[id] = self.graph.selection() else {
            return false;
        };
        let Some(object) = self.graph.object(id) else {
            return false;
        };
        if object.panel_id() != panel || object.is_hidden() || !self.tool.grabs(object.kind()) {
            return false;
        }
        let original = *object.geometry();
        let tolerance = HANDLE_TOLERANCE / self.view.zoom;
        let gesture = match handle_at(&original, px, py, tolerance) {
            Some(Handle::Rotate) => {
                let center = original.center();
                Gesture::Rotating {
                    id,
                    center,
                    initial_angle: pointer_angle(center, px, py),
                    original_rotation: original.rotation,
                }
            }
            Some(Handle::Resize(handle)) => Gesture::Resizing {
                id,
                handle,
                start: (px, py),
                original,
            },
            None => return false,
        };
        self.history.record(self.graph.history_state());
        log::trace!("{:?} on {id}", gesture.kind());
        self.gesture = gesture;
        true
    }

    /// The selection plus every member of a group any selected object
    /// belongs to, limited to `panel`.
    fn move_origins(&self, panel: PanelId) -> Vec<MoveOrigin> {
        let mut ids: Vec<ObjectId> = Vec::new();
        for id in self.graph.selection() {
            let members = self
                .graph
                .group_of(*id)
                .map_or_else(|| vec![*id], |g| g.members.to_vec());
            for m in members {
                if !ids.contains(&m) {
                    ids.push(m);
                }
            }
        }
        ids.into_iter()
            .filter_map(|id| self.graph.object(id))
            .filter(|o| o.panel_id() == panel)
            .map(|o| {
                let g = o.geometry();
                MoveOrigin {
                    id: o.id(),
                    x: g.x,
                    y: g.y,
                    width: g.width,
                    height: g.height,
                }
            })
            .collect()
    }

    fn pointer_move(&mut self, sx: f32, sy: f32, modifiers: Modifiers) -> bool {
        let (px, py) = self.view.to_panel(sx, sy);
        let mut gesture = std::mem::take(&mut self.gesture);
        let changed = match &mut gesture {
            Gesture::Idle => false,
            Gesture::Moving {
                start,
                origins,
                recorded,
                ..
            } => self.drag_move(*start, origins, recorded, px, py),
            Gesture::Resizing {
                id,
                handle,
                start,
                original,
            } => self.drag_resize(*id, *handle, *start, original, px, py),
            Gesture::Rotating {
                id,
                center,
                initial_angle,
                original_rotation,
            } => {
                let delta = pointer_angle(*center, px, py) - *initial_angle;
                let snap = modifiers.shift.then_some(self.graph.config().rotation_snap_deg);
                let rotation = apply_rotation(*original_rotation, delta, snap);
                self.graph
                    .update_object(*id, &ObjectPatch::rotation(rotation))
                    .is_ok()
            }
            Gesture::Panning {
                start,
                origin_offset,
            } => {
                self.view.offset_x = origin_offset.0 + (sx - start.0);
                self.view.offset_y = origin_offset.1 + (sy - start.1);
                true
            }
            Gesture::Painting {
                panel,
                mode,
                before,
            } => self.stroke_at(*panel, *mode, before, px, py),
        };
        self.gesture = gesture;
        changed
    }

    fn drag_move(
        &mut self,
        start: (f32, f32),
        origins: &[MoveOrigin],
        recorded: &mut bool,
        px: f32,
        py: f32,
    ) -> bool {
        let Some(panel) = self.active_panel else {
            return false;
        };
        let Some(inner) = self.graph.panel_inner(panel) else {
            return false;
        };
        let boxes: Vec<Rect> = origins.iter().map(MoveOrigin::rect).collect();
        let (dx, dy) = clamp_group_delta(&boxes, px - start.0, py - start.1, inner);
        if !*recorded {
            if dx == 0.0 && dy == 0.0 {
                return false;
            }
            self.history.record(self.graph.history_state());
            *recorded = true;
        }
        for o in origins {
            // a member deleted mid-drag is simply skipped
            let _ = self
                .graph
                .update_object(o.id, &ObjectPatch::position(o.x + dx, o.y + dy));
        }
        let ids: Vec<ObjectId> = origins.iter().map(|o| o.id).collect();
        self.update_guides(panel, &ids);
        true
    }

    fn drag_resize(
        &mut self,
        id: ObjectId,
        handle: ResizeHandle,
        start: (f32, f32),
        original: &Geometry,
        px: f32,
        py: f32,
    ) -> bool {
        let Some(object) = self.graph.object(id) else {
            return false;
        };
        let panel = object.panel_id();
        let min = object.min_size(self.graph.config());
        let Some(inner) = self.graph.panel_inner(panel) else {
            return false;
        };
        // pointer delta in the object's own axes
        let (x0, y0) = to_local(original, start.0, start.1);
        let (x1, y1) = to_local(original, px, py);
        let rect = resize_box(original.bounds(), handle, x1 - x0, y1 - y0, inner, min);
        if self.graph.update_object(id, &ObjectPatch::bounds(rect)).is_err() {
            return false;
        }
        self.update_guides(panel, &[id]);
        true
    }

    fn paint_at(&mut self, panel: PanelId, mode: MaskMode, px: f32, py: f32) -> bool {
        let inside = self
            .graph
            .panel_bounds(panel)
            .is_some_and(|b| b.contains(px, py));
        if !inside {
            return false;
        }
        let config = self.graph.config();
        let (brush, eraser) = (config.brush_radius, config.eraser_radius);
        let Ok(mask) = self.graph.mask_mut(panel) else {
            return false;
        };
        match mode {
            MaskMode::Brush => {
                mask.stamp(px, py, brush);
                true
            }
            MaskMode::Eraser => mask.erase(px, py, eraser) > 0,
        }
    }

    /// Paint one stamp of a stroke. The pre-stroke mask goes to mask
    /// history the first time the stroke changes anything, so a stroke
    /// that paints nothing leaves no undo step.
    fn stroke_at(
        &mut self,
        panel: PanelId,
        mode: MaskMode,
        before: &mut Option<Mask>,
        px: f32,
        py: f32,
    ) -> bool {
        let changed = self.paint_at(panel, mode, px, py);
        if changed && let Some(mask) = before.take() {
            self.mask_history.record(panel, mask);
        }
        changed
    }

    fn update_guides(&mut self, panel: PanelId, moving: &[ObjectId]) {
        let Some(canvas) = self.graph.panel_bounds(panel) else {
            return;
        };
        let mut moved: Vec<Rect> = Vec::new();
        let mut others: Vec<Rect> = Vec::new();
        for o in self.graph.objects_in_panel(panel) {
            if moving.contains(&o.id()) {
                moved.push(visual_bounds(o.geometry()));
            } else if !o.is_hidden() {
                others.push(visual_bounds(o.geometry()));
            }
        }
        self.guides = match union(&moved) {
            Some(r) => guides(r, &others, canvas, self.graph.config().snap_threshold),
            None => Vec::new(),
        };
    }

    fn pointer_up(&mut self) -> bool {
        if let Gesture::Moving {
            recorded: false,
            narrow_to: Some(id),
            ..
        } = self.gesture
        {
            self.graph.select(id);
        }
        self.end_gesture()
    }

    /// Return to idle and clear guides. Returns whether a gesture ended.
    fn end_gesture(&mut self) -> bool {
        let was_active = self.gesture.is_active();
        if was_active {
            log::trace!("{:?} → idle", self.gesture.kind());
        }
        self.gesture = Gesture::Idle;
        self.guides.clear();
        was_active
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Run a resolved shortcut. Returns whether anything changed.
    pub fn apply_shortcut(&mut self, action: ShortcutAction) -> bool {
        log::trace!("shortcut {action:?}");
        match action {
            ShortcutAction::ToolSelect => self.switch_tool(ToolKind::Select),
            ShortcutAction::ToolBubble => self.switch_tool(ToolKind::Bubble),
            ShortcutAction::ToolText => self.switch_tool(ToolKind::Text),
            ShortcutAction::ToolAsset => self.switch_tool(ToolKind::Asset),
            ShortcutAction::ToolMask => self.switch_tool(ToolKind::Mask),
            ShortcutAction::ToggleEraser => {
                self.mask_mode = self.mask_mode.toggled();
                self.tool = ToolKind::Mask;
                true
            }
            // with the mask tool, undo/redo act on mask strokes
            ShortcutAction::Undo if self.tool == ToolKind::Mask => self.undo_mask(),
            ShortcutAction::Redo if self.tool == ToolKind::Mask => self.redo_mask(),
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Delete => self.delete_selected() > 0,
            ShortcutAction::SelectAll => {
                self.select_all();
                true
            }
            ShortcutAction::Duplicate => !self.duplicate_selected().is_empty(),
            ShortcutAction::Copy => self.copy_selection() > 0,
            ShortcutAction::Cut => self.cut_selection() > 0,
            ShortcutAction::Paste => self.paste().is_ok_and(|ids| !ids.is_empty()),
            ShortcutAction::Group => self.group_selection("Group").is_ok(),
            ShortcutAction::Ungroup => self.ungroup_selection() > 0,
            ShortcutAction::ZoomIn | ShortcutAction::ZoomOut => {
                let factor = if action == ShortcutAction::ZoomIn {
                    ZOOM_STEP
                } else {
                    1.0 / ZOOM_STEP
                };
                self.zoom_at(self.screen.0 / 2.0, self.screen.1 / 2.0, factor);
                true
            }
            ShortcutAction::ZoomReset => {
                self.reset_zoom();
                true
            }
            ShortcutAction::PreviousPanel => self.step_active_panel(false),
            ShortcutAction::NextPanel => self.step_active_panel(true),
            ShortcutAction::SendBackward => self.send_backward(),
            ShortcutAction::BringForward => self.bring_forward(),
            ShortcutAction::Deselect => {
                let had = !self.graph.selection().is_empty();
                self.graph.clear_selection();
                had
            }
        }
    }

    fn switch_tool(&mut self, tool: ToolKind) -> bool {
        let changed = self.tool != tool;
        self.set_tool(tool);
        changed
    }

    // ─── Collaborators ───────────────────────────────────────────────────

    /// Mark `panel` as generating and hand out the request to run.
    pub fn begin_generation(
        &mut self,
        panel: PanelId,
        prompt: &str,
        mode: GenerationMode,
    ) -> std::result::Result<GenerationTicket, GenerationError> {
        if self.graph.panel(panel).is_none() {
            return Err(GenerationError::UnknownPanel(panel));
        }
        let ticket = GenerationTicket {
            request: GenerationRequest {
                panel,
                prompt: prompt.to_owned(),
                mode,
            },
        };
        if !self.pending.begin(ticket.target()) {
            return Err(GenerationError::Busy(ticket.target()));
        }
        log::debug!("generation started for {panel}");
        Ok(ticket)
    }

    /// Write a generation result. A failure is returned unchanged and
    /// leaves the panel as it was; a result for a deleted panel is
    /// dropped (`Ok(false)`).
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: std::result::Result<GenerationOutput, GenerationError>,
    ) -> std::result::Result<bool, GenerationError> {
        self.pending.finish(ticket.target());
        let output = result.inspect_err(|e| log::warn!("generation failed: {e}"))?;
        let panel = ticket.request.panel;
        if self.graph.panel(panel).is_none() {
            log::debug!("generation result for deleted panel {panel} dropped");
            return Ok(false);
        }
        let before = self.graph.history_state();
        let written = match output {
            GenerationOutput::Single {
                dialogue,
                stage_direction,
            } => self.graph.set_dialogue(panel, &dialogue, &stage_direction),
            GenerationOutput::Multi(drafts) => {
                let layout = match ticket.request.mode {
                    GenerationMode::Multi { layout, .. } => layout,
                    GenerationMode::Single => SceneLayout::default(),
                };
                let drafts = drafts.into_iter().map(|d| (d.description, d.rect)).collect();
                self.graph.set_scenes(panel, layout, drafts)
            }
        };
        if written {
            self.history.record(before);
        }
        Ok(written)
    }

    /// Mark one scene as generating its image.
    pub fn begin_scene_image(
        &mut self,
        panel: PanelId,
        scene: ObjectId,
    ) -> std::result::Result<SceneImageTicket, GenerationError> {
        let description = self
            .graph
            .panel(panel)
            .ok_or(GenerationError::UnknownPanel(panel))?
            .scenes
            .iter()
            .find(|s| s.id == scene)
            .map(|s| s.description.clone())
            .ok_or(GenerationError::UnknownScene { panel, scene })?;
        let ticket = SceneImageTicket {
            request: SceneImageRequest {
                panel,
                scene,
                description,
            },
        };
        if !self.pending.begin(ticket.target()) {
            return Err(GenerationError::Busy(ticket.target()));
        }
        self.graph
            .set_scene_status(panel, scene, GenerationStatus::Generating);
        Ok(ticket)
    }

    pub fn complete_scene_image(
        &mut self,
        ticket: SceneImageTicket,
        result: std::result::Result<String, GenerationError>,
    ) -> std::result::Result<bool, GenerationError> {
        self.pending.finish(ticket.target());
        let SceneImageRequest { panel, scene, .. } = ticket.request;
        match result {
            Ok(image) => {
                let before = self.graph.history_state();
                let written = self.graph.set_scene_image(panel, scene, image);
                if written {
                    self.history.record(before);
                }
                Ok(written)
            }
            Err(e) => {
                log::warn!("scene {scene} image failed: {e}");
                self.graph
                    .set_scene_status(panel, scene, GenerationStatus::Failed);
                Err(e)
            }
        }
    }

    /// Begin uploading a panel background.
    pub fn begin_background_upload(
        &mut self,
        panel: PanelId,
        name: &str,
    ) -> std::result::Result<UploadTicket, StorageError> {
        if self.graph.panel(panel).is_none() {
            return Err(StorageError::TargetGone);
        }
        let target = PendingTarget::Panel(panel);
        if !self.pending.begin(target) {
            return Err(StorageError::Busy(target));
        }
        Ok(UploadTicket {
            name: name.to_owned(),
            target: Some(target),
        })
    }

    /// Begin uploading library content: a new entry (`replace = None`) or
    /// new content for an existing one.
    pub fn begin_asset_upload(
        &mut self,
        name: &str,
        replace: Option<AssetId>,
    ) -> std::result::Result<UploadTicket, StorageError> {
        let target = match replace {
            Some(asset) => {
                if self.graph.asset(asset).is_none() {
                    return Err(StorageError::TargetGone);
                }
                let target = PendingTarget::Asset(asset);
                if !self.pending.begin(target) {
                    return Err(StorageError::Busy(target));
                }
                Some(target)
            }
            None => None,
        };
        Ok(UploadTicket {
            name: name.to_owned(),
            target,
        })
    }

    /// Write an upload result by target. Returns the asset the content
    /// landed on, if it was a library upload, or `None` when the target
    /// was deleted meanwhile.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: std::result::Result<String, StorageError>,
    ) -> std::result::Result<UploadOutcome, StorageError> {
        if let Some(target) = ticket.target {
            self.pending.finish(target);
        }
        let reference =
            result.inspect_err(|e| log::warn!("upload of {} failed: {e}", ticket.name))?;
        let before = self.graph.history_state();
        let outcome = match ticket.target {
            Some(PendingTarget::Panel(panel)) => {
                if self.graph.set_background(panel, Some(reference)) {
                    UploadOutcome::Background(panel)
                } else {
                    UploadOutcome::Dropped
                }
            }
            Some(PendingTarget::Asset(asset)) => {
                if self.graph.set_asset_source(asset, &reference) {
                    UploadOutcome::Asset(asset)
                } else {
                    UploadOutcome::Dropped
                }
            }
            Some(PendingTarget::Scene { panel, scene }) => {
                if self.graph.set_scene_image(panel, scene, reference) {
                    UploadOutcome::Scene(scene)
                } else {
                    UploadOutcome::Dropped
                }
            }
            None => UploadOutcome::Asset(self.graph.add_asset_entry(&ticket.name, &reference)),
        };
        if outcome != UploadOutcome::Dropped {
            self.history.record(before);
        }
        Ok(outcome)
    }
}

/// Where a completed upload was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Background(PanelId),
    Asset(AssetId),
    Scene(ObjectId),
    /// The target no longer exists.
    Dropped,
}

fn first_panel(graph: &SceneGraph) -> Option<PanelId> {
    graph
        .episodes()
        .iter()
        .flat_map(|e| graph.pages_of(e.id))
        .flat_map(|p| graph.panels_of(p.id))
        .map(|p| p.id)
        .next()
}

/// Grow an object to its minimum size and pull it inside the inner margin.
fn enforce_bounds(graph: &mut SceneGraph, id: ObjectId) -> Result<()> {
    let object = graph.object(id).ok_or(ComposeError::UnknownObject(id))?;
    let inner = graph
        .panel_inner(object.panel_id())
        .ok_or(ComposeError::UnknownPanel(object.panel_id()))?;
    let min = object.min_size(graph.config());
    let g = object.geometry();
    let rect = clamp_into(
        Rect::new(g.x, g.y, g.width.max(min.width), g.height.max(min.height)),
        inner,
    );
    if rect != g.bounds() {
        graph.update_object(id, &ObjectPatch::bounds(rect))?;
    }
    Ok(())
}
