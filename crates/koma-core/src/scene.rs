//! The canonical mutable document: episodes → pages → panels → objects,
//! plus the asset library, groups, per-panel masks and the selection.
//!
//! Objects live in one flat `Vec` in insertion order; "what is in this
//! panel" is a derived query. The scene graph does not re-validate
//! geometry passed to [`SceneGraph::update_object`]; callers clamp first.

use crate::config::ComposerConfig;
use crate::error::{ComposeError, Result};
use crate::geometry::{Rect, Viewport, clamp_span};
use crate::id::{AssetId, EpisodeId, GroupId, ObjectId, PageId, PanelId};
use crate::layout::scene_rects;
use crate::model::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Default text element box.
const DEFAULT_TEXT_SIZE: (f32, f32) = (240.0, 60.0);
/// New asset placements fit inside this share of the viewport.
const ASSET_VIEWPORT_SHARE: f32 = 0.6;

/// Direction for [`SceneGraph::reorder_panel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStep {
    Up,
    Down,
}

/// Initial attributes for a new bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleInit {
    pub bubble_type: BubbleType,
    pub text: String,
    pub tail: Option<TailDirection>,
    /// Box size; `None` uses the type's default.
    pub size: Option<(f32, f32)>,
}

impl Default for BubbleInit {
    fn default() -> Self {
        Self {
            bubble_type: BubbleType::Speech,
            text: String::new(),
            tail: Some(TailDirection::BottomLeft),
            size: None,
        }
    }
}

/// Initial attributes for a new text element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInit {
    pub text: String,
    pub font: FontSpec,
    pub color: Color,
    pub size: Option<(f32, f32)>,
}

impl Default for TextInit {
    fn default() -> Self {
        Self {
            text: "Text".into(),
            font: FontSpec::default(),
            color: Color::BLACK,
            size: None,
        }
    }
}

/// Initial attributes for a new asset placement.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInit {
    pub asset_id: AssetId,
    /// Natural pixel size of the asset, if known. Scaled down to fit the
    /// viewport.
    pub natural_size: Option<(f32, f32)>,
}

/// The part of the document captured by global undo.
///
/// Masks have their own history and the selection is transient, so
/// neither is included.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState {
    episodes: Vec<Episode>,
    pages: Vec<Page>,
    panels: Vec<Panel>,
    objects: Vec<SceneObject>,
    assets: Vec<Asset>,
    groups: Vec<Group>,
}

/// The full composer document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    episodes: Vec<Episode>,
    pages: Vec<Page>,
    panels: Vec<Panel>,
    /// All objects of all panels, in insertion order.
    objects: Vec<SceneObject>,
    /// Document-global asset library.
    assets: Vec<Asset>,
    groups: Vec<Group>,
    #[serde(default)]
    masks: HashMap<PanelId, Mask>,

    #[serde(skip)]
    selection: SmallVec<[ObjectId; 4]>,
    #[serde(skip)]
    config: ComposerConfig,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ComposerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ComposerConfig) {
        self.config = config;
    }

    // ─── Episodes & pages ────────────────────────────────────────────────

    pub fn add_episode(&mut self, title: &str) -> EpisodeId {
        let id = ObjectId::with_prefix("episode");
        let order = self.episodes.iter().map(|e| e.order).max().map_or(0, |o| o + 1);
        self.episodes.push(Episode {
            id,
            title: title.to_owned(),
            order,
        });
        log::debug!("added episode {id}");
        id
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn add_page(&mut self, episode: EpisodeId) -> Result<PageId> {
        if !self.episodes.iter().any(|e| e.id == episode) {
            return Err(ComposeError::UnknownEpisode(episode));
        }
        let id = ObjectId::with_prefix("page");
        let order = self
            .pages
            .iter()
            .filter(|p| p.episode_id == episode)
            .map(|p| p.order)
            .max()
            .map_or(0, |o| o + 1);
        self.pages.push(Page {
            id,
            episode_id: episode,
            order,
            width: self.config.page_width,
        });
        log::debug!("added page {id} to {episode}");
        Ok(id)
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Pages of an episode ordered by `order`.
    pub fn pages_of(&self, episode: EpisodeId) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self
            .pages
            .iter()
            .filter(|p| p.episode_id == episode)
            .collect();
        pages.sort_by_key(|p| p.order);
        pages
    }

    // ─── Panels ──────────────────────────────────────────────────────────

    /// Append a panel to `page`. Its height comes from the preset.
    pub fn add_panel(&mut self, page: PageId, preset: SizePreset) -> Result<PanelId> {
        let width = self.page(page).ok_or(ComposeError::UnknownPage(page))?.width;
        let id = ObjectId::with_prefix("panel");
        let order = self
            .panels
            .iter()
            .filter(|p| p.page_id == page)
            .map(|p| p.order)
            .max()
            .map_or(0, |o| o + 1);
        self.panels.push(Panel {
            id,
            page_id: page,
            order,
            height: preset.default_height(width),
            size_preset: preset,
            meta: PanelMeta::default(),
            background: None,
            scene_layout: SceneLayout::default(),
            scenes: Vec::new(),
        });
        log::debug!("added panel {id} to {page} at order {order}");
        Ok(id)
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id == id)
    }

    /// Panel width, inherited from its page.
    pub fn panel_width(&self, id: PanelId) -> Option<f32> {
        let panel = self.panel(id)?;
        self.page(panel.page_id).map(|p| p.width)
    }

    /// `(0, 0, width, height)` of a panel.
    pub fn panel_bounds(&self, id: PanelId) -> Option<Rect> {
        let panel = self.panel(id)?;
        let width = self.page(panel.page_id)?.width;
        Some(Rect::new(0.0, 0.0, width, panel.height))
    }

    /// Panel bounds shrunk by the configured inner margin.
    pub fn panel_inner(&self, id: PanelId) -> Option<Rect> {
        self.panel_bounds(id)
            .map(|b| b.inset(self.config.panel_margin))
    }

    /// Panels of a page ordered by `order`.
    pub fn panels_of(&self, page: PageId) -> Vec<&Panel> {
        let mut panels: Vec<&Panel> = self.panels.iter().filter(|p| p.page_id == page).collect();
        panels.sort_by_key(|p| p.order);
        panels
    }

    /// The sibling after (`forward`) or before the panel, if any.
    pub fn step_panel(&self, panel: PanelId, forward: bool) -> Option<PanelId> {
        let page = self.panel(panel)?.page_id;
        let siblings = self.panels_of(page);
        let idx = siblings.iter().position(|p| p.id == panel)?;
        let next = if forward {
            idx.checked_add(1)?
        } else {
            idx.checked_sub(1)?
        };
        siblings.get(next).map(|p| p.id)
    }

    /// Swap `order` with the adjacent sibling. Returns `false` at the list
    /// boundary.
    pub fn reorder_panel(&mut self, panel: PanelId, step: PanelStep) -> Result<bool> {
        let page = self.panel(panel).ok_or(ComposeError::UnknownPanel(panel))?.page_id;
        let other = {
            let siblings = self.panels_of(page);
            let idx = siblings.iter().position(|p| p.id == panel);
            let target = match (step, idx) {
                (PanelStep::Up, Some(i)) if i > 0 => siblings.get(i - 1),
                (PanelStep::Down, Some(i)) => siblings.get(i + 1),
                _ => None,
            };
            match target {
                Some(p) => (p.id, p.order),
                None => return Ok(false),
            }
        };

        let own_order = self.panel(panel).map_or(0, |p| p.order);
        if let Some(p) = self.panel_mut(panel) {
            p.order = other.1;
        }
        if let Some(p) = self.panel_mut(other.0) {
            p.order = own_order;
        }
        log::debug!("swapped panel {panel} with {} ({step:?})", other.0);
        Ok(true)
    }

    /// Remove a panel with all of its objects, scenes and mask.
    pub fn delete_panel(&mut self, panel: PanelId) -> Result<Panel> {
        let idx = self
            .panels
            .iter()
            .position(|p| p.id == panel)
            .ok_or(ComposeError::UnknownPanel(panel))?;
        let removed = self.panels.remove(idx);

        let doomed: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|o| o.panel_id() == panel)
            .map(|o| o.id())
            .collect();
        self.objects.retain(|o| o.panel_id() != panel);
        for id in &doomed {
            self.forget_member(*id);
        }
        self.masks.remove(&panel);
        log::debug!("deleted panel {panel} with {} objects", doomed.len());
        Ok(removed)
    }

    pub fn set_panel_height(&mut self, panel: PanelId, height: f32) -> Result<()> {
        let p = self.panel_mut(panel).ok_or(ComposeError::UnknownPanel(panel))?;
        p.height = height.max(1.0);
        p.size_preset = SizePreset::Custom;
        Ok(())
    }

    pub fn set_panel_meta(&mut self, panel: PanelId, meta: PanelMeta) -> Result<()> {
        let p = self.panel_mut(panel).ok_or(ComposeError::UnknownPanel(panel))?;
        p.meta = meta;
        Ok(())
    }

    // ─── Collaborator completions ────────────────────────────────────────
    //
    // Async work writes back by id. The target may have been deleted in
    // the meantime; then the write is dropped and `false` is returned.

    pub fn set_background(&mut self, panel: PanelId, source: Option<String>) -> bool {
        match self.panel_mut(panel) {
            Some(p) => {
                p.background = source;
                true
            }
            None => {
                log::debug!("background for missing panel {panel} dropped");
                false
            }
        }
    }

    pub fn set_dialogue(&mut self, panel: PanelId, dialogue: &str, stage_direction: &str) -> bool {
        match self.panel_mut(panel) {
            Some(p) => {
                p.meta.dialogue = dialogue.to_owned();
                p.meta.stage_direction = stage_direction.to_owned();
                true
            }
            None => {
                log::debug!("dialogue for missing panel {panel} dropped");
                false
            }
        }
    }

    /// Replace a panel's scenes. Scenes without a usable rectangle are
    /// placed by `layout`.
    pub fn set_scenes(
        &mut self,
        panel: PanelId,
        layout: SceneLayout,
        drafts: Vec<(String, Option<Rect>)>,
    ) -> bool {
        let Some(bounds) = self.panel_bounds(panel) else {
            log::debug!("scenes for missing panel {panel} dropped");
            return false;
        };
        let fallback = scene_rects(layout, drafts.len(), bounds.width, bounds.height);
        let scenes = drafts
            .into_iter()
            .zip(fallback)
            .map(|((description, rect), slot)| Scene {
                id: ObjectId::with_prefix("scene"),
                description,
                rect: rect.unwrap_or(slot),
                status: GenerationStatus::Pending,
                image: None,
            })
            .collect();
        if let Some(p) = self.panel_mut(panel) {
            p.scene_layout = layout;
            p.scenes = scenes;
        }
        true
    }

    pub fn set_scene_status(
        &mut self,
        panel: PanelId,
        scene: ObjectId,
        status: GenerationStatus,
    ) -> bool {
        match self.scene_mut(panel, scene) {
            Some(s) => {
                s.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_scene_image(&mut self, panel: PanelId, scene: ObjectId, image: String) -> bool {
        match self.scene_mut(panel, scene) {
            Some(s) => {
                s.image = Some(image);
                s.status = GenerationStatus::Done;
                true
            }
            None => {
                log::debug!("image for missing scene {scene} dropped");
                false
            }
        }
    }

    fn scene_mut(&mut self, panel: PanelId, scene: ObjectId) -> Option<&mut Scene> {
        self.panel_mut(panel)?
            .scenes
            .iter_mut()
            .find(|s| s.id == scene)
    }

    // ─── Objects ─────────────────────────────────────────────────────────

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    fn object_index(&self, id: ObjectId) -> Result<usize> {
        self.objects
            .iter()
            .position(|o| o.id() == id)
            .ok_or(ComposeError::UnknownObject(id))
    }

    /// Objects of a panel, back to front: ascending `z_index` (unset
    /// counts as 0), ties in insertion order.
    pub fn objects_in_panel(&self, panel: PanelId) -> Vec<&SceneObject> {
        let mut objects: Vec<&SceneObject> = self
            .objects
            .iter()
            .filter(|o| o.panel_id() == panel)
            .collect();
        objects.sort_by_key(|o| o.z_index().unwrap_or(0));
        objects
    }

    /// Center a `w × h` box in the viewport, then clamp it inside the
    /// panel's inner margin.
    fn place_box(&self, panel: PanelId, w: f32, h: f32, viewport: Viewport) -> Result<Rect> {
        let inner = self
            .panel_inner(panel)
            .ok_or(ComposeError::UnknownPanel(panel))?;
        let (cx, cy) = viewport.center();
        Ok(Rect::new(
            clamp_span(cx - w / 2.0, w, inner.x, inner.right()),
            clamp_span(cy - h / 2.0, h, inner.y, inner.bottom()),
            w,
            h,
        ))
    }

    pub fn add_bubble(
        &mut self,
        panel: PanelId,
        init: BubbleInit,
        viewport: Viewport,
    ) -> Result<ObjectId> {
        let min = init.bubble_type.min_size(&self.config);
        let (w, h) = init
            .size
            .unwrap_or_else(|| default_bubble_size(init.bubble_type));
        let rect = self.place_box(panel, w.max(min.width), h.max(min.height), viewport)?;
        let id = ObjectId::with_prefix("bubble");
        self.objects.push(SceneObject::Bubble(Bubble {
            id,
            panel_id: panel,
            geometry: Geometry::from_rect(rect),
            z_index: None,
            hidden: false,
            bubble_type: init.bubble_type,
            tail: init.tail,
            text: init.text,
            font_size: FontSizePolicy::Auto,
            inverted: false,
        }));
        log::debug!("added bubble {id} to {panel} at {rect:?}");
        Ok(id)
    }

    pub fn add_text(
        &mut self,
        panel: PanelId,
        init: TextInit,
        viewport: Viewport,
    ) -> Result<ObjectId> {
        let min = self.config.min_object;
        let (w, h) = init.size.unwrap_or(DEFAULT_TEXT_SIZE);
        let rect = self.place_box(panel, w.max(min.width), h.max(min.height), viewport)?;
        let id = ObjectId::with_prefix("text");
        self.objects.push(SceneObject::Text(TextElement {
            id,
            panel_id: panel,
            geometry: Geometry::from_rect(rect),
            z_index: None,
            hidden: false,
            text: init.text,
            font: init.font,
            color: init.color,
            stroke: None,
            background: None,
        }));
        log::debug!("added text {id} to {panel}");
        Ok(id)
    }

    pub fn add_asset(
        &mut self,
        panel: PanelId,
        init: AssetInit,
        viewport: Viewport,
    ) -> Result<ObjectId> {
        if self.asset(init.asset_id).is_none() {
            return Err(ComposeError::UnknownAsset(init.asset_id));
        }
        let min = self.config.min_object;
        let (nw, nh) = init.natural_size.unwrap_or((200.0, 200.0));
        let fit = (viewport.width * ASSET_VIEWPORT_SHARE / nw)
            .min(viewport.height * ASSET_VIEWPORT_SHARE / nh)
            .min(1.0);
        let (w, h) = ((nw * fit).max(min.width), (nh * fit).max(min.height));
        let rect = self.place_box(panel, w, h, viewport)?;
        let id = ObjectId::with_prefix("placement");
        self.objects.push(SceneObject::Asset(AssetPlacement {
            id,
            panel_id: panel,
            asset_id: init.asset_id,
            geometry: Geometry::from_rect(rect),
            z_index: None,
            hidden: false,
        }));
        log::debug!("placed asset {} as {id} in {panel}", init.asset_id);
        Ok(id)
    }

    /// Insert a prepared object into `panel` under a fresh id. Used by
    /// paste; the object's previous id and panel are discarded.
    pub fn insert_object(&mut self, mut object: SceneObject, panel: PanelId) -> Result<ObjectId> {
        if self.panel(panel).is_none() {
            return Err(ComposeError::UnknownPanel(panel));
        }
        let id = ObjectId::with_prefix(kind_prefix(object.kind()));
        object.set_id(id);
        object.set_panel(panel);
        self.objects.push(object);
        Ok(id)
    }

    /// Merge the `Some` fields of `patch`. Geometry is taken as given.
    pub fn update_object(&mut self, id: ObjectId, patch: &ObjectPatch) -> Result<()> {
        let idx = self.object_index(id)?;
        patch.apply(&mut self.objects[idx]);
        Ok(())
    }

    /// Remove an object. It leaves its group (an emptied group is
    /// removed) and the selection.
    pub fn delete_object(&mut self, id: ObjectId) -> Result<SceneObject> {
        let idx = self.object_index(id)?;
        let removed = self.objects.remove(idx);
        self.forget_member(id);
        log::debug!("deleted object {id}");
        Ok(removed)
    }

    /// Drop a removed object from the selection and from its group. A
    /// group left with no members is removed; one left with a single
    /// member stays until that member goes too.
    fn forget_member(&mut self, id: ObjectId) {
        self.selection.retain(|s| *s != id);
        for group in &mut self.groups {
            group.members.retain(|m| *m != id);
        }
        self.groups.retain(|g| !g.members.is_empty());
    }

    /// Deep-copy an object under a new id, offset by the duplicate offset.
    /// The copy is not grouped.
    pub fn duplicate_object(&mut self, id: ObjectId) -> Result<ObjectId> {
        let idx = self.object_index(id)?;
        let mut copy = self.objects[idx].clone();
        let new_id = ObjectId::with_prefix(kind_prefix(copy.kind()));
        copy.set_id(new_id);
        let offset = self.config.duplicate_offset;
        let g = copy.geometry_mut();
        g.x += offset;
        g.y += offset;
        self.objects.insert(idx + 1, copy);
        log::debug!("duplicated {id} as {new_id}");
        Ok(new_id)
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) -> Result<()> {
        let idx = self.object_index(id)?;
        self.objects[idx].set_hidden(hidden);
        Ok(())
    }

    /// Move one step towards the front. Returns `false` when already
    /// frontmost.
    pub fn bring_forward(&mut self, id: ObjectId) -> Result<bool> {
        self.restack(id, true)
    }

    /// Move one step towards the back. Returns `false` when already
    /// backmost.
    pub fn send_backward(&mut self, id: ObjectId) -> Result<bool> {
        self.restack(id, false)
    }

    /// Swap with the neighbour in the panel's stacking order, then write
    /// the resulting order back as explicit z-indices.
    fn restack(&mut self, id: ObjectId, forward: bool) -> Result<bool> {
        let panel = self
            .object(id)
            .ok_or(ComposeError::UnknownObject(id))?
            .panel_id();
        let mut order: Vec<ObjectId> = self
            .objects_in_panel(panel)
            .iter()
            .map(|o| o.id())
            .collect();
        let Some(pos) = order.iter().position(|o| *o == id) else {
            return Ok(false);
        };
        let other = if forward {
            pos + 1
        } else if pos > 0 {
            pos - 1
        } else {
            return Ok(false);
        };
        if other >= order.len() {
            return Ok(false);
        }
        order.swap(pos, other);
        for (z, oid) in order.iter().enumerate() {
            if let Some(o) = self.objects.iter_mut().find(|o| o.id() == *oid) {
                o.set_z_index(Some(z as i32));
            }
        }
        Ok(true)
    }

    // ─── Groups ──────────────────────────────────────────────────────────

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_of(&self, id: ObjectId) -> Option<&Group> {
        self.groups.iter().find(|g| g.members.contains(&id))
    }

    /// Group at least two objects of one panel. Objects already in a group
    /// move to the new one.
    pub fn group(&mut self, ids: &[ObjectId], name: &str) -> Result<GroupId> {
        let mut members: SmallVec<[ObjectId; 4]> = SmallVec::new();
        for id in ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        if members.len() < 2 {
            return Err(ComposeError::InvalidGroup);
        }
        let mut panel = None;
        for id in &members {
            let p = self
                .object(*id)
                .ok_or(ComposeError::UnknownObject(*id))?
                .panel_id();
            match panel {
                None => panel = Some(p),
                Some(q) if q != p => return Err(ComposeError::InvalidGroup),
                Some(_) => {}
            }
        }

        for group in &mut self.groups {
            group.members.retain(|m| !members.contains(m));
        }
        self.groups.retain(|g| !g.members.is_empty());

        let id = ObjectId::with_prefix("group");
        log::debug!("grouped {} objects as {id}", members.len());
        self.groups.push(Group {
            id,
            name: name.to_owned(),
            members,
        });
        Ok(id)
    }

    pub fn ungroup(&mut self, group: GroupId) -> Option<Group> {
        let idx = self.groups.iter().position(|g| g.id == group)?;
        Some(self.groups.remove(idx))
    }

    // ─── Asset library ───────────────────────────────────────────────────

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn add_asset_entry(&mut self, name: &str, source: &str) -> AssetId {
        let id = ObjectId::with_prefix("asset");
        self.assets.push(Asset {
            id,
            name: name.to_owned(),
            source: source.to_owned(),
        });
        id
    }

    /// Point a library entry at new content. Upload completion; `false`
    /// when the entry is gone.
    pub fn set_asset_source(&mut self, asset: AssetId, source: &str) -> bool {
        match self.assets.iter_mut().find(|a| a.id == asset) {
            Some(a) => {
                a.source = source.to_owned();
                true
            }
            None => {
                log::debug!("source for missing asset {asset} dropped");
                false
            }
        }
    }

    /// Number of placements referencing `asset`.
    pub fn placements_of(&self, asset: AssetId) -> usize {
        self.objects
            .iter()
            .filter(|o| o.as_asset().is_some_and(|a| a.asset_id == asset))
            .count()
    }

    /// Remove a library entry. Refused while any placement references it.
    pub fn remove_asset_entry(&mut self, asset: AssetId) -> Result<Asset> {
        let idx = self
            .assets
            .iter()
            .position(|a| a.id == asset)
            .ok_or(ComposeError::UnknownAsset(asset))?;
        let placements = self.placements_of(asset);
        if placements > 0 {
            log::warn!("refusing to remove asset {asset}: {placements} placement(s)");
            return Err(ComposeError::AssetInUse { asset, placements });
        }
        Ok(self.assets.remove(idx))
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    /// Replace the selection with a single object.
    pub fn select(&mut self, id: ObjectId) {
        self.selection.clear();
        if self.object(id).is_some() {
            self.selection.push(id);
        }
    }

    /// Add or remove one object without touching the others.
    pub fn toggle_selection(&mut self, id: ObjectId) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
        } else if self.object(id).is_some() {
            self.selection.push(id);
        }
    }

    pub fn set_selection(&mut self, ids: &[ObjectId]) {
        self.selection.clear();
        for id in ids {
            if self.object(*id).is_some() && !self.selection.contains(id) {
                self.selection.push(*id);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ─── Masks ───────────────────────────────────────────────────────────

    pub fn mask(&self, panel: PanelId) -> Option<&Mask> {
        self.masks.get(&panel)
    }

    /// The panel's mask, created empty on first use.
    pub fn mask_mut(&mut self, panel: PanelId) -> Result<&mut Mask> {
        if self.panel(panel).is_none() {
            return Err(ComposeError::UnknownPanel(panel));
        }
        Ok(self.masks.entry(panel).or_default())
    }

    pub fn set_mask(&mut self, panel: PanelId, mask: Mask) -> Result<()> {
        *self.mask_mut(panel)? = mask;
        Ok(())
    }

    // ─── Global history state ────────────────────────────────────────────

    pub fn history_state(&self) -> HistoryState {
        HistoryState {
            episodes: self.episodes.clone(),
            pages: self.pages.clone(),
            panels: self.panels.clone(),
            objects: self.objects.clone(),
            assets: self.assets.clone(),
            groups: self.groups.clone(),
        }
    }

    /// Restore a captured state. Masks are kept for panels that still
    /// exist; the selection drops ids that no longer exist.
    pub fn restore_history_state(&mut self, state: HistoryState) {
        self.episodes = state.episodes;
        self.pages = state.pages;
        self.panels = state.panels;
        self.objects = state.objects;
        self.assets = state.assets;
        self.groups = state.groups;

        let panels: Vec<PanelId> = self.panels.iter().map(|p| p.id).collect();
        self.masks.retain(|id, _| panels.contains(id));
        let objects = &self.objects;
        self.selection
            .retain(|id| objects.iter().any(|o| o.id() == *id));
    }
}

/// Default box for a new bubble of `bubble_type`.
pub fn default_bubble_size(bubble_type: BubbleType) -> (f32, f32) {
    match bubble_type.family() {
        ShapeFamily::Ellipse | ShapeFamily::Rough | ShapeFamily::Cloud => (220.0, 120.0),
        ShapeFamily::Box => (200.0, 100.0),
        ShapeFamily::Burst => (220.0, 150.0),
    }
}

fn kind_prefix(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Bubble => "bubble",
        ObjectKind::Text => "text",
        ObjectKind::Asset => "placement",
    }
}
