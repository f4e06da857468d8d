//! Object clipboard.
//!
//! Copies are deep. Pasting re-inserts them under fresh ids into any
//! panel, offset from where they were, and rebuilds groups among the
//! pasted copies.

use koma_core::geometry::clamp_into;
use koma_core::model::{HasGeometry, SceneObject};
use koma_core::{ComposeError, GroupId, ObjectId, PanelId, SceneGraph};
use std::collections::HashMap;

/// Copied objects with the group each belonged to.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    entries: Vec<(SceneObject, Option<GroupId>)>,
    /// Names of the copied groups.
    group_names: HashMap<GroupId, String>,
}

impl Clipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replace the clipboard with deep copies of `ids`, in stacking order.
    /// Unknown ids are skipped. Returns the number copied.
    pub fn copy(&mut self, graph: &SceneGraph, ids: &[ObjectId]) -> usize {
        self.entries.clear();
        self.group_names.clear();

        let mut objects: Vec<&SceneObject> =
            ids.iter().filter_map(|id| graph.object(*id)).collect();
        objects.sort_by_key(|o| o.z_index().unwrap_or(0));
        for object in objects {
            let group = graph.group_of(object.id()).map(|g| {
                self.group_names.entry(g.id).or_insert_with(|| g.name.clone());
                g.id
            });
            self.entries.push((object.clone(), group));
        }
        log::debug!("copied {} object(s)", self.entries.len());
        self.entries.len()
    }

    /// Insert the copies into `panel` under fresh ids, moved by
    /// `(offset, offset)` and clamped inside the panel's inner margin.
    /// Copies that shared a group are grouped again when at least two of
    /// them were copied. Returns the new ids, selected by the caller.
    pub fn paste(
        &self,
        graph: &mut SceneGraph,
        panel: PanelId,
        offset: f32,
    ) -> Result<Vec<ObjectId>, ComposeError> {
        let inner = graph.panel_inner(panel).ok_or(ComposeError::UnknownPanel(panel))?;
        let mut pasted = Vec::with_capacity(self.entries.len());
        // first-seen order, so groups are recreated in stacking order
        let mut regroup: Vec<(GroupId, Vec<ObjectId>)> = Vec::new();

        for (object, group) in &self.entries {
            let mut copy = object.clone();
            let g = copy.geometry_mut();
            let moved = clamp_into(
                koma_core::Rect::new(g.x + offset, g.y + offset, g.width, g.height),
                inner,
            );
            g.x = moved.x;
            g.y = moved.y;
            let id = graph.insert_object(copy, panel)?;
            if let Some(group) = group {
                match regroup.iter_mut().find(|(g, _)| g == group) {
                    Some((_, members)) => members.push(id),
                    None => regroup.push((*group, vec![id])),
                }
            }
            pasted.push(id);
        }

        for (old, members) in regroup {
            if members.len() < 2 {
                continue;
            }
            let name = self.group_names.get(&old).map_or("Group", String::as_str);
            graph.group(&members, name)?;
        }
        log::debug!("pasted {} object(s) into {panel}", pasted.len());
        Ok(pasted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use koma_core::geometry::Viewport;
    use koma_core::model::SizePreset;
    use koma_core::scene::{BubbleInit, TextInit};
    use pretty_assertions::assert_eq;

    #[test]
    fn paste_into_other_panel_remaps_ids_and_regroups() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let a = graph.add_panel(page, SizePreset::Square).unwrap();
        let b = graph.add_panel(page, SizePreset::Square).unwrap();
        let vp = Viewport::whole(800.0, 800.0);
        let bubble = graph.add_bubble(a, BubbleInit::default(), vp).unwrap();
        let text = graph.add_text(a, TextInit::default(), vp).unwrap();
        graph.group(&[bubble, text], "Pair").unwrap();

        let mut clipboard = Clipboard::new();
        assert_eq!(clipboard.copy(&graph, &[bubble, text]), 2);
        let pasted = clipboard.paste(&mut graph, b, 20.0).unwrap();

        assert_eq!(pasted.len(), 2);
        assert!(!pasted.contains(&bubble) && !pasted.contains(&text));
        let original = graph.object(bubble).unwrap().geometry();
        let copy = graph.object(pasted[0]).unwrap();
        assert_eq!(copy.panel_id(), b);
        assert_eq!((copy.geometry().x, copy.geometry().y), (original.x + 20.0, original.y + 20.0));

        let group = graph.group_of(pasted[0]).unwrap();
        assert_eq!(group.name, "Pair");
        assert!(group.members.contains(&pasted[1]));
        // the source group is untouched
        assert!(graph.group_of(bubble).unwrap().members.contains(&text));
    }

    #[test]
    fn pasted_groups_are_recreated_in_stacking_order() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let panel = graph.add_panel(page, SizePreset::Square).unwrap();
        let vp = Viewport::whole(800.0, 800.0);
        let mut ids = Vec::new();
        for _ in 0..2 {
            ids.push(graph.add_bubble(panel, BubbleInit::default(), vp).unwrap());
            ids.push(graph.add_text(panel, TextInit::default(), vp).unwrap());
        }
        graph.group(&ids[2..], "Back").unwrap();
        graph.group(&ids[..2], "Front").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.copy(&graph, &ids);
        for _ in 0..3 {
            clipboard.paste(&mut graph, panel, 10.0).unwrap();
        }

        let names: Vec<&str> = graph.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Back", "Front", "Front", "Back", "Front", "Back", "Front", "Back"]);
    }

    #[test]
    fn paste_clamps_to_margin() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let panel = graph.add_panel(page, SizePreset::Wide).unwrap();
        let id = graph
            .add_bubble(panel, BubbleInit::default(), Viewport::whole(800.0, 400.0))
            .unwrap();
        let mut clipboard = Clipboard::new();
        clipboard.copy(&graph, &[id]);

        let pasted = clipboard.paste(&mut graph, panel, 5000.0).unwrap();
        let g = graph.object(pasted[0]).unwrap().geometry();
        assert_eq!(g.x + g.width, 800.0 - 18.0);
        assert_eq!(g.y + g.height, 400.0 - 18.0);
    }

    #[test]
    fn single_member_copies_are_not_grouped() {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("e");
        let page = graph.add_page(ep).unwrap();
        let panel = graph.add_panel(page, SizePreset::Wide).unwrap();
        let vp = Viewport::whole(800.0, 400.0);
        let a = graph.add_bubble(panel, BubbleInit::default(), vp).unwrap();
        let b = graph.add_bubble(panel, BubbleInit::default(), vp).unwrap();
        graph.group(&[a, b], "G").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.copy(&graph, &[a]);
        let pasted = clipboard.paste(&mut graph, panel, 20.0).unwrap();
        assert!(graph.group_of(pasted[0]).is_none());
    }
}
