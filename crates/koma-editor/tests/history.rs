//! Integration tests: global undo/redo and clipboard through the composer.

use koma_core::model::*;
use koma_core::scene::{BubbleInit, PanelStep, TextInit};
use koma_core::{ComposeError, PageId, PanelId, SceneGraph};
use koma_editor::{Composer, InputEvent, Modifiers};
use pretty_assertions::assert_eq;

const CMD: Modifiers = Modifiers {
    shift: false,
    ctrl: true,
    alt: false,
    meta: false,
};

fn two_panels() -> (Composer, PageId, PanelId, PanelId) {
    let mut graph = SceneGraph::new();
    let ep = graph.add_episode("Pilot");
    let page = graph.add_page(ep).unwrap();
    let a = graph.add_panel(page, SizePreset::Wide).unwrap();
    let b = graph.add_panel(page, SizePreset::Square).unwrap();
    (Composer::new(graph), page, a, b)
}

#[test]
fn undo_n_then_redo_n_is_exact() {
    let (mut c, page, _, _) = two_panels();
    let mut states = vec![c.graph().history_state()];

    let bubble = c.add_bubble(BubbleInit::default()).unwrap();
    states.push(c.graph().history_state());
    c.add_text(TextInit::default()).unwrap();
    states.push(c.graph().history_state());
    c.update_object(bubble, &ObjectPatch::position(40.0, 60.0)).unwrap();
    states.push(c.graph().history_state());
    c.duplicate_selected();
    states.push(c.graph().history_state());
    c.add_panel(page, SizePreset::Tall).unwrap();
    states.push(c.graph().history_state());
    c.reorder_active_panel(PanelStep::Down).unwrap();
    states.push(c.graph().history_state());

    let n = states.len() - 1;
    for i in (0..n).rev() {
        assert!(c.undo());
        assert_eq!(c.graph().history_state(), states[i]);
    }
    assert!(!c.undo());

    for state in states.iter().skip(1) {
        assert!(c.redo());
        assert_eq!(&c.graph().history_state(), state);
    }
    assert!(!c.redo());
}

#[test]
fn new_edit_after_undo_drops_redo() {
    let (mut c, _, _, _) = two_panels();
    c.add_bubble(BubbleInit::default()).unwrap();
    c.add_bubble(BubbleInit::default()).unwrap();
    assert!(c.undo());
    assert!(c.can_redo());

    c.add_text(TextInit::default()).unwrap();
    assert!(!c.can_redo());
}

#[test]
fn history_is_bounded() {
    let mut graph = SceneGraph::new();
    let mut config = graph.config().clone();
    config.history_depth = 3;
    graph.set_config(config);
    let ep = graph.add_episode("Pilot");
    let page = graph.add_page(ep).unwrap();
    graph.add_panel(page, SizePreset::Wide).unwrap();
    let mut c = Composer::new(graph);

    for _ in 0..5 {
        c.add_bubble(BubbleInit::default()).unwrap();
    }
    let mut undone = 0;
    while c.undo() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(c.graph().objects_in_panel(c.active_panel().unwrap()).len(), 2);
}

#[test]
fn keyboard_undo_and_redo() {
    let (mut c, _, a, _) = two_panels();
    c.add_bubble(BubbleInit::default()).unwrap();
    assert!(c.handle(&InputEvent::key("z", CMD)));
    assert!(c.graph().objects_in_panel(a).is_empty());

    let redo = Modifiers { shift: true, ..CMD };
    assert!(c.handle(&InputEvent::key("z", redo)));
    assert_eq!(c.graph().objects_in_panel(a).len(), 1);
}

#[test]
fn delete_key_needs_a_selection() {
    let (mut c, _, a, _) = two_panels();
    let id = c.add_bubble(BubbleInit::default()).unwrap();
    c.clear_selection();
    assert!(!c.handle(&InputEvent::key("Delete", Modifiers::NONE)));
    assert!(c.graph().object(id).is_some());

    c.select_all();
    assert!(c.handle(&InputEvent::key("Backspace", Modifiers::NONE)));
    assert!(c.graph().objects_in_panel(a).is_empty());
    assert!(c.graph().selection().is_empty());
}

#[test]
fn grouping_keys_round_trip() {
    let (mut c, _, _, _) = two_panels();
    let x = c.add_bubble(BubbleInit::default()).unwrap();
    let y = c.add_text(TextInit::default()).unwrap();
    c.select_all();
    assert!(c.handle(&InputEvent::key("g", CMD)));
    assert!(c.graph().group_of(x).is_some_and(|g| g.members.contains(&y)));

    let ungroup = Modifiers { shift: true, ..CMD };
    assert!(c.handle(&InputEvent::key("g", ungroup)));
    assert!(c.graph().group_of(x).is_none());
}

#[test]
fn grouping_a_single_object_is_refused() {
    let (mut c, _, _, _) = two_panels();
    c.add_bubble(BubbleInit::default()).unwrap();
    let before = c.graph().history_state();
    assert!(matches!(c.group_selection("Solo"), Err(ComposeError::InvalidGroup)));
    assert_eq!(c.graph().history_state(), before);
}

#[test]
fn copy_paste_into_another_panel() {
    let (mut c, _, a, b) = two_panels();
    let bubble = c.add_bubble(BubbleInit::default()).unwrap();
    assert_eq!(c.copy_selection(), 1);

    assert!(c.set_active_panel(b));
    assert!(c.graph().selection().is_empty());
    let pasted = c.paste().unwrap();

    assert_eq!(pasted.len(), 1);
    assert_eq!(c.graph().selection(), pasted.as_slice());
    assert_eq!(c.graph().object(pasted[0]).unwrap().panel_id(), b);
    assert_eq!(c.graph().objects_in_panel(a).len(), 1);
    assert!(c.graph().object(bubble).is_some());

    assert!(c.undo());
    assert!(c.graph().objects_in_panel(b).is_empty());
}

#[test]
fn cut_removes_and_paste_restores() {
    let (mut c, _, a, _) = two_panels();
    c.add_bubble(BubbleInit::default()).unwrap();
    assert!(c.handle(&InputEvent::key("x", CMD)));
    assert!(c.graph().objects_in_panel(a).is_empty());
    assert!(c.handle(&InputEvent::key("v", CMD)));
    assert_eq!(c.graph().objects_in_panel(a).len(), 1);
}

#[test]
fn panel_navigation_clears_selection() {
    let (mut c, _, a, b) = two_panels();
    c.add_bubble(BubbleInit::default()).unwrap();
    assert!(c.handle(&InputEvent::key("]", Modifiers::NONE)));
    assert_eq!(c.active_panel(), Some(b));
    assert!(c.graph().selection().is_empty());
    assert!(c.step_active_panel(false));
    assert_eq!(c.active_panel(), Some(a));
    assert!(!c.step_active_panel(false));
}

#[test]
fn deleting_the_active_panel_moves_to_a_sibling() {
    let (mut c, _, a, b) = two_panels();
    c.delete_panel(a).unwrap();
    assert_eq!(c.active_panel(), Some(b));

    assert!(c.undo());
    assert!(c.graph().panel(a).is_some());
    assert_eq!(c.active_panel(), Some(b));
}

#[test]
fn edits_without_a_panel_are_refused() {
    let mut c = Composer::new(SceneGraph::new());
    assert!(c.active_panel().is_none());
    assert!(matches!(c.add_bubble(BubbleInit::default()), Err(ComposeError::NoActivePanel)));
    assert!(!c.can_undo());
}
