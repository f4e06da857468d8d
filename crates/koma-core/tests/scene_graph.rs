//! Integration tests: scene graph mutations and document snapshots.

use koma_core::geometry::Viewport;
use koma_core::model::*;
use koma_core::scene::{AssetInit, BubbleInit, PanelStep, SceneGraph, TextInit};
use koma_core::{ComposeError, ObjectId, PanelId};
use pretty_assertions::assert_eq;

const VIEWPORT: Viewport = Viewport {
    x: 0.0,
    y: 0.0,
    width: 800.0,
    height: 400.0,
};

fn make_document() -> (SceneGraph, PanelId) {
    let mut graph = SceneGraph::new();
    let episode = graph.add_episode("Pilot");
    let page = graph.add_page(episode).unwrap();
    let panel = graph.add_panel(page, SizePreset::Wide).unwrap();
    (graph, panel)
}

// ─── Duplicate ──────────────────────────────────────────────────────────

#[test]
fn duplicate_preserves_everything_but_id_and_position() {
    let (mut graph, panel) = make_document();
    let id = graph
        .add_bubble(
            panel,
            BubbleInit {
                bubble_type: BubbleType::Thought,
                text: "Hmm...".into(),
                tail: Some(TailDirection::Right),
                size: None,
            },
            VIEWPORT,
        )
        .unwrap();
    graph
        .update_object(
            id,
            &ObjectPatch {
                rotation: Some(30.0),
                flip_h: Some(true),
                inverted: Some(true),
                font_size: Some(FontSizePolicy::Fixed(18.0)),
                ..Default::default()
            },
        )
        .unwrap();

    let copy_id = graph.duplicate_object(id).unwrap();
    assert_ne!(copy_id, id);

    let original = graph.object(id).unwrap().clone();
    let mut copy = graph.object(copy_id).unwrap().clone();
    assert_eq!(copy.geometry().x, original.geometry().x + 20.0);
    assert_eq!(copy.geometry().y, original.geometry().y + 20.0);

    // Undo the two expected differences and compare the rest.
    let SceneObject::Bubble(b) = &mut copy else {
        panic!("duplicate changed kind");
    };
    b.id = id;
    b.geometry.x -= 20.0;
    b.geometry.y -= 20.0;
    assert_eq!(copy, original);
}

#[test]
fn duplicate_is_not_grouped() {
    let (mut graph, panel) = make_document();
    let a = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let b = graph.add_text(panel, TextInit::default(), VIEWPORT).unwrap();
    graph.group(&[a, b], "pair").unwrap();
    let copy = graph.duplicate_object(a).unwrap();
    assert!(graph.group_of(copy).is_none());
    assert_eq!(graph.group_of(a).unwrap().members.len(), 2);
}

// ─── Delete & selection ─────────────────────────────────────────────────

#[test]
fn deleting_selected_object_clears_selection() {
    let (mut graph, panel) = make_document();
    let a = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    graph.select(a);
    graph.delete_object(a).unwrap();
    assert!(graph.selection().is_empty());
}

#[test]
fn deleting_other_object_keeps_selection() {
    let (mut graph, panel) = make_document();
    let a = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let b = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    graph.select(a);
    graph.delete_object(b).unwrap();
    assert_eq!(graph.selection(), &[a]);
}

#[test]
fn deleting_last_group_member_removes_group() {
    let (mut graph, panel) = make_document();
    let a = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let b = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let group = graph.group(&[a, b], "pair").unwrap();

    graph.delete_object(a).unwrap();
    let remaining = graph.groups().iter().find(|g| g.id == group).unwrap();
    assert_eq!(remaining.members.as_slice(), &[b]);

    graph.delete_object(b).unwrap();
    assert!(graph.groups().is_empty());
}

#[test]
fn regrouping_moves_members() {
    let (mut graph, panel) = make_document();
    let a = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let b = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let c = graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    let first = graph.group(&[a, b], "first").unwrap();
    let second = graph.group(&[b, c], "second").unwrap();

    assert_eq!(graph.group_of(b).unwrap().id, second);
    // `first` keeps only `a`
    assert_eq!(
        graph.groups().iter().find(|g| g.id == first).unwrap().members.as_slice(),
        &[a]
    );

    let third = graph.group(&[a, b, c], "third").unwrap();
    assert_eq!(graph.groups().len(), 1);
    assert_eq!(graph.groups()[0].id, third);
}

// ─── Panels ─────────────────────────────────────────────────────────────

#[test]
fn reorder_panel_swaps_and_stops_at_boundaries() {
    let (mut graph, first) = make_document();
    let page = graph.panel(first).unwrap().page_id;
    let second = graph.add_panel(page, SizePreset::Square).unwrap();
    let third = graph.add_panel(page, SizePreset::Tall).unwrap();

    assert!(!graph.reorder_panel(first, PanelStep::Up).unwrap());
    assert!(!graph.reorder_panel(third, PanelStep::Down).unwrap());

    assert!(graph.reorder_panel(third, PanelStep::Up).unwrap());
    let order: Vec<PanelId> = graph.panels_of(page).iter().map(|p| p.id).collect();
    assert_eq!(order, vec![first, third, second]);

    assert!(graph.reorder_panel(third, PanelStep::Up).unwrap());
    assert!(!graph.reorder_panel(third, PanelStep::Up).unwrap());
    let order: Vec<PanelId> = graph.panels_of(page).iter().map(|p| p.id).collect();
    assert_eq!(order, vec![third, first, second]);
}

#[test]
fn preset_heights_follow_page_width() {
    let (mut graph, panel) = make_document();
    let page = graph.panel(panel).unwrap().page_id;
    let tall = graph.add_panel(page, SizePreset::Tall).unwrap();
    assert_eq!(graph.panel(panel).unwrap().height, 400.0);
    assert_eq!(graph.panel(tall).unwrap().height, 1200.0);
}

// ─── Asset library ──────────────────────────────────────────────────────

#[test]
fn asset_entry_in_use_cannot_be_removed() {
    let (mut graph, panel) = make_document();
    let asset = graph.add_asset_entry("hero", "mem://hero.png");
    let placement = graph
        .add_asset(
            panel,
            AssetInit {
                asset_id: asset,
                natural_size: Some((1000.0, 500.0)),
            },
            VIEWPORT,
        )
        .unwrap();

    let err = graph.remove_asset_entry(asset).unwrap_err();
    assert!(matches!(err, ComposeError::AssetInUse { placements: 1, .. }));

    graph.delete_object(placement).unwrap();
    assert_eq!(graph.remove_asset_entry(asset).unwrap().name, "hero");
}

#[test]
fn new_placement_fits_viewport() {
    let (mut graph, panel) = make_document();
    let asset = graph.add_asset_entry("bg", "mem://bg.png");
    let id = graph
        .add_asset(
            panel,
            AssetInit {
                asset_id: asset,
                natural_size: Some((1000.0, 500.0)),
            },
            VIEWPORT,
        )
        .unwrap();
    let g = graph.object(id).unwrap().geometry();
    // 0.6 · 400 / 500 = 0.48
    assert!((g.width - 480.0).abs() < 1e-3);
    assert!((g.height - 240.0).abs() < 1e-3);
}

#[test]
fn placing_unknown_asset_fails() {
    let (mut graph, panel) = make_document();
    let missing = ObjectId::intern("asset_never_added");
    let result = graph.add_asset(
        panel,
        AssetInit {
            asset_id: missing,
            natural_size: None,
        },
        VIEWPORT,
    );
    assert!(matches!(result, Err(ComposeError::UnknownAsset(_))));
}

// ─── Snapshots ──────────────────────────────────────────────────────────

fn populated_document() -> SceneGraph {
    let (mut graph, panel) = make_document();
    let a = graph
        .add_bubble(
            panel,
            BubbleInit {
                bubble_type: BubbleType::Shout,
                text: "NOW!".into(),
                tail: None,
                size: None,
            },
            VIEWPORT,
        )
        .unwrap();
    let b = graph.add_text(panel, TextInit::default(), VIEWPORT).unwrap();
    graph
        .update_object(
            b,
            &ObjectPatch {
                stroke: Some(Some(TextStroke {
                    width: 2.0,
                    color: Color::WHITE,
                })),
                background: Some(Some(Color::from_hex("#ffee00").unwrap())),
                ..Default::default()
            },
        )
        .unwrap();
    let asset = graph.add_asset_entry("logo", "mem://logo.png");
    graph
        .add_asset(
            panel,
            AssetInit {
                asset_id: asset,
                natural_size: None,
            },
            VIEWPORT,
        )
        .unwrap();
    graph.group(&[a, b], "title").unwrap();
    graph.mask_mut(panel).unwrap().stamp(12.0, 30.0, 18.0);
    graph.set_background(panel, Some("mem://bg.png".into()));
    graph.set_scenes(
        panel,
        SceneLayout::Dynamic,
        vec![("wide shot".into(), None), ("close-up".into(), None)],
    );
    graph
}

#[test]
fn json_snapshot_roundtrips() {
    let graph = populated_document();
    let json = graph.to_json().unwrap();
    let loaded = SceneGraph::from_json(&json).unwrap();
    assert_eq!(loaded, graph);
}

#[test]
fn msgpack_snapshot_roundtrips() {
    let graph = populated_document();
    let bytes = graph.to_msgpack().unwrap();
    let loaded = SceneGraph::from_msgpack(&bytes).unwrap();
    assert_eq!(loaded, graph);
}

#[test]
fn fresh_ids_never_collide_with_loaded_ones() {
    let json = r#"{
        "episodes": [{ "id": "episode_0", "title": "Loaded", "order": 0 }],
        "pages": [{ "id": "page_0", "episode_id": "episode_0", "order": 0, "width": 800.0 }],
        "panels": [
            { "id": "panel_0", "page_id": "page_0", "order": 0,
               "height": 400.0, "size_preset": "wide" },
            { "id": "panel_1", "page_id": "page_0", "order": 1,
               "height": 400.0, "size_preset": "wide" },
            { "id": "panel_2", "page_id": "page_0", "order": 2,
               "height": 400.0, "size_preset": "wide" }
        ],
        "objects": [],
        "assets": [],
        "groups": []
    }"#;
    let mut graph = SceneGraph::from_json(json).unwrap();
    let page = ObjectId::intern("page_0");
    for _ in 0..50 {
        graph.add_panel(page, SizePreset::Wide).unwrap();
    }
    let ids: std::collections::HashSet<PanelId> =
        graph.panels_of(page).iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 53, "a fresh panel id aliased a loaded one");
}

// ─── History state ──────────────────────────────────────────────────────

#[test]
fn history_state_excludes_masks() {
    let (mut graph, panel) = make_document();
    let before = graph.history_state();
    graph.mask_mut(panel).unwrap().stamp(1.0, 1.0, 4.0);
    assert_eq!(graph.history_state(), before);

    graph.add_bubble(panel, BubbleInit::default(), VIEWPORT).unwrap();
    assert_ne!(graph.history_state(), before);
    graph.restore_history_state(before.clone());
    assert_eq!(graph.history_state(), before);
    // mask survives the restore
    assert_eq!(graph.mask(panel).unwrap().dots.len(), 1);
}
