mod common;

use common::{harness, id, record};
use cubeviz::model::layout::grid_position;
use cubeviz::{EngineConfig, EngineEvent, Record};

#[test]
fn test_table_toggle_shows_detail_and_highlights_only_that_item() {
    let mut h = harness(&["1", "2", "3"]);

    h.engine.toggle_selection(&id("2"), true);

    assert_eq!(h.shown(), Some(id("2")));
    assert_eq!(h.scene.highlighted_items(), vec![id("2")]);
    assert_eq!(h.table.checked_ids(), vec![id("2")]);
    for item in h.engine.items().iter() {
        assert_eq!(item.is_highlighted(), item.id == id("2"), "item {}", item.id);
    }

    h.engine.toggle_selection(&id("2"), false);

    assert_eq!(h.shown(), None);
    assert!(h.scene.highlighted_items().is_empty());
    assert!(h.table.checked_ids().is_empty());
    assert!(h.engine.items().iter().all(|item| !item.is_highlighted()));
}

#[test]
fn test_selection_change_is_journaled() {
    let mut h = harness(&["1", "2"]);

    h.engine.toggle_selection(&id("1"), true);
    h.engine.toggle_selection(&id("2"), true);

    let events = h.engine.drain_events();
    assert_eq!(
        events,
        vec![
            EngineEvent::SelectionChanged { last_selected: Some(id("1")), selected: 1 },
            EngineEvent::SelectionChanged { last_selected: Some(id("2")), selected: 2 },
        ]
    );
}

#[test]
fn test_deselecting_last_selected_falls_back_to_newest_survivor() {
    let mut h = harness(&["a", "b", "c"]);
    for raw in ["a", "b", "c"] {
        h.engine.toggle_selection(&id(raw), true);
    }

    h.engine.toggle_selection(&id("c"), false);
    assert_eq!(h.engine.selection().last_selected(), Some(&id("b")));
    assert_eq!(h.shown(), Some(id("b")));

    h.engine.toggle_selection(&id("a"), false);
    assert_eq!(h.engine.selection().last_selected(), Some(&id("b")));
    assert_eq!(h.selected(), vec![id("b")]);
}

#[test]
fn test_reselecting_selected_item_changes_nothing() {
    let mut h = harness(&["1", "2"]);
    h.engine.toggle_selection(&id("1"), true);
    h.engine.toggle_selection(&id("2"), true);
    h.engine.drain_events();

    let change = h.engine.toggle_selection(&id("1"), true);

    assert!(change.is_empty());
    assert_eq!(h.engine.selection().last_selected(), Some(&id("2")));
    assert_eq!(h.shown(), Some(id("2")));
    assert!(h.engine.drain_events().is_empty());
}

#[test]
fn test_selecting_unknown_id_is_reported_as_stale() {
    let mut h = harness(&["1"]);

    let change = h.engine.toggle_selection(&id("ghost"), true);

    assert!(change.is_empty());
    assert!(h.engine.selection().is_empty());
    assert_eq!(h.engine.drain_events(), vec![EngineEvent::StaleReference { item: id("ghost") }]);

    // Deselecting something never selected is simply a no-op.
    assert!(h.engine.toggle_selection(&id("ghost"), false).is_empty());
    assert!(h.engine.drain_events().is_empty());
}

#[test]
fn test_remove_items_prunes_selection_and_visuals() {
    let mut h = harness(&["1", "2", "3"]);
    h.engine.toggle_selection(&id("1"), true);
    h.engine.toggle_selection(&id("3"), true);
    h.engine.drain_events();

    let removed = h.engine.remove_items(&[id("3"), id("missing")]);

    assert_eq!(removed, 1);
    assert_eq!(h.selected(), vec![id("1")]);
    assert_eq!(h.engine.selection().last_selected(), Some(&id("1")));
    assert_eq!(h.shown(), Some(id("1")));
    assert_eq!(h.scene.visual_count(), 2);
    assert!(h.scene.handle_for(&id("3")).is_none());

    let events = h.engine.drain_events();
    assert!(events.contains(&EngineEvent::StaleReference { item: id("missing") }));
    assert!(events.contains(&EngineEvent::SelectionChanged { last_selected: Some(id("1")), selected: 1 }));
    assert_eq!(events.last(), Some(&EngineEvent::ItemsRemoved { items: 1 }));
}

#[test]
fn test_removing_every_selected_item_clears_detail() {
    let mut h = harness(&["1", "2"]);
    h.engine.toggle_selection(&id("2"), true);

    h.engine.remove_items(&[id("2")]);

    assert!(h.engine.selection().is_empty());
    assert_eq!(h.shown(), None);
    assert!(h.scene.highlighted_items().is_empty());
}

#[test]
fn test_reload_keeps_surviving_selection_on_new_visuals() {
    let mut h = harness(&["1", "2", "3"]);
    h.engine.toggle_selection(&id("1"), true);
    h.engine.toggle_selection(&id("2"), true);
    let old_handle = h.scene.handle_for(&id("2")).unwrap();

    h.load(&["2", "4"]);

    assert_eq!(h.selected(), vec![id("2")]);
    assert_eq!(h.engine.selection().last_selected(), Some(&id("2")));
    assert_ne!(h.scene.handle_for(&id("2")), Some(old_handle));
    assert_eq!(h.scene.highlighted_items(), vec![id("2")]);
    assert_eq!(h.table.checked_ids(), vec![id("2")]);
    assert_eq!(h.shown(), Some(id("2")));
    assert_eq!(h.scene.visual_count(), 2);
}

#[test]
fn test_clear_selection_resets_every_view() {
    let mut h = harness(&["1", "2", "3"]);
    for raw in ["1", "2", "3"] {
        h.engine.toggle_selection(&id(raw), true);
    }

    let change = h.engine.clear_selection();

    assert_eq!(change.removed.len(), 3);
    assert!(h.engine.selection().is_empty());
    assert!(h.table.checked_ids().is_empty());
    assert!(h.scene.highlighted_items().is_empty());
    assert_eq!(h.shown(), None);
}

#[test]
fn test_load_dataset_lays_items_on_grid() {
    let mut h = harness(&[]);
    let json = r#"[{"code":"x","n":1},{"code":"y","n":2},{"code":"z","n":3}]"#;
    let records = Record::list_from_json(json, "code").unwrap();

    h.engine.load_dataset(records);

    let config = EngineConfig::default();
    let positions: Vec<_> = h.engine.items().iter().map(|item| item.position).collect();
    let expected: Vec<_> = (0..3)
        .map(|n| grid_position(n, config.grid_columns, config.grid_spacing))
        .collect();
    assert_eq!(positions, expected);
    assert_eq!(h.engine.drain_events(), vec![EngineEvent::DatasetLoaded { items: 3 }]);
}

#[test]
fn test_selection_starts_camera_follow_toward_item() {
    let mut h = harness(&["1", "2"]);
    let start = h.engine.viewpoint_position();

    h.engine.toggle_selection(&id("2"), true);
    let report = h.step();

    assert!(report.following);
    let target = common::item_position(1);
    assert!(h.engine.viewpoint_position().distance(target) < start.distance(target));
    assert_eq!(h.detail.shown(), Some(record("2")));
}

#[test]
fn test_item_near_viewpoint_uses_hit_radius() {
    let mut h = harness(&[]);
    let eye = h.engine.viewpoint_position();
    h.engine.load_positioned(vec![
        (record("far"), eye + glam::Vec3::new(0.0, 0.0, -1.5)),
        (record("near"), eye + glam::Vec3::new(0.0, 0.0, -0.5)),
    ]);

    let near = h.engine.item_near_viewpoint().map(|item| item.id.clone());

    assert_eq!(near, Some(id("near")));
}
