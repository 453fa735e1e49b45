use super::*;
use compose_map_core::path;
use compose_map_renderer::{
    Coordinate, HeadlessMapRenderer, HostOperation, RendererCall, RendererError,
};

fn pin(id: &str, lat: f64) -> Annotation {
    Annotation::new(id, Geometry::Point(Coordinate::new(lat, 0.0)))
}

fn pins(ids: &[&str]) -> AnnotationGroup {
    AnnotationGroup::new(
        AnnotationKind::Point,
        ids.iter().map(|id| pin(id, 1.0)).collect(),
    )
}

fn declared<'a>(group: &'a AnnotationGroup) -> DeclaredGroup<'a> {
    let id = ResolvedId::Positional(path![0]);
    DeclaredGroup {
        layer_id: id.string_id("test"),
        id,
        group,
    }
}

fn reconcile(
    reconciler: &mut AnnotationGroupReconciler,
    renderer: &mut HeadlessMapRenderer,
    groups: &[DeclaredGroup<'_>],
) -> (AnnotationStats, Vec<ApplyFailure>) {
    let mut stats = AnnotationStats::default();
    let mut failures = Vec::new();
    reconciler.reconcile(renderer, groups, &mut stats, &mut failures);
    (stats, failures)
}

#[test]
fn new_group_creates_source_layer_and_one_diff() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = pins(&["a", "b"]).layer_property("icon-size", 1.5);

    let (stats, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);

    assert!(failures.is_empty());
    assert_eq!(stats.groups.created, 1);
    assert_eq!(stats.items.created, 2);
    assert!(renderer.has_source("test-0-source"));
    let layer = renderer.layer("test-0").expect("layer created");
    assert_eq!(layer.kind, LayerKind::Symbol);
    assert_eq!(layer.source, "test-0-source");
    assert_eq!(layer.properties.get("icon-size"), Some(&Value::from(1.5)));
    assert_eq!(
        renderer.count_calls(|call| matches!(call, RendererCall::ApplySourceDiff { .. })),
        1
    );
    let ids: Vec<&str> = renderer
        .source_features("test-0-source")
        .expect("source")
        .into_iter()
        .map(|feature| feature.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn unchanged_group_issues_no_renderer_calls() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = pins(&["a", "b"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    renderer.clear_calls();

    let again = pins(&["a", "b"]);
    let (stats, _) = reconcile(&mut reconciler, &mut renderer, &[declared(&again)]);

    assert!(renderer.calls().is_empty());
    assert!(stats.groups.is_empty());
    assert!(stats.items.is_empty());
}

#[test]
fn item_changes_are_sent_as_a_single_diff() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = pins(&["a", "b", "c"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    renderer.clear_calls();

    let next = AnnotationGroup::new(
        AnnotationKind::Point,
        vec![pin("a", 1.0), pin("b", 2.0), pin("d", 1.0)],
    );
    let (stats, _) = reconcile(&mut reconciler, &mut renderer, &[declared(&next)]);

    let calls = renderer.take_calls();
    assert_eq!(calls.len(), 1);
    let RendererCall::ApplySourceDiff { diff, .. } = &calls[0] else {
        panic!("expected a source diff, got {calls:?}");
    };
    assert_eq!(diff.removed, vec!["c".to_owned()]);
    assert_eq!(diff.updated.len(), 1);
    assert_eq!(diff.updated[0].id, "b");
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.added[0].id, "d");
    assert_eq!(stats.groups.updated, 1);
    assert_eq!(
        stats.items,
        ReconcileStats {
            created: 1,
            updated: 1,
            destroyed: 1
        }
    );
}

#[test]
fn selection_survives_redeclaration_but_not_removal() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = pins(&["a", "b"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    let id = ResolvedId::Positional(path![0]);

    assert!(reconciler.set_item_selected(&id, &ItemKey::from("a"), true));
    assert!(!reconciler.set_item_selected(&id, &ItemKey::from("zzz"), true));

    let reordered = pins(&["b", "a"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&reordered)]);
    assert_eq!(reconciler.selected_items(&id), vec![ItemKey::from("a")]);

    let without_a = pins(&["b"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&without_a)]);
    let back = pins(&["a", "b"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&back)]);
    assert!(reconciler.selected_items(&id).is_empty());
}

#[test]
fn draggable_flag_is_seeded_once_then_owned_by_the_manager() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let id = ResolvedId::Positional(path![0]);
    let group = AnnotationGroup::new(AnnotationKind::Point, vec![pin("a", 1.0).draggable(true)]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    assert!(reconciler.set_item_draggable(&id, &ItemKey::from("a"), false));

    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);

    let manager = reconciler.manager(&id).expect("manager");
    assert!(!manager.items()[0].is_draggable);
}

#[test]
fn duplicate_item_ids_keep_the_first_declaration() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = AnnotationGroup::new(
        AnnotationKind::Circle,
        vec![pin("a", 1.0), pin("a", 5.0), pin("b", 1.0)],
    );

    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);

    let features = renderer.source_features("test-0-source").expect("source");
    assert_eq!(features.len(), 2);
    assert_eq!(
        features[0].geometry,
        Geometry::Point(Coordinate::new(1.0, 0.0))
    );
}

#[test]
fn kind_change_recreates_the_backing_manager() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let points = pins(&["a"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&points)]);
    renderer.clear_calls();

    let circles = AnnotationGroup::new(AnnotationKind::Circle, vec![pin("a", 1.0)]);
    let (stats, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&circles)]);

    assert!(failures.is_empty());
    assert_eq!(stats.groups.destroyed, 1);
    assert_eq!(stats.groups.created, 1);
    assert_eq!(
        renderer.layer("test-0").map(|layer| layer.kind),
        Some(LayerKind::Circle)
    );
    let calls = renderer.take_calls();
    assert_eq!(
        calls[..2],
        [
            RendererCall::RemoveLayer {
                id: "test-0".to_owned()
            },
            RendererCall::RemoveSource {
                id: "test-0-source".to_owned()
            },
        ]
    );
}

#[test]
fn layer_settings_are_updated_only_when_changed() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = pins(&["a"]).slot("top");
    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    renderer.clear_calls();

    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    assert!(renderer.calls().is_empty());

    let moved = pins(&["a"]).slot("middle").layer_property("icon-opacity", 0.5);
    reconcile(&mut reconciler, &mut renderer, &[declared(&moved)]);
    assert_eq!(
        renderer.count_calls(|call| matches!(call, RendererCall::UpdateLayer { .. })),
        1
    );
    assert_eq!(
        renderer.layer("test-0").and_then(|layer| layer.slot.clone()),
        Some("middle".to_owned())
    );
}

#[test]
fn set_items_diffs_against_the_held_list() {
    let mut renderer = HeadlessMapRenderer::new();
    let group = pins(&[]);
    let mut manager = BackingAnnotationManager::create(&mut renderer, "direct".to_owned(), &group)
        .expect("create");
    let managed = |annotations: Vec<Annotation>| -> Vec<ManagedAnnotation> {
        annotations
            .into_iter()
            .map(|annotation| ManagedAnnotation {
                annotation,
                is_selected: false,
                is_draggable: false,
            })
            .collect()
    };

    let first = manager
        .set_items(&mut renderer, managed(vec![pin("a", 1.0), pin("b", 1.0)]))
        .expect("first diff");
    assert_eq!(
        first,
        ItemChanges {
            added: 2,
            updated: 0,
            removed: 0
        }
    );

    let second = manager
        .set_items(&mut renderer, managed(vec![pin("b", 3.0), pin("c", 1.0)]))
        .expect("second diff");
    assert_eq!(
        second,
        ItemChanges {
            added: 1,
            updated: 1,
            removed: 1
        }
    );
    let held: Vec<String> = manager
        .items()
        .iter()
        .map(|item| item.annotation.id.to_id_string())
        .collect();
    assert_eq!(held, vec!["b".to_owned(), "c".to_owned()]);

    renderer.clear_calls();
    let unchanged = manager
        .set_items(&mut renderer, managed(vec![pin("b", 3.0), pin("c", 1.0)]))
        .expect("no diff");
    assert!(unchanged.is_empty());
    assert!(renderer.calls().is_empty());
}

#[test]
fn layer_position_change_moves_the_layer_once() {
    let mut renderer = HeadlessMapRenderer::new();
    renderer.add_source("base-source").expect("source");
    renderer
        .add_layer(&LayerSpec {
            id: "base".to_owned(),
            kind: LayerKind::Fill,
            source: "base-source".to_owned(),
            position: LayerPosition::Top,
            slot: None,
            properties: Properties::new(),
        })
        .expect("base layer");
    let mut reconciler = AnnotationGroupReconciler::new();
    let on_top = pins(&["a"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&on_top)]);
    assert_eq!(renderer.layer_ids(), vec!["base", "test-0"]);
    renderer.clear_calls();

    let below = pins(&["a"]).layer_position(LayerPosition::Below("base".into()));
    renderer.fail_next(
        HostOperation::MoveLayer,
        RendererError::Rejected {
            operation: "move_layer",
            reason: "style reloading".into(),
        },
    );
    let (_, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&below)]);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, "move_layer");
    assert_eq!(renderer.layer_ids(), vec!["base", "test-0"]);

    let (stats, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&below)]);
    assert!(failures.is_empty());
    assert_eq!(stats.groups.updated, 1);
    assert_eq!(renderer.layer_ids(), vec!["test-0", "base"]);
    assert_eq!(
        renderer.count_calls(|call| matches!(call, RendererCall::MoveLayer { .. })),
        2
    );
    assert_eq!(
        renderer.count_calls(|call| matches!(call, RendererCall::UpdateLayer { .. })),
        0
    );

    renderer.clear_calls();
    reconcile(&mut reconciler, &mut renderer, &[declared(&below)]);
    assert!(renderer.calls().is_empty());
}

#[test]
fn failed_layer_leaves_no_source_and_is_retried() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    renderer.fail_next(
        HostOperation::AddLayer,
        RendererError::Rejected {
            operation: "add_layer",
            reason: "style not loaded".to_owned(),
        },
    );
    let group = pins(&["a"]);

    let (stats, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, "add_layer");
    assert_eq!(stats.groups.created, 0);
    assert!(!renderer.has_source("test-0-source"));
    assert!(reconciler.is_empty());

    let (stats, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    assert!(failures.is_empty());
    assert_eq!(stats.groups.created, 1);
    assert!(renderer.layer("test-0").is_some());
}

#[test]
fn failed_diff_keeps_previous_items_for_retry() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let group = pins(&["a"]);
    reconcile(&mut reconciler, &mut renderer, &[declared(&group)]);
    renderer.fail_next(
        HostOperation::ApplySourceDiff,
        RendererError::Rejected {
            operation: "apply_source_diff",
            reason: "busy".to_owned(),
        },
    );

    let grown = pins(&["a", "b"]);
    let (_, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&grown)]);
    assert_eq!(failures.len(), 1);
    let id = ResolvedId::Positional(path![0]);
    assert_eq!(reconciler.manager(&id).expect("manager").items().len(), 1);

    let (stats, failures) = reconcile(&mut reconciler, &mut renderer, &[declared(&grown)]);
    assert!(failures.is_empty());
    assert_eq!(stats.items.created, 1);
    assert_eq!(
        renderer.source_features("test-0-source").map(|f| f.len()),
        Some(2)
    );
}

#[test]
fn absent_groups_are_destroyed_and_teardown_clears_the_rest() {
    let mut renderer = HeadlessMapRenderer::new();
    let mut reconciler = AnnotationGroupReconciler::new();
    let first = pins(&["a"]);
    let second = pins(&["b"]).layer_id("named");
    let second_declared = DeclaredGroup {
        id: ResolvedId::from("named"),
        layer_id: "named".to_owned(),
        group: &second,
    };
    reconcile(
        &mut reconciler,
        &mut renderer,
        &[declared(&first), second_declared],
    );
    assert_eq!(reconciler.len(), 2);

    let only_named = DeclaredGroup {
        id: ResolvedId::from("named"),
        layer_id: "named".to_owned(),
        group: &second,
    };
    let (stats, _) = reconcile(&mut reconciler, &mut renderer, &[only_named]);
    assert_eq!(stats.groups.destroyed, 1);
    assert!(renderer.layer("test-0").is_none());
    assert!(!renderer.has_source("test-0-source"));

    let mut failures = Vec::new();
    assert_eq!(reconciler.teardown(&mut renderer, &mut failures), 1);
    assert!(failures.is_empty());
    assert!(renderer.layer_ids().is_empty());
    assert!(!renderer.has_source("named-source"));
}
