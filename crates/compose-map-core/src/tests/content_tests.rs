use super::*;
use crate::path;

#[derive(Debug, Clone, PartialEq)]
struct Pin {
    label: &'static str,
    explicit: Option<&'static str>,
}

impl ContentPayload for Pin {
    fn explicit_id(&self) -> Option<&str> {
        self.explicit
    }
}

fn pin(label: &'static str) -> ContentNode<Pin> {
    ContentNode::leaf(Pin {
        label,
        explicit: None,
    })
}

fn named(label: &'static str, id: &'static str) -> ContentNode<Pin> {
    ContentNode::leaf(Pin {
        label,
        explicit: Some(id),
    })
}

fn visited_paths(tree: &ContentNode<Pin>) -> Vec<(String, &'static str)> {
    let mut out = Vec::new();
    tree.visit(&mut |path, payload| out.push((path.to_string(), payload.label)));
    out
}

#[test]
fn composite_children_use_their_index() {
    let tree = ContentNode::composite([pin("a"), ContentNode::composite([pin("b"), pin("c")])]);
    assert_eq!(
        visited_paths(&tree),
        vec![
            ("[0]".to_owned(), "a"),
            ("[1,0]".to_owned(), "b"),
            ("[1,1]".to_owned(), "c"),
        ]
    );
}

#[test]
fn repeated_items_are_keyed_by_id() {
    let build = |ids: &[&'static str]| {
        ContentNode::composite([ContentNode::for_each(ids.to_vec(), |id| *id, |id| pin(id))])
    };
    let first = build(&["a", "b", "c"]);
    let reordered = build(&["c", "a"]);

    let first_ids: Vec<ResolvedId> = first
        .resolve()
        .expect("unique ids")
        .into_iter()
        .map(|leaf| leaf.id)
        .collect();
    let second_ids: Vec<ResolvedId> = reordered
        .resolve()
        .expect("unique ids")
        .into_iter()
        .map(|leaf| leaf.id)
        .collect();

    assert_eq!(first_ids[0], ResolvedId::Positional(path![0, "a"]));
    assert_eq!(second_ids[1], first_ids[0]);
    assert_eq!(second_ids[0], first_ids[2]);
}

#[test]
fn end_to_end_identity_matches_documented_shape() {
    let tree = ContentNode::composite([ContentNode::for_each(["a"], |id| *id, |id| pin(id))]);
    let leaves = tree.resolve().expect("unique ids");
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].path.to_string(), r#"[0,"a"]"#);
}

#[test]
fn conditional_arms_never_share_ids() {
    let tree_for = |flag: bool| {
        ContentNode::composite([ContentNode::either(flag, || pin("on"), || pin("off"))])
    };
    let on = tree_for(true).resolve().expect("ids")[0].id.clone();
    let off = tree_for(false).resolve().expect("ids")[0].id.clone();
    assert_ne!(on, off);
    assert_eq!(on.to_string(), "[0,then]");
    assert_eq!(off.to_string(), "[0,else]");
}

#[test]
fn optional_without_content_has_no_leaves() {
    let tree: ContentNode<Pin> = ContentNode::optional(None);
    assert_eq!(tree.leaf_count(), 0);
}

#[test]
fn explicit_ids_override_position() {
    let tree = ContentNode::composite([pin("a"), named("b", "route-layer")]);
    let leaves = tree.resolve().expect("ids");
    assert_eq!(leaves[1].id, ResolvedId::Explicit("route-layer".to_owned()));
    assert_eq!(leaves[1].path, path![1]);
}

#[test]
fn same_shape_resolves_identically_every_time() {
    let build = || {
        ContentNode::composite([
            pin("a"),
            ContentNode::for_each([1, 2], |id| *id, |_| pin("item")),
            ContentNode::optional(Some(pin("extra"))),
        ])
    };
    let first: Vec<ResolvedId> = build()
        .resolve()
        .expect("ids")
        .into_iter()
        .map(|leaf| leaf.id)
        .collect();
    let second: Vec<ResolvedId> = build()
        .resolve()
        .expect("ids")
        .into_iter()
        .map(|leaf| leaf.id)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn duplicate_repeated_keys_are_rejected() {
    let tree = ContentNode::for_each(["a", "a"], |id| *id, |id| pin(id));
    let err = tree.resolve().expect_err("duplicate key must fail");
    assert_eq!(
        err,
        ContentError::DuplicateId {
            id: ResolvedId::Positional(path!["a"]),
            first: path!["a"],
            second: path!["a"],
        }
    );
}

#[test]
fn duplicate_explicit_ids_report_both_paths() {
    let tree = ContentNode::composite([named("a", "layer"), pin("b"), named("c", "layer")]);
    match tree.resolve() {
        Err(ContentError::DuplicateId { id, first, second }) => {
            assert_eq!(id, ResolvedId::Explicit("layer".to_owned()));
            assert_eq!(first, path![0]);
            assert_eq!(second, path![2]);
        }
        other => panic!("expected duplicate id error, got {other:?}"),
    }
}

#[test]
fn string_ids_are_derived_from_the_path() {
    let id = ResolvedId::Positional(path![0, "a", Branch::Second]);
    assert_eq!(id.string_id("map"), "map-0-a-~else");
    assert_eq!(ResolvedId::from("explicit").string_id("map"), "explicit");
}

#[test]
fn string_ids_keep_distinct_paths_apart() {
    let pairs = [
        (path![0, ItemKey::Int(1)], path![0, "1"]),
        (path![0, "a-b"], path![0, "a", "b"]),
        (path![0, 1], path![0, ItemKey::Int(1)]),
        (path![0, Branch::First], path![0, "~then"]),
        (path![0, ItemKey::Int(-1)], path![0, "", ItemKey::Int(1)]),
    ];
    for (left, right) in pairs {
        assert_ne!(
            left.string_id("map"),
            right.string_id("map"),
            "{left} and {right} share a string id"
        );
    }
    assert_eq!(path![0, "a-b"].string_id("map"), "map-0-a%2Db");
    assert_eq!(path![ItemKey::Int(7), "7"].string_id("map"), "map-#7-%37");
}

#[derive(Debug)]
enum Scoped {
    Layer(&'static str),
    View(&'static str),
}

impl ContentPayload for Scoped {
    fn explicit_id(&self) -> Option<&str> {
        match self {
            Scoped::Layer(id) | Scoped::View(id) => Some(id),
        }
    }

    fn id_namespace(&self) -> &'static str {
        match self {
            Scoped::Layer(_) => "layer",
            Scoped::View(_) => "view",
        }
    }
}

#[test]
fn explicit_ids_are_unique_per_namespace() {
    let tree = ContentNode::composite([
        ContentNode::leaf(Scoped::Layer("pins")),
        ContentNode::leaf(Scoped::View("pins")),
    ]);
    let leaves = tree.resolve().expect("different namespaces");
    assert_eq!(leaves.len(), 2);
    assert!(leaves
        .iter()
        .all(|leaf| leaf.id == ResolvedId::Explicit("pins".to_owned())));

    let clash = ContentNode::composite([
        ContentNode::leaf(Scoped::View("pins")),
        ContentNode::leaf(Scoped::Layer("pins")),
        ContentNode::leaf(Scoped::View("pins")),
    ]);
    match clash.resolve() {
        Err(ContentError::DuplicateId { first, second, .. }) => {
            assert_eq!(first, path![0]);
            assert_eq!(second, path![2]);
        }
        other => panic!("expected duplicate id error, got {other:?}"),
    }
}
