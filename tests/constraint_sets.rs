//! Integration tests for constraint sets: capture, apply, deltas and the
//! `.cset` format.

use constraint_layout::{
    constraint_set::{self, AnchorTarget, ConstraintBundle},
    graph::{Axis, AxisSpec, ChainStyle, CustomValue, MatchDefault, SizeSpec},
    load, resolve, resolve_with_config, AnchorGraph, AnchorKind, AnchorRef, ConfigurationError,
    ConstraintLayout, ConstraintSetStore, ConstraintSnapshot, Delta, DeltaField, LayoutConfig,
    LayoutParticipant, MeasureSpec, ResolutionWarning, ResolveConfig, StaticHost,
};
use pretty_assertions::assert_eq;

/// Declarations that must survive a capture/apply cycle
fn declarations(graph: &AnchorGraph) -> Vec<(String, Vec<(AnchorKind, AnchorRef, f64, f64)>, String, String)> {
    graph
        .nodes()
        .map(|node| {
            let connections = node
                .connections()
                .map(|(kind, c)| (kind, c.target, c.margin, c.gone_margin))
                .collect();
            (
                node.display_name(),
                connections,
                format!("{:?}", node.size),
                format!("{:?}", node.bias),
            )
        })
        .collect()
}

fn sample_graph() -> AnchorGraph {
    let mut graph = AnchorGraph::new();
    let title = graph.add_node(Some("title")).unwrap();
    let body = graph.add_node(Some("body")).unwrap();
    graph
        .connect(
            AnchorRef::new(title, AnchorKind::Start),
            AnchorRef::new(AnchorGraph::ROOT, AnchorKind::Start),
            16.0,
            0.0,
        )
        .unwrap();
    graph
        .connect(
            AnchorRef::new(body, AnchorKind::Top),
            AnchorRef::new(title, AnchorKind::Bottom),
            8.0,
            2.0,
        )
        .unwrap();
    {
        let node = graph.node_mut(title).unwrap();
        node.size.horizontal = AxisSpec {
            size: SizeSpec::MatchConstraint,
            default: MatchDefault::Wrap,
            max: 240.0,
            ..AxisSpec::default()
        };
        node.bias.horizontal = 0.25;
        node.chain_style.vertical = ChainStyle::Packed;
    }
    graph.node_mut(body).unwrap().size.vertical = AxisSpec::fixed(64.0);
    graph
}

// ============================================
// Capture / apply
// ============================================

#[test]
fn test_capture_then_apply_is_identity() {
    let mut graph = sample_graph();
    let before = declarations(&graph);

    let snapshot = constraint_set::capture(&graph, "main", true).unwrap();
    let report = constraint_set::apply(&mut graph, &snapshot, true, true).unwrap();

    assert_eq!(report.applied, 2);
    assert!(report.warnings.is_empty());
    assert_eq!(declarations(&graph), before);
    assert_eq!(constraint_set::capture(&graph, "main", true).unwrap(), snapshot);
}

#[test]
fn test_strict_mode_requires_every_node() {
    let mut graph = sample_graph();
    let mut snapshot = ConstraintSnapshot::new("partial");
    snapshot.insert("title", ConstraintBundle::default());

    let err = constraint_set::apply(&mut graph, &snapshot, false, true).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingSnapshotEntry { ref id, .. } if id == "body"));

    let report = constraint_set::apply(&mut graph, &snapshot, false, false).unwrap();
    assert_eq!(
        report.warnings,
        vec![ResolutionWarning::MissingEntry {
            id: "body".to_string(),
            set: "partial".to_string(),
        }]
    );
}

#[test]
fn test_apply_through_layout_participant() {
    let snapshot = load("set main { a { width: 30 height: 10 left: parent.left + 5 } }")
        .unwrap()
        .select("main", &[] as &[&str])
        .unwrap();

    let mut layout = ConstraintLayout::new(LayoutConfig::default().with_strict_ids(true));
    layout.on_attach(Some("a")).unwrap();
    layout.apply_constraint_set(&snapshot, false).unwrap();

    let mut host = StaticHost::new();
    layout
        .on_measure(MeasureSpec::Exactly(100.0), MeasureSpec::Exactly(50.0), &mut host)
        .unwrap();
    assert_eq!(layout.frame("a").unwrap().x, 5.0);
}

// ============================================
// Deltas
// ============================================

#[test]
fn test_width_delta_overrides_only_width() {
    let mut snapshot = ConstraintSnapshot::new("main");
    let mut bundle = ConstraintBundle::default();
    bundle.connect(AnchorKind::Left, AnchorTarget::new("parent", AnchorKind::Left, 8.0));
    bundle.size.vertical = AxisSpec::fixed(20.0);
    snapshot.insert("a", bundle.clone());

    let delta = Delta::for_id("a").with(DeltaField::Size(Axis::Horizontal, SizeSpec::Fixed(50.0)));
    delta.apply(&mut snapshot).unwrap();

    let mut expected = bundle;
    expected.size.horizontal.size = SizeSpec::Fixed(50.0);
    assert_eq!(snapshot.get("a"), Some(&expected));

    let once = snapshot.clone();
    delta.apply(&mut snapshot).unwrap();
    assert_eq!(snapshot, once);
}

#[test]
fn test_tag_delta_reaches_every_tagged_entry() {
    let mut snapshot = load(
        r#"set main {
            a { tag: "card.primary" }
            b { tag: "card.secondary" }
            c { tag: "header" }
        }"#,
    )
    .unwrap()
    .get("main")
    .map(|s| (*s).clone())
    .unwrap();

    let delta = Delta::for_tag(r"card\..*").with(DeltaField::Custom(
        [("elevated".to_string(), CustomValue::Flag(true))].into_iter().collect(),
    ));
    delta.apply(&mut snapshot).unwrap();

    let elevated: Vec<&str> = snapshot
        .entries()
        .filter(|(_, b)| b.custom.contains_key("elevated"))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(elevated, vec!["a", "b"]);
}

#[test]
fn test_store_delta_leaves_shared_snapshot_untouched() {
    let mut store = load("set main { a { width: 10 } }").unwrap();
    let shared = store.get("main").unwrap();

    let delta = Delta::for_id("a").with(DeltaField::Size(Axis::Horizontal, SizeSpec::Fixed(50.0)));
    let warnings = store.apply_delta("main", &delta).unwrap();
    assert!(warnings.is_empty());

    assert_eq!(shared.get("a").unwrap().size.horizontal.size, SizeSpec::Fixed(10.0));
    assert_eq!(
        store.get("main").unwrap().get("a").unwrap().size.horizontal.size,
        SizeSpec::Fixed(50.0)
    );
}

// ============================================
// Store and variants
// ============================================

#[test]
fn test_variants_are_selected_by_labels() {
    let store: ConstraintSetStore = load(
        r#"
        set main [phone, portrait] { a { width: 10 } }
        set main [tablet] { a { width: 20 } }
        set detail { a { width: 30 } }
        "#,
    )
    .unwrap();

    assert_eq!(store.names().collect::<Vec<_>>(), vec!["detail", "main"]);
    assert_eq!(store.variants("main").len(), 2);
    let tablet = store.select("main", &["tablet"]).unwrap();
    assert_eq!(tablet.get("a").unwrap().size.horizontal, AxisSpec::fixed(20.0));
    assert!(store.select("main", &["tablet", "portrait"]).is_none());
}

// ============================================
// Resolving `.cset` sources
// ============================================

#[test]
fn test_resolved_layout_dump() {
    let layout = resolve(
        r#"set main {
            title { width: 120 height: 40 start: parent.start + 16 top: parent.top + 8 }
            body {
                width: 0
                height: 0
                left: parent.left + 16
                right: parent.right + 16
                top: title.bottom + 8
                bottom: parent.bottom + 16
            }
        }"#,
        MeasureSpec::Exactly(320.0),
        MeasureSpec::Exactly(200.0),
    )
    .unwrap();

    insta::assert_snapshot!(layout.to_string(), @r"
    main 320.0x200.0
      title x=16.0 y=8.0 w=120.0 h=40.0
      body x=16.0 y=56.0 w=288.0 h=128.0
    ");
}

#[test]
fn test_unknown_target_is_reported_as_warning() {
    let layout = resolve(
        "set main { a { width: 10 height: 10 left: missing.right } }",
        MeasureSpec::Exactly(100.0),
        MeasureSpec::Exactly(100.0),
    )
    .unwrap();
    assert!(layout.warnings.contains(&ResolutionWarning::UnknownIdentifier {
        id: "missing".to_string()
    }));
    assert_eq!(layout.frame("a").unwrap().x, 0.0);
}

#[test]
fn test_parse_errors_point_at_source() {
    let source = "set main {\n    a { width 10 }\n}";
    let errors = match resolve_with_config(source, ResolveConfig::new()) {
        Err(constraint_layout::ResolveError::Parse(errors)) => errors,
        other => panic!("Expected parse errors, got {:?}", other),
    };
    assert!(!errors.is_empty());
    let report = errors[0].format(source, "layout.cset");
    assert!(report.contains("layout.cset"));
}
