//! End-to-end behaviour of the resolution passes.
//!
//! Direction resolution, gone margins, ratios, chains and the measurement
//! cache, exercised through the public graph API and `.cset` sources.

use constraint_layout::{
    graph::{AxisSpec, SizeSpec, Visibility},
    layout::direction,
    resolve, resolve_with_config, AnchorGraph, AnchorKind, AnchorRef, BoundingBox, ConstraintLayout,
    LayoutConfig, LayoutDirection, LayoutParticipant, MeasureSpec, NodeId, ResolveConfig, ResolvedLayout,
    StaticHost,
};
use pretty_assertions::assert_eq;

fn exact(width: f64, height: f64) -> ResolveConfig {
    ResolveConfig::new().with_container(MeasureSpec::Exactly(width), MeasureSpec::Exactly(height))
}

fn resolve_exact(source: &str, width: f64, height: f64) -> ResolvedLayout {
    resolve(source, MeasureSpec::Exactly(width), MeasureSpec::Exactly(height)).expect("Should resolve")
}

fn connect(graph: &mut AnchorGraph, from: NodeId, kind: AnchorKind, to: NodeId, target: AnchorKind, margin: f64) {
    graph
        .connect(AnchorRef::new(from, kind), AnchorRef::new(to, target), margin, 0.0)
        .expect("Should connect");
}

// ============================================
// Direction resolution
// ============================================

#[test]
fn test_direction_resolution_is_idempotent() {
    let mut graph = AnchorGraph::new();
    let a = graph.add_node(Some("a")).unwrap();
    let b = graph.add_node(Some("b")).unwrap();
    connect(&mut graph, a, AnchorKind::Start, AnchorGraph::ROOT, AnchorKind::Start, 16.0);
    connect(&mut graph, a, AnchorKind::End, b, AnchorKind::Start, 8.0);
    connect(&mut graph, b, AnchorKind::Left, a, AnchorKind::Right, 0.0);
    graph.node_mut(a).unwrap().bias.horizontal = 0.3;

    for rtl in [false, true] {
        for id in [a, b] {
            let node = graph.node(id).unwrap();
            assert_eq!(direction::resolve(node, rtl), direction::resolve(node, rtl));
        }
        direction::resolve_all(&mut graph, rtl);
        let first: Vec<_> = graph.nodes().map(|n| n.resolution().horizontal.clone()).collect();
        direction::resolve_all(&mut graph, rtl);
        let second: Vec<_> = graph.nodes().map(|n| n.resolution().horizontal.clone()).collect();
        assert_eq!(first, second);
    }
}

#[test]
fn test_left_kept_left_to_right_start_used_right_to_left() {
    let mut graph = AnchorGraph::new();
    let x = graph.add_node(Some("x")).unwrap();
    let y = graph.add_node(Some("y")).unwrap();
    let a = graph.add_node(Some("a")).unwrap();
    connect(&mut graph, a, AnchorKind::Left, x, AnchorKind::Right, 5.0);
    connect(&mut graph, a, AnchorKind::Start, y, AnchorKind::End, 7.0);

    let ltr = direction::resolve(graph.node(a).unwrap(), false);
    let left = ltr.left.expect("Left side should be constrained");
    assert_eq!(left.target, AnchorRef::new(x, AnchorKind::Right));
    assert_eq!(left.margin, 5.0);

    let rtl = direction::resolve(graph.node(a).unwrap(), true);
    let right = rtl.right.expect("Right side should be constrained");
    assert_eq!(right.target, AnchorRef::new(y, AnchorKind::Left));
    assert_eq!(right.margin, 7.0);
    assert!(rtl.left.is_none(), "Left->x must not be used under RTL");
}

#[test]
fn test_rtl_mirrors_start_anchored_nodes() {
    let source = r#"set main {
        a { width: 40 height: 10 start: parent.start + 16 }
    }"#;
    let ltr = resolve_exact(source, 200.0, 100.0);
    assert_eq!(ltr.frame("a").unwrap().x, 16.0);

    let config = exact(200.0, 100.0).with_direction(LayoutDirection::RightToLeft);
    let rtl = resolve_with_config(source, config).unwrap();
    assert_eq!(rtl.frame("a").unwrap().right(), 184.0);
}

// ============================================
// Dimension negotiation
// ============================================

#[test]
fn test_ratio_round_trip() {
    let layout = resolve_exact(
        r#"set main {
            a { width: 0 height: 100 ratio: "2:1" left: parent.left top: parent.top }
        }"#,
        400.0,
        300.0,
    );
    let frame = layout.frame("a").unwrap();
    assert_eq!((frame.width, frame.height), (200.0, 100.0));
    assert!(layout.stats.corrective <= 1, "at most one corrective remeasure");
}

#[test]
fn test_gone_margin_on_every_side() {
    // `g` is collapsed at (100, 100); each neighbour uses its own gone margin
    let layout = resolve_exact(
        r#"set main {
            s { width: 100 height: 100 left: parent.left top: parent.top }
            g { width: 30 height: 30 left: s.right top: s.bottom visibility: gone }
            r { width: 10 height: 10 left: g.right + 16 gone 4 }
            l { width: 10 height: 10 right: g.left + 16 gone 6 }
            b { width: 10 height: 10 top: g.bottom + 16 gone 8 }
            t { width: 10 height: 10 bottom: g.top + 16 gone 2 }
        }"#,
        400.0,
        400.0,
    );
    assert!(layout.frame("g").is_none(), "collapsed nodes are not placed");
    assert_eq!(layout.frame("r").unwrap().x, 104.0);
    assert_eq!(layout.frame("l").unwrap().right(), 94.0);
    assert_eq!(layout.frame("b").unwrap().y, 108.0);
    assert_eq!(layout.frame("t").unwrap().bottom(), 98.0);
}

#[test]
fn test_gone_margin_defaults_to_zero() {
    let layout = resolve_exact(
        r#"set main {
            g { width: 30 height: 30 left: parent.left + 50 visibility: gone }
            r { width: 10 height: 10 left: g.right + 16 }
        }"#,
        400.0,
        400.0,
    );
    // a collapsed source drops its own margin too
    assert_eq!(layout.frame("r").unwrap().x, 0.0);
}

#[test]
fn test_wrapping_panel_converges_on_both_axes() {
    // content wider than the anchors on one axis, spread on the other
    let layout = resolve_with_config(
        r#"set main {
            panel {
                width: 0 width_default: wrap
                height: 0
                left: parent.left + 10 right: parent.right + 10
                top: parent.top bottom: parent.bottom
                custom.content_width: 500
                custom.content_height: 50
            }
        }"#,
        exact(320.0, 200.0).with_layout(LayoutConfig::default().with_max_passes(8)),
    )
    .unwrap();

    insta::assert_snapshot!(layout.to_string(), @r"
    main 320.0x200.0
      panel x=10.0 y=0.0 w=300.0 h=200.0
    ");
    assert!(layout.stats.rounds <= 3, "took {} rounds", layout.stats.rounds);
    assert!(layout.stats.host_calls <= layout.stats.rounds);
}

#[test]
fn test_wrapping_panel_keeps_narrow_content() {
    let layout = resolve_exact(
        r#"set main {
            panel {
                width: 0 width_default: wrap
                height: 0
                left: parent.left + 10 right: parent.right + 10
                top: parent.top bottom: parent.bottom
                custom.content_width: 120
                custom.content_height: 50
            }
        }"#,
        320.0,
        200.0,
    );
    assert_eq!(layout.frame("panel").unwrap(), BoundingBox::new(100.0, 0.0, 120.0, 200.0));
}

#[test]
fn test_disabling_cache_only_changes_host_calls() {
    let source = r#"set main {
        title { width: 0 height: 24 left: parent.left + 8 right: parent.right + 8 top: parent.top }
        body {
            width: wrap_content
            width_constrained: true
            left: parent.left right: parent.right
            top: title.bottom + 4
            custom.content_width: 500
            custom.content_height: 40
        }
        thumb { width: 0 height: 60 ratio: "4:3" left: parent.left top: body.bottom }
        label { baseline: thumb.baseline left: thumb.right + 4 custom.content_width: 30 custom.content_height: 12 custom.baseline: 9 }
    }"#;

    let cached = resolve_with_config(source, exact(320.0, 480.0)).unwrap();
    let uncached = resolve_with_config(
        source,
        exact(320.0, 480.0).with_layout(LayoutConfig::default().with_measure_cache(false)),
    )
    .unwrap();

    assert_eq!(cached.frames, uncached.frames);
    assert_eq!(cached.size, uncached.size);
    assert_eq!(uncached.stats.cache_hits, 0);
    assert!(uncached.stats.host_calls >= cached.stats.host_calls);
}

#[test]
fn test_constrained_wrap_content_shrinks_to_anchors() {
    let layout = resolve_exact(
        r#"set main {
            body {
                width_constrained: true
                left: parent.left + 10 right: parent.right + 10
                custom.content_width: 500
                custom.content_height: 20
            }
        }"#,
        320.0,
        100.0,
    );
    assert_eq!(layout.frame("body").unwrap(), BoundingBox::new(10.0, 0.0, 300.0, 20.0));
}

// ============================================
// Chains
// ============================================

#[test]
fn test_packed_chain_with_zero_bias_puts_slack_last() {
    let layout = resolve_exact(
        r#"set main {
            a { width: 40 height: 10 left: parent.left right: b.left horizontal_chain: packed horizontal_bias: 0 }
            b { width: 40 height: 10 left: a.right right: c.left }
            c { width: 40 height: 10 left: b.right right: parent.right }
        }"#,
        300.0,
        100.0,
    );
    let xs: Vec<f64> = ["a", "b", "c"].iter().map(|id| layout.frame(id).unwrap().x).collect();
    assert_eq!(xs, vec![0.0, 40.0, 80.0]);
    assert_eq!(layout.frame("c").unwrap().right(), 120.0);
}

#[test]
fn test_packed_chain_is_headed_by_start_node_right_to_left() {
    let source = r#"set main {
        a { width: 40 height: 10 start: parent.start end: b.start horizontal_chain: packed horizontal_bias: 0 }
        b { width: 40 height: 10 start: a.end end: c.start }
        c { width: 40 height: 10 start: b.end end: parent.end }
    }"#;

    let ltr = resolve_exact(source, 300.0, 100.0);
    let xs: Vec<f64> = ["a", "b", "c"].iter().map(|id| ltr.frame(id).unwrap().x).collect();
    assert_eq!(xs, vec![0.0, 40.0, 80.0]);

    let rtl = resolve_with_config(source, exact(300.0, 100.0).with_direction(LayoutDirection::RightToLeft)).unwrap();
    insta::assert_snapshot!(rtl.to_string(), @r"
    main 300.0x100.0
      a x=260.0 y=0.0 w=40.0 h=10.0
      b x=220.0 y=0.0 w=40.0 h=10.0
      c x=180.0 y=0.0 w=40.0 h=10.0
    ");
}

#[test]
fn test_spread_chain_distributes_evenly() {
    let layout = resolve_exact(
        r#"set main {
            a { width: 40 height: 10 left: parent.left right: b.left }
            b { width: 40 height: 10 left: a.right right: parent.right }
        }"#,
        200.0,
        100.0,
    );
    assert_eq!(layout.frame("a").unwrap().x, 40.0);
    assert_eq!(layout.frame("b").unwrap().x, 120.0);
}

#[test]
fn test_weighted_chain_shares_space() {
    let layout = resolve_exact(
        r#"set main {
            a { width: 0 height: 10 left: parent.left right: b.left horizontal_weight: 1 }
            b { width: 0 height: 10 left: a.right right: parent.right horizontal_weight: 3 }
        }"#,
        200.0,
        100.0,
    );
    assert_eq!(layout.frame("a").unwrap().width, 50.0);
    assert_eq!(layout.frame("b").unwrap().width, 150.0);
}

// ============================================
// Helpers
// ============================================

#[test]
fn test_barrier_tracks_widest_member() {
    let layout = resolve_exact(
        r#"set main {
            short { width: 40 height: 10 left: parent.left top: parent.top }
            long { width: 90 height: 10 left: parent.left top: short.bottom }
            edge: barrier(end) { refs: "short, long" }
            value { width: 30 height: 10 left: edge.right + 8 }
        }"#,
        300.0,
        100.0,
    );
    assert_eq!(layout.frame("value").unwrap().x, 98.0);
}

#[test]
fn test_percent_guideline_positions_nodes() {
    let layout = resolve_exact(
        r#"set main {
            half: guideline(vertical) { percent: 0.5 }
            right_pane { width: 0 height: 10 left: half.left right: parent.right }
        }"#,
        300.0,
        100.0,
    );
    assert_eq!(layout.frame("right_pane").unwrap(), BoundingBox::new(150.0, 0.0, 150.0, 10.0));
}

// ============================================
// Participant lifecycle
// ============================================

#[test]
fn test_participant_lifecycle_with_static_host() {
    let mut layout = ConstraintLayout::new(LayoutConfig::default());
    let a = layout.on_attach(Some("a")).unwrap();
    {
        let node = layout.graph_mut().node_mut(a).unwrap();
        node.size.horizontal = AxisSpec::new(SizeSpec::MatchParent);
        node.size.vertical = AxisSpec::fixed(20.0);
    }

    let mut host = StaticHost::new();
    layout
        .on_measure(MeasureSpec::Exactly(120.0), MeasureSpec::Exactly(80.0), &mut host)
        .unwrap();
    layout.on_layout_complete(&mut host);
    assert_eq!(host.placed(), &[("a".to_string(), BoundingBox::new(0.0, 0.0, 120.0, 20.0))]);

    layout.graph_mut().node_mut(a).unwrap().visibility = Visibility::Collapsed;
    let mut host = StaticHost::new();
    layout
        .on_measure(MeasureSpec::Exactly(120.0), MeasureSpec::Exactly(80.0), &mut host)
        .unwrap();
    layout.on_layout_complete(&mut host);
    assert!(host.placed().is_empty());
}
