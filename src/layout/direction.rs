//! Writing-direction resolution
//!
//! Converts declared Start/End anchors into physical Left/Right ones. The
//! result is stored separately from the declarations, so resolving again
//! with the same direction always yields the same effective constraints.

use crate::graph::{
    AnchorGraph, AnchorKind, AnchorRef, BarrierSide, Connection, GuidelinePosition, Node,
    NodeKind, Orientation, ResolvedHorizontal,
};

fn to_physical(connection: &Connection, rtl: bool) -> Connection {
    Connection {
        target: AnchorRef::new(connection.target.node, connection.target.kind.to_physical(rtl)),
        ..*connection
    }
}

fn mirror_guideline(position: GuidelinePosition, rtl: bool) -> GuidelinePosition {
    if !rtl {
        return position;
    }
    match position {
        GuidelinePosition::Percent(p) => GuidelinePosition::Percent(1.0 - p),
        GuidelinePosition::Begin(d) => GuidelinePosition::End(d),
        GuidelinePosition::End(d) => GuidelinePosition::Begin(d),
    }
}

fn physical_barrier_side(side: BarrierSide, rtl: bool) -> BarrierSide {
    match (side, rtl) {
        (BarrierSide::Start, false) | (BarrierSide::End, true) => BarrierSide::Left,
        (BarrierSide::Start, true) | (BarrierSide::End, false) => BarrierSide::Right,
        (other, _) => other,
    }
}

/// Compute the effective horizontal constraints of `node`
///
/// Start/End take precedence over Left/Right whenever either is declared;
/// otherwise Left/Right pass through unchanged. Left-to-right, a declared
/// Left/Right still wins over the logical anchor mapped onto the same side.
/// Right-to-left, declared Left/Right are dropped once Start or End is present.
pub fn resolve(node: &Node, rtl: bool) -> ResolvedHorizontal {
    let mut resolved = ResolvedHorizontal {
        bias: node.bias.horizontal,
        ..ResolvedHorizontal::default()
    };

    let start = node.connection(AnchorKind::Start);
    let end = node.connection(AnchorKind::End);
    if start.is_some() || end.is_some() {
        for (kind, connection) in [(AnchorKind::Start, start), (AnchorKind::End, end)] {
            let Some(connection) = connection else {
                continue;
            };
            let side = kind.to_physical(rtl);
            let effective = match node.connection(side) {
                Some(physical) if !rtl => *physical,
                _ => to_physical(connection, rtl),
            };
            match side {
                AnchorKind::Left => resolved.left = Some(effective),
                _ => resolved.right = Some(effective),
            }
        }
        if rtl {
            resolved.bias = 1.0 - resolved.bias;
            resolved.mirrored = true;
        }
    } else {
        resolved.left = node.connection(AnchorKind::Left).map(|c| to_physical(c, rtl));
        resolved.right = node.connection(AnchorKind::Right).map(|c| to_physical(c, rtl));
    }

    match &node.kind {
        NodeKind::Guideline(guideline) => {
            let mirrored = guideline.orientation == Orientation::Vertical && guideline.use_rtl;
            resolved.guideline = Some(mirror_guideline(guideline.position, rtl && mirrored));
        }
        NodeKind::Barrier(barrier) => {
            resolved.barrier_side = Some(physical_barrier_side(barrier.side, rtl));
        }
        _ => {}
    }

    resolved
}

/// Resolve every node of the graph in place
pub fn resolve_all(graph: &mut AnchorGraph, rtl: bool) {
    for node in graph.nodes_mut() {
        node.resolution.horizontal = resolve(node, rtl);
    }
}
