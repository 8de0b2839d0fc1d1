//! Chain identification
//!
//! A chain is not stored: it is a run of nodes linked by bidirectional
//! end-to-start connections on one axis. The start-most node is the head and
//! carries the style and bias for the whole chain: the physically first node,
//! or the physically last one when the chain was declared with logical anchors
//! and resolved right-to-left.

use std::collections::HashSet;

use super::node::{Axis, ChainStyle, Node, NodeId};
use super::AnchorGraph;

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub axis: Axis,
    /// Members in physical order, left-most or top-most first
    pub members: Vec<NodeId>,
    /// The head sits at the physical end of `members`
    pub reversed: bool,
}

impl Chain {
    pub fn head(&self) -> NodeId {
        if self.reversed {
            self.members[self.members.len() - 1]
        } else {
            self.members[0]
        }
    }

    pub fn tail(&self) -> NodeId {
        if self.reversed {
            self.members[0]
        } else {
            self.members[self.members.len() - 1]
        }
    }

    pub fn style(&self, graph: &AnchorGraph) -> ChainStyle {
        graph
            .get(self.head())
            .map(|n| n.chain_style[self.axis])
            .unwrap_or_default()
    }

    pub fn bias(&self, graph: &AnchorGraph) -> f64 {
        graph
            .get(self.head())
            .map(|n| match self.axis {
                Axis::Horizontal => n.resolution.horizontal.bias,
                Axis::Vertical => n.bias.vertical,
            })
            .unwrap_or(0.5)
    }
}

/// The node linked after `node` on `axis`, if the link is bidirectional
fn next_link(graph: &AnchorGraph, node: &Node, axis: Axis) -> Option<NodeId> {
    let (start, end) = axis.sides();
    let forward = node.effective(end)?;
    if forward.target.kind != start || forward.target.node == AnchorGraph::ROOT {
        return None;
    }
    let other = graph.get(forward.target.node)?;
    let back = other.effective(start)?;
    (back.target.node == node.id && back.target.kind == end).then_some(other.id)
}

fn prev_link(graph: &AnchorGraph, node: &Node, axis: Axis) -> Option<NodeId> {
    let (start, end) = axis.sides();
    let backward = node.effective(start)?;
    if backward.target.kind != end || backward.target.node == AnchorGraph::ROOT {
        return None;
    }
    let other = graph.get(backward.target.node)?;
    let forward = other.effective(end)?;
    (forward.target.node == node.id && forward.target.kind == start).then_some(other.id)
}

pub(crate) fn find_chains(graph: &AnchorGraph, axis: Axis) -> Vec<Chain> {
    let mut chains = Vec::new();
    let mut seen = HashSet::new();

    for node in graph.nodes().filter(|n| !n.kind.is_virtual()) {
        if seen.contains(&node.id) || prev_link(graph, node, axis).is_some() {
            continue;
        }
        let Some(mut next) = next_link(graph, node, axis) else {
            continue;
        };

        let mut members = vec![node.id];
        seen.insert(node.id);
        while seen.insert(next) {
            members.push(next);
            match graph.get(next).and_then(|n| next_link(graph, n, axis)) {
                Some(following) => next = following,
                None => break,
            }
        }
        let reversed = axis == Axis::Horizontal
            && members
                .last()
                .and_then(|&id| graph.get(id))
                .is_some_and(|n| n.resolution.horizontal.mirrored);
        chains.push(Chain { axis, members, reversed });
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AnchorKind, AnchorRef};
    use crate::layout::direction;

    fn link(graph: &mut AnchorGraph, a: NodeId, b: NodeId) {
        graph
            .connect(AnchorRef::new(a, AnchorKind::Right), AnchorRef::new(b, AnchorKind::Left), 0.0, 0.0)
            .unwrap();
        graph
            .connect(AnchorRef::new(b, AnchorKind::Left), AnchorRef::new(a, AnchorKind::Right), 0.0, 0.0)
            .unwrap();
    }

    #[test]
    fn test_three_node_chain() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let b = graph.add_node(Some("b")).unwrap();
        let c = graph.add_node(Some("c")).unwrap();
        link(&mut graph, a, b);
        link(&mut graph, b, c);
        direction::resolve_all(&mut graph, false);

        let chains = graph.chains(Axis::Horizontal);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].members, vec![a, b, c]);
        assert_eq!(chains[0].head(), a);
        assert_eq!(chains[0].tail(), c);
        assert!(graph.chains(Axis::Vertical).is_empty());
    }

    #[test]
    fn test_right_to_left_chain_is_headed_by_start_node() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let b = graph.add_node(Some("b")).unwrap();
        let c = graph.add_node(Some("c")).unwrap();
        for (from, to) in [(a, b), (b, c)] {
            graph
                .connect(AnchorRef::new(from, AnchorKind::End), AnchorRef::new(to, AnchorKind::Start), 0.0, 0.0)
                .unwrap();
            graph
                .connect(AnchorRef::new(to, AnchorKind::Start), AnchorRef::new(from, AnchorKind::End), 0.0, 0.0)
                .unwrap();
        }
        {
            let head = graph.node_mut(a).unwrap();
            head.chain_style.horizontal = ChainStyle::Packed;
            head.bias.horizontal = 0.0;
        }

        direction::resolve_all(&mut graph, false);
        let ltr = graph.chains(Axis::Horizontal);
        assert_eq!(ltr[0].members, vec![a, b, c]);
        assert_eq!((ltr[0].head(), ltr[0].tail()), (a, c));
        assert_eq!(ltr[0].bias(&graph), 0.0);

        direction::resolve_all(&mut graph, true);
        let rtl = graph.chains(Axis::Horizontal);
        assert_eq!(rtl[0].members, vec![c, b, a]);
        assert_eq!((rtl[0].head(), rtl[0].tail()), (a, c));
        assert_eq!(rtl[0].style(&graph), ChainStyle::Packed);
        assert_eq!(rtl[0].bias(&graph), 1.0);
    }

    #[test]
    fn test_one_way_link_is_not_a_chain() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let b = graph.add_node(Some("b")).unwrap();
        graph
            .connect(AnchorRef::new(b, AnchorKind::Left), AnchorRef::new(a, AnchorKind::Right), 0.0, 0.0)
            .unwrap();
        direction::resolve_all(&mut graph, false);
        assert!(graph.chains(Axis::Horizontal).is_empty());
    }

    #[test]
    fn test_cyclic_links_terminate() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let b = graph.add_node(Some("b")).unwrap();
        link(&mut graph, a, b);
        link(&mut graph, b, a);
        direction::resolve_all(&mut graph, false);
        // every node has a predecessor, so no head is found
        assert!(graph.chains(Axis::Horizontal).is_empty());
    }
}
