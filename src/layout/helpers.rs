//! Helper nodes and their membership
//!
//! Helpers reference other nodes by identifier. Membership is rebuilt from
//! those identifiers at the start of every pass; identifiers that cannot be
//! resolved yet are skipped with a warning and retried on the next pass.
//! The lifecycle hooks run in helper registration order.

use std::collections::HashMap;

use tracing::debug;

use crate::graph::{
    AnchorGraph, Axis, BarrierSide, DimensionBehavior, GuidelinePosition, NodeId, NodeKind, Transform,
    Visibility,
};

use super::context::LayoutContext;
use super::error::ResolutionWarning;
use super::measure::MeasureRecords;
use super::types::BoundingBox;

/// Barrier state handed to the solver
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierSpec {
    /// Physical side after writing-direction resolution
    pub side: BarrierSide,
    pub margin: f64,
    pub allows_gone: bool,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Default, Clone)]
pub struct HelperRegistry {
    order: Vec<NodeId>,
    memberships: HashMap<NodeId, Vec<NodeId>>,
    /// Identifiers bound late, consulted when the graph does not know a name
    aliases: HashMap<String, NodeId>,
    barriers: HashMap<NodeId, BarrierSpec>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an identifier to a node for helpers that cannot find it by name
    pub fn bind_alias(&mut self, id: impl Into<String>, node: NodeId) {
        self.aliases.insert(id.into(), node);
    }

    /// Members of a helper from the last rebuild
    pub fn members(&self, helper: NodeId) -> &[NodeId] {
        self.memberships.get(&helper).map_or(&[], Vec::as_slice)
    }

    pub fn barrier(&self, helper: NodeId) -> Option<&BarrierSpec> {
        self.barriers.get(&helper)
    }

    /// Helpers in registration order
    pub fn helpers(&self) -> &[NodeId] {
        &self.order
    }

    fn resolve(&self, graph: &AnchorGraph, reference: &str) -> Option<NodeId> {
        graph
            .lookup(reference)
            .or_else(|| self.aliases.get(reference).copied())
    }

    /// Rebuild every helper's membership and run the pre-layout hooks
    pub fn rebuild(&mut self, graph: &mut AnchorGraph, context: &LayoutContext) -> Vec<ResolutionWarning> {
        self.order.clear();
        self.memberships.clear();
        self.barriers.clear();
        self.aliases.retain(|_, node| graph.contains(*node));

        let declared: Vec<(NodeId, String, Vec<String>)> = graph
            .helpers()
            .map(|h| (h.id(), h.display_name(), h.kind.refs().to_vec()))
            .collect();

        let mut warnings = Vec::new();
        for (id, name, refs) in declared {
            let mut members = Vec::new();
            let references = refs
                .iter()
                .flat_map(|r| r.split(','))
                .map(str::trim)
                .filter(|r| !r.is_empty());
            for reference in references {
                match self.resolve(graph, reference) {
                    Some(member) => {
                        if member != id && member != AnchorGraph::ROOT && !members.contains(&member) {
                            members.push(member);
                        }
                    }
                    None => warnings.push(
                        ResolutionWarning::UnresolvedMember {
                            helper: name.clone(),
                            id: reference.to_string(),
                        }
                        .emit(),
                    ),
                }
            }
            debug!(helper = %name, members = members.len(), "helper membership rebuilt");
            self.order.push(id);
            self.memberships.insert(id, members);
            self.update_constraints(graph, id);
        }

        self.update_pre_layout(graph, context);
        warnings
    }

    /// Hand the membership to the solver-facing representation
    fn update_constraints(&mut self, graph: &AnchorGraph, helper: NodeId) {
        let Some(node) = graph.get(helper) else {
            return;
        };
        if let NodeKind::Barrier(barrier) = &node.kind {
            let spec = BarrierSpec {
                side: node.resolution().horizontal.barrier_side.unwrap_or(barrier.side),
                margin: barrier.margin,
                allows_gone: barrier.allows_gone,
                members: self.members(helper).to_vec(),
            };
            self.barriers.insert(helper, spec);
        }
    }

    /// Before measuring: propagate group state, reactive guidelines and placeholder content
    pub fn update_pre_layout(&self, graph: &mut AnchorGraph, context: &LayoutContext) {
        for &helper in &self.order {
            let Some(node) = graph.get(helper) else {
                continue;
            };
            match &node.kind {
                NodeKind::Group(_) => {
                    let visibility = node.effective_visibility();
                    let elevation = node.transform.elevation;
                    for &member in self.members(helper) {
                        if let Some(member) = graph.get_mut(member) {
                            member.resolution.visibility = Some(visibility);
                            if elevation > 0.0 {
                                member.transform.elevation = elevation;
                            }
                        }
                    }
                }
                NodeKind::Guideline(guideline) => {
                    let Some(offset) = guideline.reactive.as_deref().and_then(|key| context.shared.get(key)) else {
                        continue;
                    };
                    if let Some(node) = graph.get_mut(helper) {
                        node.resolution.horizontal.guideline = Some(GuidelinePosition::Begin(offset));
                    }
                }
                NodeKind::Placeholder(_) => {
                    let content = self.members(helper).first().copied();
                    if let Some(content) = content.and_then(|id| graph.get_mut(id)) {
                        content.resolution.visibility = Some(Visibility::Collapsed);
                        content.resolution.placeholder_content = true;
                    }
                    if content.is_none() {
                        if let Some(node) = graph.get_mut(helper) {
                            node.resolution.adopted_size = None;
                        }
                    }
                }
                NodeKind::Plain | NodeKind::Barrier(_) | NodeKind::Layer(_) => {}
            }
        }
    }

    /// After a solve round: placeholders take over their content's measured size
    ///
    /// Returns true when a placeholder changed size, which requires another round.
    pub fn update_post_measure(&self, graph: &mut AnchorGraph, records: &MeasureRecords, tolerance: f64) -> bool {
        let mut changed = false;
        for &helper in &self.order {
            if !matches!(graph.get(helper).map(|n| &n.kind), Some(NodeKind::Placeholder(_))) {
                continue;
            }
            let Some(content) = self.members(helper).first().and_then(|&id| records.get(id)) else {
                continue;
            };
            let adopted = content.measured;
            let Some(placeholder) = graph.get_mut(helper) else {
                continue;
            };
            let adopts_content = Axis::BOTH
                .into_iter()
                .any(|axis| placeholder.behavior(axis).behavior == DimensionBehavior::Content);
            if !adopts_content {
                continue;
            }
            let differs = placeholder
                .resolution
                .adopted_size
                .map_or(true, |previous| !previous.approx_eq(&adopted, tolerance));
            if differs {
                placeholder.resolution.adopted_size = Some(adopted);
                changed = true;
            }
        }
        changed
    }

    /// After placement: layers wrap their members, placeholder content takes the placeholder's frame
    pub fn update_post_layout(&self, graph: &mut AnchorGraph) {
        for &helper in &self.order {
            let Some(node) = graph.get(helper) else {
                continue;
            };
            match &node.kind {
                NodeKind::Layer(layer) => {
                    let padding = layer.padding;
                    let bounds = union_of(
                        self.members(helper)
                            .iter()
                            .filter_map(|&id| graph.get(id))
                            .filter(|member| !member.is_collapsed())
                            .map(|member| member.frame()),
                    );
                    if let (Some(bounds), Some(node)) = (bounds, graph.get_mut(helper)) {
                        node.resolution.frame = bounds.inflate(padding);
                    }
                }
                NodeKind::Placeholder(_) => {
                    let frame = node.frame();
                    if let Some(content) = self.members(helper).first().and_then(|&id| graph.get_mut(id)) {
                        content.resolution.frame = frame;
                    }
                }
                _ => {}
            }
        }
    }

    /// Before drawing: layers rotate and scale their members around the layer center
    pub fn update_pre_draw(&self, graph: &mut AnchorGraph) {
        for &helper in &self.order {
            let Some(node) = graph.get(helper) else {
                continue;
            };
            if !matches!(node.kind, NodeKind::Layer(_)) || node.transform == Transform::default() {
                continue;
            }
            let layer = node.transform;
            let pivot = node.frame();
            let (center_x, center_y) = (pivot.center_x(), pivot.center_y());
            let (sin, cos) = layer.rotation.to_radians().sin_cos();

            for &member in self.members(helper) {
                let Some(member) = graph.get_mut(member) else {
                    continue;
                };
                let frame = member.frame();
                let dx = (frame.center_x() - center_x) * layer.scale_x;
                let dy = (frame.center_y() - center_y) * layer.scale_y;
                let moved_x = center_x + dx * cos - dy * sin;
                let moved_y = center_y + dx * sin + dy * cos;

                member.transform.rotation = layer.rotation;
                member.transform.scale_x = layer.scale_x;
                member.transform.scale_y = layer.scale_y;
                member.transform.translation_x = moved_x - frame.center_x() + layer.translation_x;
                member.transform.translation_y = moved_y - frame.center_y() + layer.translation_y;
            }
        }
    }
}

/// Bounding box of the given frames, or `None` when there are none
pub fn union_of(frames: impl IntoIterator<Item = BoundingBox>) -> Option<BoundingBox> {
    frames.into_iter().reduce(|acc, frame| acc.union(&frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Barrier, Group, Guideline, Layer, Orientation, Placeholder};
    use crate::layout::direction;

    fn barrier(refs: &[&str]) -> NodeKind {
        NodeKind::Barrier(Barrier {
            side: BarrierSide::End,
            allows_gone: false,
            margin: 2.0,
            refs: refs.iter().map(|r| r.to_string()).collect(),
        })
    }

    #[test]
    fn test_membership_resolves_and_dedups() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let b = graph.add_node(Some("b")).unwrap();
        let edge = graph.add_helper("edge", barrier(&["a, b", "a", "edge", "parent"])).unwrap();

        let mut registry = HelperRegistry::new();
        let warnings = registry.rebuild(&mut graph, &LayoutContext::default());
        assert!(warnings.is_empty());
        assert_eq!(registry.members(edge), &[a, b]);
    }

    #[test]
    fn test_unresolved_member_is_retried() {
        let mut graph = AnchorGraph::new();
        let edge = graph.add_helper("edge", barrier(&["late"])).unwrap();

        let mut registry = HelperRegistry::new();
        let warnings = registry.rebuild(&mut graph, &LayoutContext::default());
        assert_eq!(
            warnings,
            vec![ResolutionWarning::UnresolvedMember {
                helper: "edge".into(),
                id: "late".into()
            }]
        );
        assert!(registry.members(edge).is_empty());

        let late = graph.add_node(Some("late")).unwrap();
        let warnings = registry.rebuild(&mut graph, &LayoutContext::default());
        assert!(warnings.is_empty());
        assert_eq!(registry.members(edge), &[late]);
    }

    #[test]
    fn test_alias_resolves_anonymous_node() {
        let mut graph = AnchorGraph::new();
        let anonymous = graph.add_node(None).unwrap();
        let edge = graph.add_helper("edge", barrier(&["dynamic"])).unwrap();

        let mut registry = HelperRegistry::new();
        registry.bind_alias("dynamic", anonymous);
        let warnings = registry.rebuild(&mut graph, &LayoutContext::default());
        assert!(warnings.is_empty());
        assert_eq!(registry.members(edge), &[anonymous]);
    }

    #[test]
    fn test_barrier_spec_uses_physical_side() {
        let mut graph = AnchorGraph::new();
        graph.add_node(Some("a")).unwrap();
        let edge = graph.add_helper("edge", barrier(&["a"])).unwrap();
        direction::resolve_all(&mut graph, true);

        let mut registry = HelperRegistry::new();
        registry.rebuild(&mut graph, &LayoutContext::default());
        let spec = registry.barrier(edge).unwrap();
        assert_eq!(spec.side, BarrierSide::Left);
        assert_eq!(spec.margin, 2.0);
        assert!(!spec.allows_gone);
    }

    #[test]
    fn test_group_propagates_visibility() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let group = graph
            .add_helper("group", NodeKind::Group(Group { refs: vec!["a".into()] }))
            .unwrap();
        graph.node_mut(group).unwrap().visibility = Visibility::Collapsed;
        graph.node_mut(group).unwrap().transform.elevation = 3.0;

        let mut registry = HelperRegistry::new();
        registry.rebuild(&mut graph, &LayoutContext::default());
        let node = graph.node(a).unwrap();
        assert!(node.is_collapsed());
        assert_eq!(node.visibility, Visibility::Visible);
        assert_eq!(node.transform.elevation, 3.0);

        graph.reset_resolution();
        assert!(!graph.node(a).unwrap().is_collapsed());
    }

    #[test]
    fn test_reactive_guideline_reads_shared_value() {
        let mut graph = AnchorGraph::new();
        let guide = graph
            .add_helper(
                "guide",
                NodeKind::Guideline(Guideline {
                    orientation: Orientation::Vertical,
                    position: GuidelinePosition::Begin(10.0),
                    use_rtl: false,
                    reactive: Some("split".into()),
                }),
            )
            .unwrap();
        direction::resolve_all(&mut graph, false);

        let mut context = LayoutContext::default();
        context.shared.set("split", 120.0);
        let mut registry = HelperRegistry::new();
        registry.rebuild(&mut graph, &context);
        assert_eq!(
            graph.node(guide).unwrap().resolution().horizontal.guideline,
            Some(GuidelinePosition::Begin(120.0))
        );
    }

    #[test]
    fn test_layer_wraps_members_after_layout() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let b = graph.add_node(Some("b")).unwrap();
        let layer = graph
            .add_helper(
                "layer",
                NodeKind::Layer(Layer {
                    refs: vec!["a".into(), "b".into()],
                    padding: 5.0,
                }),
            )
            .unwrap();
        graph.node_mut(a).unwrap().resolution.frame = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        graph.node_mut(b).unwrap().resolution.frame = BoundingBox::new(50.0, 20.0, 10.0, 30.0);

        let mut registry = HelperRegistry::new();
        registry.rebuild(&mut graph, &LayoutContext::default());
        registry.update_post_layout(&mut graph);
        assert_eq!(graph.node(layer).unwrap().frame(), BoundingBox::new(5.0, 5.0, 60.0, 50.0));
    }

    #[test]
    fn test_layer_rotation_moves_members_around_center() {
        let mut graph = AnchorGraph::new();
        let a = graph.add_node(Some("a")).unwrap();
        let layer = graph
            .add_helper(
                "layer",
                NodeKind::Layer(Layer {
                    refs: vec!["a".into()],
                    padding: 0.0,
                }),
            )
            .unwrap();
        graph.node_mut(a).unwrap().resolution.frame = BoundingBox::new(0.0, 0.0, 20.0, 20.0);
        graph.node_mut(layer).unwrap().resolution.frame = BoundingBox::new(0.0, 0.0, 200.0, 20.0);
        graph.node_mut(layer).unwrap().transform.rotation = 180.0;

        let mut registry = HelperRegistry::new();
        registry.rebuild(&mut graph, &LayoutContext::default());
        registry.update_pre_draw(&mut graph);
        let transform = graph.node(a).unwrap().transform;
        assert_eq!(transform.rotation, 180.0);
        assert!((transform.translation_x - 180.0).abs() < 1e-9);
        assert!(transform.translation_y.abs() < 1e-9);
    }

    #[test]
    fn test_placeholder_takes_content() {
        let mut graph = AnchorGraph::new();
        let content = graph.add_node(Some("content")).unwrap();
        let slot = graph
            .add_helper(
                "slot",
                NodeKind::Placeholder(Placeholder {
                    content: Some("content".into()),
                }),
            )
            .unwrap();

        let mut registry = HelperRegistry::new();
        registry.rebuild(&mut graph, &LayoutContext::default());
        let node = graph.node(content).unwrap();
        assert!(node.is_collapsed());
        assert_eq!(node.visibility, Visibility::Visible);
        assert!(node.resolution().placeholder_content);

        graph.node_mut(slot).unwrap().resolution.frame = BoundingBox::new(5.0, 6.0, 70.0, 80.0);
        registry.update_post_layout(&mut graph);
        assert_eq!(graph.node(content).unwrap().frame(), BoundingBox::new(5.0, 6.0, 70.0, 80.0));
    }

    #[test]
    fn test_union_of_frames() {
        assert_eq!(union_of([]), None);
        let union = union_of([BoundingBox::new(0.0, 0.0, 1.0, 1.0), BoundingBox::new(2.0, 2.0, 1.0, 1.0)]);
        assert_eq!(union, Some(BoundingBox::new(0.0, 0.0, 3.0, 3.0)));
    }
}
