//! Constraint solver integration
//!
//! The engine talks to its solver through the [`Solver`] trait: the solver
//! pulls a measurement for every node through [`SizeProvider`] and hands back
//! a frame per node. [`CassowarySolver`] is the reference implementation, a
//! translation of the anchor graph into a kasuari (Cassowary) system.

use std::collections::{HashMap, HashSet};

use kasuari::{
    Expression, Solver as KasuariSolver, Strength, Variable as KasuariVariable, WeightedRelation,
    WeightedRelation::*,
};
use thiserror::Error;

use crate::graph::{
    AnchorGraph, AnchorKind, AnchorRef, Axis, Chain, ChainStyle, Connection, DimensionBehavior,
    GuidelinePosition, MatchConstraintMode, Node, NodeId, NodeKind,
};

use super::helpers::HelperRegistry;
use super::measure::MeasureRecord;
use super::types::{BoundingBox, MeasureSpec, Size};

/// Properties that can be constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutProperty {
    X,
    Y,
    Width,
    Height,
}

impl LayoutProperty {
    pub fn position(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Self::X,
            Axis::Vertical => Self::Y,
        }
    }

    pub fn extent(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Self::Width,
            Axis::Vertical => Self::Height,
        }
    }
}

/// A variable in the constraint system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutVariable {
    pub node: NodeId,
    pub property: LayoutProperty,
}

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unsatisfiable constraint: {constraint}")]
    Unsatisfiable { constraint: String },

    #[error("internal solver error: {0}")]
    Internal(String),
}

/// Extent the container offers on each axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSpec {
    pub width: MeasureSpec,
    pub height: MeasureSpec,
}

impl ContainerSpec {
    pub fn new(width: MeasureSpec, height: MeasureSpec) -> Self {
        Self { width, height }
    }

    pub fn spec(&self, axis: Axis) -> MeasureSpec {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// The bound on the axis, if the container has one
    pub fn available(&self, axis: Axis) -> Option<f64> {
        self.spec(axis).size()
    }

    pub fn is_exact(&self, axis: Axis) -> bool {
        self.spec(axis).is_exact()
    }
}

/// Pull-model measurement callback handed to the solver
pub trait SizeProvider {
    fn measure(&mut self, graph: &AnchorGraph, node: NodeId) -> MeasureRecord;
}

/// Frames assigned by one solve
#[derive(Debug, Clone, Default)]
pub struct Solution {
    frames: HashMap<NodeId, BoundingBox>,
    pub container: Size,
}

impl Solution {
    pub fn frame(&self, id: NodeId) -> Option<BoundingBox> {
        self.frames.get(&id).copied()
    }
}

/// An external constraint solver
pub trait Solver {
    fn solve(
        &mut self,
        graph: &AnchorGraph,
        container: ContainerSpec,
        helpers: &HelperRegistry,
        sizes: &mut dyn SizeProvider,
    ) -> Result<Solution, SolverError>;
}

/// Reference solver built on kasuari
#[derive(Debug, Default, Clone, Copy)]
pub struct CassowarySolver;

impl CassowarySolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for CassowarySolver {
    fn solve(
        &mut self,
        graph: &AnchorGraph,
        container: ContainerSpec,
        helpers: &HelperRegistry,
        sizes: &mut dyn SizeProvider,
    ) -> Result<Solution, SolverError> {
        let mut records = HashMap::new();
        for id in dependency_order(graph, helpers) {
            if graph.get(id).is_some_and(|n| !n.kind.is_virtual()) {
                records.insert(id, sizes.measure(graph, id));
            }
        }

        let mut builder = SystemBuilder {
            graph,
            helpers,
            container,
            records,
            system: ConstraintSystem::new(),
        };
        builder.build()?;
        Ok(builder.system.solution(graph))
    }
}

/// Order in which nodes must be measured: connection targets and helper
/// members before the nodes that depend on them
///
/// Cycles are broken at the first revisited node, falling back to insertion
/// order.
pub fn dependency_order(graph: &AnchorGraph, helpers: &HelperRegistry) -> Vec<NodeId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    fn visit(
        graph: &AnchorGraph,
        helpers: &HelperRegistry,
        id: NodeId,
        marks: &mut [Mark],
        order: &mut Vec<NodeId>,
    ) {
        if id == AnchorGraph::ROOT || marks.get(id.index()) != Some(&Mark::Unvisited) {
            return;
        }
        let Some(node) = graph.get(id) else {
            return;
        };
        marks[id.index()] = Mark::Visiting;
        for (_, connection) in node.connections() {
            visit(graph, helpers, connection.target.node, marks, order);
        }
        for &member in helpers.members(id) {
            visit(graph, helpers, member, marks, order);
        }
        marks[id.index()] = Mark::Done;
        order.push(id);
    }

    let mut marks = vec![Mark::Unvisited; graph.capacity()];
    let mut order = Vec::with_capacity(graph.capacity());
    for id in graph.ids() {
        visit(graph, helpers, id, &mut marks, &mut order);
    }
    order
}

/// Wrapper around the kasuari solver
struct ConstraintSystem {
    solver: KasuariSolver,
    /// Maps our variables to kasuari variables
    variables: HashMap<LayoutVariable, KasuariVariable>,
}

impl ConstraintSystem {
    fn new() -> Self {
        Self {
            solver: KasuariSolver::new(),
            variables: HashMap::new(),
        }
    }

    fn var(&mut self, node: NodeId, property: LayoutProperty) -> Expression {
        let kvar = *self
            .variables
            .entry(LayoutVariable { node, property })
            .or_insert_with(KasuariVariable::new);
        kvar.into()
    }

    fn position(&mut self, node: NodeId, axis: Axis) -> Expression {
        self.var(node, LayoutProperty::position(axis))
    }

    fn extent(&mut self, node: NodeId, axis: Axis) -> Expression {
        self.var(node, LayoutProperty::extent(axis))
    }

    /// Add `lhs <relation> rhs`
    fn add(
        &mut self,
        lhs: Expression,
        relation: WeightedRelation,
        rhs: f64,
        describe: impl FnOnce() -> String,
    ) -> Result<(), SolverError> {
        self.solver
            .add_constraint(lhs | relation | rhs)
            .map_err(|e| convert_kasuari_error(e, describe()))
    }

    fn solution(&mut self, graph: &AnchorGraph) -> Solution {
        let changes: HashMap<KasuariVariable, f64> = self.solver.fetch_changes().iter().copied().collect();
        let variables = &self.variables;
        let value = |node: NodeId, property: LayoutProperty| {
            variables
                .get(&LayoutVariable { node, property })
                .and_then(|kvar| changes.get(kvar))
                .map_or(0.0, |v| snap(*v))
        };

        let frames = graph
            .nodes()
            .map(|node| {
                let id = node.id();
                let frame = BoundingBox::new(
                    value(id, LayoutProperty::X),
                    value(id, LayoutProperty::Y),
                    value(id, LayoutProperty::Width),
                    value(id, LayoutProperty::Height),
                );
                (id, frame)
            })
            .collect();
        let container = Size::new(
            value(AnchorGraph::ROOT, LayoutProperty::Width),
            value(AnchorGraph::ROOT, LayoutProperty::Height),
        );
        Solution { frames, container }
    }
}

/// Remove floating point noise left by the simplex iterations
fn snap(value: f64) -> f64 {
    let snapped = (value * 1e6).round() / 1e6;
    if snapped == 0.0 {
        0.0
    } else {
        snapped
    }
}

fn convert_kasuari_error(e: kasuari::AddConstraintError, constraint: String) -> SolverError {
    match e {
        kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable { constraint },
        kasuari::AddConstraintError::DuplicateConstraint => {
            SolverError::Internal(format!("duplicate constraint: {}", constraint))
        }
        kasuari::AddConstraintError::InternalSolverError(msg) => {
            SolverError::Internal(format!("{} while adding {}", msg, constraint))
        }
    }
}

/// Translates one graph into a constraint system
struct SystemBuilder<'a> {
    graph: &'a AnchorGraph,
    helpers: &'a HelperRegistry,
    container: ContainerSpec,
    records: HashMap<NodeId, MeasureRecord>,
    system: ConstraintSystem,
}

impl SystemBuilder<'_> {
    fn build(&mut self) -> Result<(), SolverError> {
        self.constrain_root()?;

        let chains: Vec<Chain> = Axis::BOTH
            .into_iter()
            .flat_map(|axis| self.graph.chains(axis))
            .collect();
        let chained: HashSet<(NodeId, Axis)> = chains
            .iter()
            .flat_map(|chain| chain.members.iter().map(move |&m| (m, chain.axis)))
            .collect();

        let graph = self.graph;
        for node in graph.nodes() {
            match &node.kind {
                NodeKind::Plain | NodeKind::Placeholder(_) => self.constrain_widget(node, &chained)?,
                NodeKind::Guideline(_) => self.constrain_guideline(node)?,
                NodeKind::Barrier(_) => self.constrain_barrier(node)?,
                NodeKind::Group(_) | NodeKind::Layer(_) => self.pin(node.id())?,
            }
        }

        for chain in &chains {
            self.constrain_chain(chain)?;
        }
        Ok(())
    }

    fn record(&self, id: NodeId) -> MeasureRecord {
        self.records.get(&id).copied().unwrap_or_default()
    }

    fn baseline_of(&self, id: NodeId) -> f64 {
        self.records.get(&id).and_then(|r| r.baseline).unwrap_or(0.0)
    }

    fn margin(&self, node: &Node, connection: &Connection) -> f64 {
        self.graph.effective_margin(node, connection)
    }

    fn bias(node: &Node, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => node.resolution().horizontal.bias,
            Axis::Vertical => node.bias.vertical,
        }
    }

    /// Solver expression of an anchor's coordinate
    fn anchor_expr(&mut self, target: AnchorRef) -> Expression {
        let node = target.node;
        match target.kind {
            AnchorKind::Left | AnchorKind::Start => self.system.position(node, Axis::Horizontal),
            AnchorKind::Right | AnchorKind::End => {
                self.system.position(node, Axis::Horizontal) + self.system.extent(node, Axis::Horizontal)
            }
            AnchorKind::Top => self.system.position(node, Axis::Vertical),
            AnchorKind::Bottom => {
                self.system.position(node, Axis::Vertical) + self.system.extent(node, Axis::Vertical)
            }
            AnchorKind::Baseline => self.system.position(node, Axis::Vertical) + self.baseline_of(node),
            AnchorKind::CenterCircle => {
                self.system.position(node, Axis::Horizontal) + self.system.extent(node, Axis::Horizontal) * 0.5
            }
        }
    }

    fn constrain_root(&mut self) -> Result<(), SolverError> {
        let root = AnchorGraph::ROOT;
        for axis in Axis::BOTH {
            let position = self.system.position(root, axis);
            self.system
                .add(position, EQ(Strength::REQUIRED), 0.0, || format!("parent.{:?} = 0", axis))?;

            let extent = self.system.extent(root, axis);
            self.system
                .add(extent.clone(), GE(Strength::REQUIRED), 0.0, || "parent extent >= 0".into())?;
            match self.container.spec(axis) {
                MeasureSpec::Exactly(size) => self.system.add(extent, EQ(Strength::REQUIRED), size, || {
                    format!("parent {:?} extent = {}", axis, size)
                })?,
                MeasureSpec::AtMost(limit) => {
                    self.system.add(extent.clone(), LE(Strength::REQUIRED), limit, || {
                        format!("parent {:?} extent <= {}", axis, limit)
                    })?;
                    self.system.add(extent, EQ(Strength::WEAK), 0.0, String::new)?;
                }
                MeasureSpec::Unspecified => self.system.add(extent, EQ(Strength::WEAK), 0.0, String::new)?,
            }
        }
        Ok(())
    }

    fn constrain_widget(&mut self, node: &Node, chained: &HashSet<(NodeId, Axis)>) -> Result<(), SolverError> {
        let id = node.id();
        let record = self.record(id);
        let circle = node.effective(AnchorKind::CenterCircle).copied();

        for axis in Axis::BOTH {
            let in_chain = chained.contains(&(id, axis));
            self.constrain_size(node, axis, &record, in_chain)?;

            if !self.container.is_exact(axis) && !node.is_collapsed() {
                self.constrain_wrap_extent(node, axis)?;
            }
            if circle.is_some() || in_chain {
                continue;
            }
            if axis == Axis::Vertical {
                if let Some(baseline) = node.effective(AnchorKind::Baseline).copied() {
                    self.constrain_baseline(node, &baseline, &record)?;
                    continue;
                }
            }
            self.constrain_anchors(node, axis)?;
        }

        if let Some(circle) = circle {
            self.constrain_circle(node, &circle)?;
        }
        Ok(())
    }

    fn constrain_size(
        &mut self,
        node: &Node,
        axis: Axis,
        record: &MeasureRecord,
        in_chain: bool,
    ) -> Result<(), SolverError> {
        let id = node.id();
        let name = node.display_name();
        let size = self.system.extent(id, axis);

        if node.is_collapsed() {
            return self
                .system
                .add(size, EQ(Strength::REQUIRED), 0.0, || format!("{} collapsed", name));
        }
        self.system
            .add(size.clone(), GE(Strength::REQUIRED), 0.0, || format!("{} size >= 0", name))?;

        let ratio = node.resolution().ratio;
        if ratio.is_usable() && ratio.derived == Some(axis) {
            let other = self.system.extent(id, axis.other());
            let factor = match axis {
                Axis::Horizontal => ratio.value,
                Axis::Vertical => 1.0 / ratio.value,
            };
            return self.system.add(size - other * factor, EQ(Strength::REQUIRED), 0.0, || {
                format!("{} {:?} follows ratio {}", name, axis, ratio.value)
            });
        }

        let behavior = node.behavior(axis);
        let measured = record.measured_along(axis);
        let content = record.content_along(axis);
        match behavior.behavior {
            DimensionBehavior::Fixed | DimensionBehavior::FillContainer => {
                self.system.add(size, EQ(Strength::REQUIRED), measured, || {
                    format!("{} {:?} = {}", name, axis, measured)
                })
            }
            DimensionBehavior::Content if !behavior.constrained => {
                self.system.add(size, EQ(Strength::REQUIRED), measured, || {
                    format!("{} {:?} = {}", name, axis, measured)
                })
            }
            DimensionBehavior::Content => {
                let limit = content.max(measured);
                self.system.add(size.clone(), LE(Strength::REQUIRED), limit, || {
                    format!("{} {:?} <= {}", name, axis, limit)
                })?;
                self.system.add(size, EQ(Strength::STRONG), content, String::new)
            }
            DimensionBehavior::MatchConstraint => {
                let spec = node.size[axis];
                if spec.min > 0.0 {
                    self.system.add(size.clone(), GE(Strength::REQUIRED), spec.min, || {
                        format!("{} {:?} >= min {}", name, axis, spec.min)
                    })?;
                }
                if spec.max.is_finite() {
                    self.system.add(size.clone(), LE(Strength::REQUIRED), spec.max, || {
                        format!("{} {:?} <= max {}", name, axis, spec.max)
                    })?;
                }
                match behavior.mode {
                    // Spread between both anchors is preferred in constrain_anchors,
                    // chains distribute their own members
                    MatchConstraintMode::Spread if in_chain || has_both_sides(node, axis) => Ok(()),
                    MatchConstraintMode::Spread | MatchConstraintMode::Wrap => {
                        self.system.add(size, EQ(Strength::STRONG), content, String::new)
                    }
                    MatchConstraintMode::Percent => {
                        let parent = self.system.extent(AnchorGraph::ROOT, axis);
                        self.system
                            .add(size - parent * behavior.percent, EQ(Strength::STRONG), 0.0, String::new)
                    }
                }
            }
        }
    }

    fn constrain_anchors(&mut self, node: &Node, axis: Axis) -> Result<(), SolverError> {
        let id = node.id();
        let name = node.display_name();
        let (start_kind, end_kind) = axis.sides();
        let position = self.system.position(id, axis);
        let size = self.system.extent(id, axis);
        let behavior = node.behavior(axis);
        let start = node.effective(start_kind).copied();
        let end = node.effective(end_kind).copied();

        if behavior.behavior == DimensionBehavior::FillContainer {
            let margin = start.map_or(0.0, |c| self.margin(node, &c));
            return self.system.add(position, EQ(Strength::REQUIRED), margin, || {
                format!("{} fills parent {:?}", name, axis)
            });
        }

        match (start, end) {
            (Some(start), Some(end)) => {
                let bias = Self::bias(node, axis);
                let low = self.anchor_expr(start.target) + self.margin(node, &start);
                let high = self.anchor_expr(end.target) - self.margin(node, &end);
                let before = position.clone() - low.clone();
                let after = high.clone() - position - size.clone();

                self.system.add(
                    before.clone() * (1.0 - bias) - after.clone() * bias,
                    EQ(Strength::REQUIRED),
                    0.0,
                    || format!("{} centered on {:?} with bias {}", name, axis, bias),
                )?;

                let ratio = node.resolution().ratio;
                let derived = ratio.is_usable() && ratio.derived == Some(axis);
                if behavior.is_match_constraint() && behavior.mode == MatchConstraintMode::Spread && !derived {
                    self.system.add(size - (high - low), EQ(Strength::STRONG), 0.0, String::new)?;
                }
                let contained = (behavior.is_match_constraint() && behavior.mode == MatchConstraintMode::Wrap)
                    || (behavior.behavior == DimensionBehavior::Content && behavior.constrained);
                if contained {
                    self.system.add(before, GE(Strength::REQUIRED), 0.0, || {
                        format!("{} within its start anchor", name)
                    })?;
                    self.system.add(after, GE(Strength::REQUIRED), 0.0, || {
                        format!("{} within its end anchor", name)
                    })?;
                }
                Ok(())
            }
            (Some(start), None) => {
                let margin = self.margin(node, &start);
                let target = self.anchor_expr(start.target);
                self.system.add(position - target, EQ(Strength::REQUIRED), margin, || {
                    format!("{}.{} = {} + {}", name, start_kind, start.target, margin)
                })
            }
            (None, Some(end)) => {
                let margin = self.margin(node, &end);
                let target = self.anchor_expr(end.target);
                self.system.add(position + size - target, EQ(Strength::REQUIRED), -margin, || {
                    format!("{}.{} = {} - {}", name, end_kind, end.target, margin)
                })
            }
            (None, None) => self.system.add(position, EQ(Strength::REQUIRED), 0.0, || {
                format!("{} unconstrained on {:?}", name, axis)
            }),
        }
    }

    fn constrain_baseline(
        &mut self,
        node: &Node,
        connection: &Connection,
        record: &MeasureRecord,
    ) -> Result<(), SolverError> {
        let own = record.baseline.unwrap_or(0.0);
        let margin = self.margin(node, connection);
        let top = self.system.position(node.id(), Axis::Vertical);
        let target = self.anchor_expr(connection.target);
        self.system.add(top + own - target, EQ(Strength::REQUIRED), margin, || {
            format!("{}.baseline = {}", node.display_name(), connection.target)
        })
    }

    fn constrain_circle(&mut self, node: &Node, connection: &Connection) -> Result<(), SolverError> {
        let id = node.id();
        let target = connection.target.node;
        let radius = connection.margin;
        let angle = node.circle_angle.to_radians();
        let offsets = [
            (Axis::Horizontal, radius * angle.sin()),
            (Axis::Vertical, -radius * angle.cos()),
        ];
        for (axis, offset) in offsets {
            let center = self.system.position(id, axis) + self.system.extent(id, axis) * 0.5;
            let target_center = self.system.position(target, axis) + self.system.extent(target, axis) * 0.5;
            self.system.add(center - target_center, EQ(Strength::REQUIRED), offset, || {
                format!("{} on circle around {} at {}deg", node.display_name(), target, node.circle_angle)
            })?;
        }
        Ok(())
    }

    /// A wrapping container grows to hold every visible widget
    fn constrain_wrap_extent(&mut self, node: &Node, axis: Axis) -> Result<(), SolverError> {
        let (_, end_kind) = axis.sides();
        let trailing = node
            .effective(end_kind)
            .filter(|c| c.target.node == AnchorGraph::ROOT)
            .map_or(0.0, |c| self.margin(node, c));
        let parent = self.system.extent(AnchorGraph::ROOT, axis);
        let far_edge = self.system.position(node.id(), axis) + self.system.extent(node.id(), axis);
        self.system.add(parent - far_edge, GE(Strength::STRONG), trailing, String::new)
    }

    fn constrain_guideline(&mut self, node: &Node) -> Result<(), SolverError> {
        let NodeKind::Guideline(guideline) = &node.kind else {
            return Ok(());
        };
        let id = node.id();
        let axis = guideline.orientation.axis();
        let placement = node.resolution().horizontal.guideline.unwrap_or(guideline.position);
        let position = self.system.position(id, axis);
        let parent = self.system.extent(AnchorGraph::ROOT, axis);
        let describe = || format!("guideline {} at {:?}", node.display_name(), placement);

        match placement {
            GuidelinePosition::Begin(offset) => self.system.add(position, EQ(Strength::REQUIRED), offset, describe)?,
            GuidelinePosition::End(offset) => {
                self.system.add(position - parent, EQ(Strength::REQUIRED), -offset, describe)?
            }
            GuidelinePosition::Percent(percent) => {
                self.system
                    .add(position - parent * percent, EQ(Strength::REQUIRED), 0.0, describe)?
            }
        }
        let extent = self.system.extent(id, axis);
        self.system.add(extent, EQ(Strength::REQUIRED), 0.0, String::new)?;

        let other = axis.other();
        let across = self.system.position(id, other);
        self.system.add(across, EQ(Strength::REQUIRED), 0.0, String::new)?;
        let span = self.system.extent(id, other) - self.system.extent(AnchorGraph::ROOT, other);
        self.system.add(span, EQ(Strength::REQUIRED), 0.0, String::new)
    }

    fn constrain_barrier(&mut self, node: &Node) -> Result<(), SolverError> {
        let id = node.id();
        let helpers = self.helpers;
        let Some(barrier) = helpers.barrier(id) else {
            return self.pin(id);
        };
        let axis = barrier.side.axis();
        let other = axis.other();
        for (property, value) in [
            (LayoutProperty::extent(axis), 0.0),
            (LayoutProperty::position(other), 0.0),
            (LayoutProperty::extent(other), 0.0),
        ] {
            let variable = self.system.var(id, property);
            self.system.add(variable, EQ(Strength::REQUIRED), value, String::new)?;
        }

        let graph = self.graph;
        let members: Vec<NodeId> = barrier
            .members
            .iter()
            .copied()
            .filter(|&m| graph.get(m).is_some_and(|n| barrier.allows_gone || !n.is_collapsed()))
            .collect();
        let position = self.system.position(id, axis);
        if members.is_empty() {
            return self.system.add(position, EQ(Strength::REQUIRED), 0.0, || {
                format!("empty barrier {} at parent start", node.display_name())
            });
        }

        let tracks_max = barrier.side.tracks_max();
        for member in members {
            let edge = if tracks_max {
                self.system.position(member, axis) + self.system.extent(member, axis)
            } else {
                self.system.position(member, axis)
            };
            let offset = if tracks_max { barrier.margin } else { -barrier.margin };
            let relation = if tracks_max {
                GE(Strength::REQUIRED)
            } else {
                LE(Strength::REQUIRED)
            };
            let gap = position.clone() - edge;
            self.system.add(gap.clone(), relation, offset, || {
                format!("barrier {} beyond {}", node.display_name(), member)
            })?;
            self.system.add(gap, EQ(Strength::MEDIUM), offset, String::new)?;
        }
        Ok(())
    }

    fn pin(&mut self, id: NodeId) -> Result<(), SolverError> {
        for property in [
            LayoutProperty::X,
            LayoutProperty::Y,
            LayoutProperty::Width,
            LayoutProperty::Height,
        ] {
            let variable = self.system.var(id, property);
            self.system.add(variable, EQ(Strength::REQUIRED), 0.0, String::new)?;
        }
        Ok(())
    }

    fn constrain_chain(&mut self, chain: &Chain) -> Result<(), SolverError> {
        let graph = self.graph;
        let axis = chain.axis;
        let (start_kind, end_kind) = axis.sides();
        let members: Vec<&Node> = chain.members.iter().filter_map(|&id| graph.get(id)).collect();

        // collapsed members sit on their start anchor
        for node in members.iter().filter(|n| n.is_collapsed()) {
            let position = self.system.position(node.id(), axis);
            let anchor = match node.effective(start_kind) {
                Some(c) => position - self.anchor_expr(c.target),
                None => position,
            };
            self.system.add(anchor, EQ(Strength::REQUIRED), 0.0, String::new)?;
        }

        let visible: Vec<&Node> = members.iter().copied().filter(|n| !n.is_collapsed()).collect();
        let (Some(&first), Some(&last)) = (visible.first(), visible.last()) else {
            return Ok(());
        };

        let outer_start = match first.effective(start_kind) {
            Some(c) => self.anchor_expr(c.target) + self.margin(first, c),
            None => self.system.position(AnchorGraph::ROOT, axis),
        };
        let outer_end = match last.effective(end_kind) {
            Some(c) => self.anchor_expr(c.target) - self.margin(last, c),
            None => {
                self.system.position(AnchorGraph::ROOT, axis) + self.system.extent(AnchorGraph::ROOT, axis)
            }
        };

        let mut gaps = vec![self.system.position(first.id(), axis) - outer_start];
        for pair in visible.windows(2) {
            let (before, after) = (pair[0], pair[1]);
            let margins = before.effective(end_kind).map_or(0.0, |c| self.margin(before, c))
                + after.effective(start_kind).map_or(0.0, |c| self.margin(after, c));
            let gap = self.system.position(after.id(), axis)
                - self.system.position(before.id(), axis)
                - self.system.extent(before.id(), axis)
                - margins;
            gaps.push(gap);
        }
        gaps.push(outer_end - self.system.position(last.id(), axis) - self.system.extent(last.id(), axis));

        let head = chain.head();
        let describe = |what: &str| format!("chain at {} {}", head, what);
        let weighted: Vec<&Node> = visible
            .iter()
            .copied()
            .filter(|n| {
                let behavior = n.behavior(axis);
                let ratio = n.resolution().ratio;
                behavior.is_match_constraint()
                    && behavior.mode == MatchConstraintMode::Spread
                    && !(ratio.is_usable() && ratio.derived == Some(axis))
            })
            .collect();

        let outer = gaps.len() - 1;
        if !weighted.is_empty() {
            for gap in gaps {
                self.system.add(gap, EQ(Strength::REQUIRED), 0.0, || describe("closes gaps"))?;
            }
            return self.distribute_weights(&weighted, axis);
        }

        match chain.style(graph) {
            ChainStyle::Spread => {
                for gap in &gaps[1..] {
                    self.system.add(gap.clone() - gaps[0].clone(), EQ(Strength::REQUIRED), 0.0, || {
                        describe("spreads evenly")
                    })?;
                }
            }
            ChainStyle::SpreadInside if visible.len() > 1 => {
                self.system
                    .add(gaps[0].clone(), EQ(Strength::REQUIRED), 0.0, || describe("touches start"))?;
                self.system
                    .add(gaps[outer].clone(), EQ(Strength::REQUIRED), 0.0, || describe("touches end"))?;
                for gap in &gaps[2..outer] {
                    self.system.add(gap.clone() - gaps[1].clone(), EQ(Strength::REQUIRED), 0.0, || {
                        describe("spreads inside")
                    })?;
                }
            }
            ChainStyle::SpreadInside | ChainStyle::Packed => {
                for gap in &gaps[1..outer] {
                    self.system
                        .add(gap.clone(), EQ(Strength::REQUIRED), 0.0, || describe("packs members"))?;
                }
                let bias = chain.bias(graph);
                let balance = gaps[0].clone() * (1.0 - bias) - gaps[outer].clone() * bias;
                self.system
                    .add(balance, EQ(Strength::REQUIRED), 0.0, || format!("chain at {} bias {}", head, bias))?;
            }
        }
        Ok(())
    }

    /// Share the chain's free space between match-constraint members by weight
    fn distribute_weights(&mut self, weighted: &[&Node], axis: Axis) -> Result<(), SolverError> {
        let declared = weighted.iter().any(|n| n.weight[axis].is_some());
        let weights: Vec<f64> = weighted
            .iter()
            .map(|n| match (declared, n.weight[axis]) {
                (false, _) => 1.0,
                (true, weight) => weight.unwrap_or(1.0).max(0.0),
            })
            .collect();

        let Some(reference) = weights.iter().position(|&w| w > 0.0) else {
            // all weights zero: nothing gets space
            for node in weighted {
                let size = self.system.extent(node.id(), axis);
                self.system.add(size, EQ(Strength::REQUIRED), 0.0, String::new)?;
            }
            return Ok(());
        };

        let reference_size = self.system.extent(weighted[reference].id(), axis);
        for (index, node) in weighted.iter().enumerate() {
            if index == reference {
                continue;
            }
            let size = self.system.extent(node.id(), axis);
            let balance = size * weights[reference] - reference_size.clone() * weights[index];
            self.system.add(balance, EQ(Strength::REQUIRED), 0.0, || {
                format!("{} weight {}", node.display_name(), weights[index])
            })?;
        }
        Ok(())
    }
}

fn has_both_sides(node: &Node, axis: Axis) -> bool {
    let (start, end) = axis.sides();
    node.effective(start).is_some() && node.effective(end).is_some()
}
