//! Measurement negotiation between the host, the nodes and the solver
//!
//! The solver pulls a measurement for every node it needs through
//! [`SizeProvider`]; the coordinator decides what to ask the host, caches
//! results between rounds, and reconciles reported sizes with min/max bounds,
//! ratios and baselines. [`MeasurementCoordinator::negotiate`] repeats solve
//! rounds until every node's measurement agrees with its solved frame.

use tracing::{debug, trace};

use crate::graph::{AnchorGraph, Axis, DimensionBehavior, MatchConstraintMode, Node, NodeId, PerAxis};

use super::config::LayoutConfig;
use super::error::LayoutError;
use super::helpers::HelperRegistry;
use super::solver::{ContainerSpec, SizeProvider, Solver};
use super::types::{BoundingBox, MeasureSpec, Measurement, Size};

/// The host side of measurement and placement
pub trait MeasureHost {
    /// Measure a node under the given per-axis constraints
    fn measure(&mut self, node: &Node, width: MeasureSpec, height: MeasureSpec) -> Measurement;

    /// Position a node at its resolved frame
    fn place(&mut self, node: &Node, frame: BoundingBox);
}

/// Measurement state of a node within a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureState {
    #[default]
    NotMeasured,
    /// Measured once with the dimensions the node asked for
    Provisional,
    /// Measurement agrees with the solver
    Stable,
    /// A corrective measurement was needed
    Remeasured,
}

/// Which kind of solve round a measurement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurePass {
    /// Nodes report the size they want
    TryGivenDimensions,
    /// The solver has assigned sizes; flexible axes are measured exactly
    SolverFinal,
    /// Last permitted round: wrapping axes stop trusting their content
    Closing,
}

impl MeasurePass {
    pub fn has_solution(self) -> bool {
        self != MeasurePass::TryGivenDimensions
    }
}

/// Everything remembered about a node's last measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureRecord {
    pub state: MeasureState,
    /// Specs derived for the last measurement request
    pub specs: PerAxis<MeasureSpec>,
    /// Size after clamping and ratio correction
    pub measured: Size,
    /// Intrinsic size from the last provisional measurement
    pub content: Size,
    pub baseline: Option<f64>,
    pub remeasure_requested: bool,
    /// Baseline moved; the solver must run again
    pub needs_solve: bool,
    /// Per axis, whether the measurement agreed with the solved frame
    pub settled: PerAxis<bool>,
}

impl Default for MeasureRecord {
    fn default() -> Self {
        Self {
            state: MeasureState::NotMeasured,
            specs: PerAxis::splat(MeasureSpec::Unspecified),
            measured: Size::zero(),
            content: Size::zero(),
            baseline: None,
            remeasure_requested: false,
            needs_solve: false,
            settled: PerAxis::splat(false),
        }
    }
}

impl MeasureRecord {
    pub fn measured_along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.measured.width,
            Axis::Vertical => self.measured.height,
        }
    }

    pub fn content_along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.content.width,
            Axis::Vertical => self.content.height,
        }
    }
}

fn along(size: &Size, axis: Axis) -> f64 {
    match axis {
        Axis::Horizontal => size.width,
        Axis::Vertical => size.height,
    }
}

fn set_along(size: &mut Size, axis: Axis, value: f64) {
    match axis {
        Axis::Horizontal => size.width = value,
        Axis::Vertical => size.height = value,
    }
}

/// Per-node measurement records, indexed by node handle
#[derive(Debug, Clone, Default)]
pub struct MeasureRecords {
    records: Vec<Option<MeasureRecord>>,
}

impl MeasureRecords {
    pub fn get(&self, id: NodeId) -> Option<&MeasureRecord> {
        self.records.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MeasureRecord> {
        self.records.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn insert(&mut self, id: NodeId, record: MeasureRecord) {
        if self.records.len() <= id.index() {
            self.records.resize(id.index() + 1, None);
        }
        self.records[id.index()] = Some(record);
    }

    /// Forget records of nodes that are no longer in the graph
    pub fn retain_live(&mut self, graph: &AnchorGraph) {
        for (index, record) in self.records.iter_mut().enumerate() {
            if !graph.contains(NodeId(index)) {
                *record = None;
            }
        }
    }
}

/// Counters describing how much host work a pass needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasureStats {
    pub host_calls: usize,
    pub cache_hits: usize,
    pub corrective: usize,
    pub rounds: usize,
}

/// Drives host measurement on behalf of the solver
#[derive(Debug, Default)]
pub struct MeasurementCoordinator {
    records: MeasureRecords,
    stats: MeasureStats,
}

impl MeasurementCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &MeasureRecords {
        &self.records
    }

    pub fn record(&self, id: NodeId) -> Option<&MeasureRecord> {
        self.records.get(id)
    }

    pub fn stats(&self) -> MeasureStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MeasureStats::default();
    }

    /// Force a fresh host measurement of `id` on its next request
    pub fn request_remeasure(&mut self, id: NodeId) {
        if let Some(record) = self.records.get_mut(id) {
            record.remeasure_requested = true;
        }
    }

    /// Repeat solve rounds until measurements agree with the solution
    ///
    /// Returns the solved container size; node frames are written back into
    /// the graph after every round.
    pub fn negotiate<S: Solver + ?Sized>(
        &mut self,
        graph: &mut AnchorGraph,
        solver: &mut S,
        host: &mut dyn MeasureHost,
        helpers: &HelperRegistry,
        container: ContainerSpec,
        config: &LayoutConfig,
    ) -> Result<Size, LayoutError> {
        self.records.retain_live(graph);
        let mut pass = MeasurePass::TryGivenDimensions;
        let mut container_size = Size::zero();

        for round in 0..config.max_passes.max(1) {
            let solution = {
                let mut provider = PassMeasurer {
                    coordinator: &mut *self,
                    host: &mut *host,
                    pass,
                    container,
                    config,
                };
                solver.solve(graph, container, helpers, &mut provider)?
            };
            self.stats.rounds += 1;
            container_size = solution.container;

            for node in graph.nodes_mut() {
                if let Some(frame) = solution.frame(node.id()) {
                    node.resolution.frame = frame;
                }
                node.resolution.baseline = self.records.get(node.id()).and_then(|r| r.baseline);
            }

            let helper_changed = helpers.update_post_measure(graph, &self.records, config.size_tolerance);
            let unsettled = self.unsettled(graph, config.size_tolerance);
            debug!(
                round,
                ?pass,
                unsettled = unsettled.len(),
                helper_changed,
                "solve round complete"
            );
            if unsettled.is_empty() && !helper_changed {
                break;
            }
            for id in unsettled {
                if let Some(record) = self.records.get_mut(id) {
                    record.needs_solve = false;
                }
            }
            pass = if round + 2 >= config.max_passes {
                MeasurePass::Closing
            } else {
                MeasurePass::SolverFinal
            };
        }

        Ok(container_size)
    }

    /// Nodes whose measurement disagrees with their solved frame
    fn unsettled(&self, graph: &AnchorGraph, tolerance: f64) -> Vec<NodeId> {
        graph
            .nodes()
            .filter(|node| !node.kind.is_virtual() && !node.is_collapsed())
            .filter(|node| {
                let Some(record) = self.records.get(node.id()) else {
                    return false;
                };
                if record.needs_solve {
                    return true;
                }
                let frame = node.frame().size();
                Axis::BOTH.into_iter().any(|axis| {
                    node.behavior(axis).is_flexible()
                        && (along(&frame, axis) - record.measured_along(axis)).abs() > tolerance
                })
            })
            .map(Node::id)
            .collect()
    }

    /// Measure one node as requested by the solver
    pub fn measure_node(
        &mut self,
        graph: &AnchorGraph,
        id: NodeId,
        pass: MeasurePass,
        container: &ContainerSpec,
        config: &LayoutConfig,
        host: &mut dyn MeasureHost,
    ) -> MeasureRecord {
        let Some(node) = graph.get(id) else {
            return MeasureRecord::default();
        };
        let previous = self.records.get(id).copied();

        if node.is_collapsed() && !node.resolution.placeholder_content {
            let record = MeasureRecord {
                state: MeasureState::Stable,
                specs: PerAxis::splat(MeasureSpec::Exactly(0.0)),
                needs_solve: previous.is_some_and(|p| p.baseline.is_some()),
                ..MeasureRecord::default()
            };
            self.records.insert(id, record);
            return record;
        }

        let specs = PerAxis::new(
            self.spec_for(graph, node, Axis::Horizontal, pass, container, previous.as_ref(), config),
            self.spec_for(graph, node, Axis::Vertical, pass, container, previous.as_ref(), config),
        );

        if config.measure_cache {
            if let Some(previous) = previous {
                if is_cache_hit(node, &previous, &specs, container, config.size_tolerance) {
                    self.stats.cache_hits += 1;
                    trace!(node = %node.display_name(), "measurement cache hit");
                    let mut record = previous;
                    record.state = match pass {
                        MeasurePass::SolverFinal | MeasurePass::Closing => {
                            record.settled = PerAxis::splat(true);
                            MeasureState::Stable
                        }
                        MeasurePass::TryGivenDimensions if previous.state == MeasureState::Remeasured => {
                            MeasureState::Remeasured
                        }
                        MeasurePass::TryGivenDimensions => MeasureState::Provisional,
                    };
                    if pass == MeasurePass::TryGivenDimensions {
                        record.content = record.measured;
                    }
                    self.records.insert(id, record);
                    return record;
                }
            }
        }

        let first = self.call_host(host, node, specs);
        let mut size = Size::new(
            node.size.horizontal.clamp(first.width),
            node.size.vertical.clamp(first.height),
        );
        if let Some(adopted) = node.resolution.adopted_size {
            for axis in Axis::BOTH {
                if node.behavior(axis).behavior == DimensionBehavior::Content {
                    set_along(&mut size, axis, along(&adopted, axis));
                }
            }
        }
        let mut baseline_reported = first.baseline;

        let mut corrected = PerAxis::splat(false);
        let ratio = node.resolution.ratio;
        if ratio.is_usable() && !config.direct_resolution {
            if let Some(derived) = ratio.derived {
                let known = derived.other();
                if specs[known].is_exact() {
                    let value = ratio.derive(derived, along(&size, known));
                    if (value - along(&size, derived)).abs() > config.size_tolerance {
                        set_along(&mut size, derived, value);
                        corrected[derived] = true;
                    }
                }
            }
        }

        let mut final_specs = specs;
        if corrected.horizontal || corrected.vertical {
            for axis in Axis::BOTH {
                if corrected[axis] {
                    final_specs[axis] = MeasureSpec::Exactly(along(&size, axis));
                }
            }
            self.stats.corrective += 1;
            let second = self.call_host(host, node, final_specs);
            for axis in Axis::BOTH {
                if !corrected[axis] {
                    let reported = along(&second.size(), axis);
                    set_along(&mut size, axis, node.size[axis].clamp(reported));
                }
            }
            baseline_reported = second.baseline;
        }

        let baseline = if baseline_reported >= 0.0 {
            Some(baseline_reported)
        } else if node.resolution.baseline_target {
            Some(0.0)
        } else {
            None
        };
        let baseline_moved = previous.is_some_and(|p| p.state != MeasureState::NotMeasured && p.baseline != baseline);

        let frame = node.frame().size();
        let state = if corrected.horizontal || corrected.vertical {
            MeasureState::Remeasured
        } else if pass.has_solution() && size.approx_eq(&frame, config.size_tolerance) {
            MeasureState::Stable
        } else {
            MeasureState::Provisional
        };

        let content = match (pass, previous) {
            (MeasurePass::SolverFinal | MeasurePass::Closing, Some(previous))
                if previous.state != MeasureState::NotMeasured =>
            {
                previous.content
            }
            _ => size,
        };

        let record = MeasureRecord {
            state,
            specs,
            measured: size,
            content,
            baseline,
            remeasure_requested: false,
            needs_solve: baseline_moved,
            settled: PerAxis::new(
                axis_settled(node, Axis::Horizontal, pass, &size, &frame, config.size_tolerance),
                axis_settled(node, Axis::Vertical, pass, &size, &frame, config.size_tolerance),
            ),
        };
        self.records.insert(id, record);
        record
    }

    fn call_host(&mut self, host: &mut dyn MeasureHost, node: &Node, specs: PerAxis<MeasureSpec>) -> Measurement {
        self.stats.host_calls += 1;
        let measurement = host.measure(node, specs.horizontal, specs.vertical);
        trace!(
            node = %node.display_name(),
            width = ?specs.horizontal,
            height = ?specs.vertical,
            measured_width = measurement.width,
            measured_height = measurement.height,
            "host measurement"
        );
        measurement
    }

    /// Derive the measurement constraint for one axis
    #[allow(clippy::too_many_arguments)]
    fn spec_for(
        &self,
        graph: &AnchorGraph,
        node: &Node,
        axis: Axis,
        pass: MeasurePass,
        container: &ContainerSpec,
        previous: Option<&MeasureRecord>,
        config: &LayoutConfig,
    ) -> MeasureSpec {
        let behavior = node.behavior(axis);
        let available = container.available(axis);
        let solved = along(&node.frame().size(), axis);

        match behavior.behavior {
            DimensionBehavior::Fixed => MeasureSpec::Exactly(behavior.fixed),
            DimensionBehavior::Content => {
                let shrunk = previous.is_some_and(|p| solved < p.content_along(axis) - config.size_tolerance);
                if pass.has_solution() && behavior.constrained && shrunk {
                    MeasureSpec::Exactly(solved)
                } else {
                    MeasureSpec::content(available)
                }
            }
            DimensionBehavior::FillContainer => match available {
                Some(space) => {
                    let (start, end) = axis.sides();
                    let margins: f64 = [start, end]
                        .into_iter()
                        .filter_map(|kind| node.effective(kind))
                        .map(|c| graph.effective_margin(node, c))
                        .sum();
                    MeasureSpec::Exactly((space - margins).max(0.0))
                }
                None => MeasureSpec::content(None),
            },
            DimensionBehavior::MatchConstraint => {
                if !pass.has_solution() {
                    return MeasureSpec::content(available);
                }
                let other = axis.other();
                let other_stable = !node.behavior(other).is_match_constraint()
                    || previous.is_some_and(|p| p.settled[other]);
                if behavior.mode == MatchConstraintMode::Wrap && !other_stable && pass != MeasurePass::Closing {
                    MeasureSpec::content(available)
                } else {
                    MeasureSpec::Exactly(solved)
                }
            }
        }
    }
}

/// Whether the measured size along `axis` matches the frame it was measured for
fn axis_settled(node: &Node, axis: Axis, pass: MeasurePass, size: &Size, frame: &Size, tolerance: f64) -> bool {
    if !node.behavior(axis).is_flexible() {
        return true;
    }
    pass.has_solution() && (along(size, axis) - along(frame, axis)).abs() <= tolerance
}

/// Whether two specs would produce the same measurement
fn is_similar(previous: MeasureSpec, next: MeasureSpec, previous_size: f64, tolerance: f64) -> bool {
    if previous == next {
        return true;
    }
    match (previous, next) {
        (MeasureSpec::AtMost(_) | MeasureSpec::Unspecified, MeasureSpec::Exactly(size)) => {
            (size - previous_size).abs() <= tolerance
        }
        _ => false,
    }
}

fn is_cache_hit(
    node: &Node,
    previous: &MeasureRecord,
    specs: &PerAxis<MeasureSpec>,
    container: &ContainerSpec,
    tolerance: f64,
) -> bool {
    if previous.state == MeasureState::NotMeasured || previous.remeasure_requested {
        return false;
    }
    if !previous.measured.approx_eq(&node.frame().size(), tolerance) {
        return false;
    }
    if previous.baseline != node.resolution.baseline {
        return false;
    }
    Axis::BOTH.into_iter().all(|axis| {
        let measured = previous.measured_along(axis);
        let within_container = container
            .available(axis)
            .map_or(true, |limit| measured < limit);
        within_container && is_similar(previous.specs[axis], specs[axis], measured, tolerance)
    })
}

/// Adapter handed to the solver for one round
struct PassMeasurer<'a> {
    coordinator: &'a mut MeasurementCoordinator,
    host: &'a mut dyn MeasureHost,
    pass: MeasurePass,
    container: ContainerSpec,
    config: &'a LayoutConfig,
}

impl SizeProvider for PassMeasurer<'_> {
    fn measure(&mut self, graph: &AnchorGraph, node: NodeId) -> MeasureRecord {
        self.coordinator
            .measure_node(graph, node, self.pass, &self.container, self.config, &mut *self.host)
    }
}
