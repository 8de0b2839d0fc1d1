//! The constraint layout container and its pass lifecycle

use tracing::{debug, info_span};

use crate::constraint_set::{self, ApplyReport, ConstraintSnapshot};
use crate::graph::{AnchorGraph, AnchorKind, Axis, Node, NodeId, PerAxis};

use super::config::LayoutConfig;
use super::context::LayoutContext;
use super::dimension;
use super::direction;
use super::error::{ConfigurationError, LayoutError, ResolutionWarning};
use super::helpers::HelperRegistry;
use super::measure::{MeasureHost, MeasureStats, MeasurementCoordinator};
use super::solver::{CassowarySolver, ContainerSpec, Solver};
use super::types::{BoundingBox, LayoutDirection, MeasureSpec, Size};

/// Hooks the host calls as nodes come and go and passes run
pub trait LayoutParticipant {
    /// A node entered the hierarchy
    fn on_attach(&mut self, name: Option<&str>) -> Result<NodeId, ConfigurationError>;

    /// A node left the hierarchy
    fn on_detach(&mut self, id: NodeId) -> Result<Node, ConfigurationError>;

    /// Resolve the layout for the given container constraints
    fn on_measure(
        &mut self,
        width: MeasureSpec,
        height: MeasureSpec,
        host: &mut dyn MeasureHost,
    ) -> Result<Size, LayoutError>;

    /// Hand the resolved frames to the host
    fn on_layout_complete(&mut self, host: &mut dyn MeasureHost);
}

/// A container that positions its nodes by resolving their constraints
pub struct ConstraintLayout<S: Solver = CassowarySolver> {
    graph: AnchorGraph,
    context: LayoutContext,
    helpers: HelperRegistry,
    coordinator: MeasurementCoordinator,
    solver: S,
    direction: LayoutDirection,
    warnings: Vec<ResolutionWarning>,
    size: Size,
}

impl ConstraintLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self::with_solver(config, CassowarySolver::new())
    }
}

impl Default for ConstraintLayout {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl<S: Solver> ConstraintLayout<S> {
    pub fn with_solver(config: LayoutConfig, solver: S) -> Self {
        Self {
            graph: AnchorGraph::new(),
            context: LayoutContext::new(config),
            helpers: HelperRegistry::new(),
            coordinator: MeasurementCoordinator::new(),
            solver,
            direction: LayoutDirection::default(),
            warnings: Vec::new(),
            size: Size::zero(),
        }
    }

    pub fn graph(&self) -> &AnchorGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AnchorGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.context.config
    }

    pub fn context(&self) -> &LayoutContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut LayoutContext {
        &mut self.context
    }

    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: LayoutDirection) {
        self.direction = direction;
    }

    /// Helper warnings collected during the last pass
    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    /// Container size resolved by the last pass
    pub fn size(&self) -> Size {
        self.size
    }

    /// Host work counters of the last pass
    pub fn stats(&self) -> MeasureStats {
        self.coordinator.stats()
    }

    /// Resolved frame of a named node
    pub fn frame(&self, name: &str) -> Option<BoundingBox> {
        self.graph.lookup(name).and_then(|id| self.graph.get(id)).map(Node::frame)
    }

    /// Drop a node's cached measurement so the next pass asks the host again
    pub fn request_remeasure(&mut self, id: NodeId) {
        self.coordinator.request_remeasure(id);
    }

    /// Record the current constraints of every node as a named constraint set
    pub fn capture(&self, name: &str) -> Result<ConstraintSnapshot, ConfigurationError> {
        constraint_set::capture(&self.graph, name, self.context.config.strict_ids)
    }

    /// Replace the constraints of every node with those of `snapshot`
    ///
    /// Takes effect on the next measure pass.
    pub fn apply_constraint_set(
        &mut self,
        snapshot: &ConstraintSnapshot,
        include_custom: bool,
    ) -> Result<ApplyReport, ConfigurationError> {
        constraint_set::apply(
            &mut self.graph,
            snapshot,
            include_custom,
            self.context.config.strict_ids,
        )
    }

    /// Run the pre-draw hooks of all helpers
    pub fn pre_draw(&mut self) {
        self.helpers.update_pre_draw(&mut self.graph);
    }
}

/// Flag every node that another node's baseline is aligned to
fn mark_baseline_targets(graph: &mut AnchorGraph) {
    let targets: Vec<NodeId> = graph
        .nodes()
        .filter_map(|node| node.effective(AnchorKind::Baseline))
        .filter(|c| c.target.kind == AnchorKind::Baseline)
        .map(|c| c.target.node)
        .collect();
    for target in targets {
        if let Some(node) = graph.get_mut(target) {
            node.resolution.baseline_target = true;
        }
    }
}

impl<S: Solver> LayoutParticipant for ConstraintLayout<S> {
    fn on_attach(&mut self, name: Option<&str>) -> Result<NodeId, ConfigurationError> {
        self.graph.add_node(name)
    }

    fn on_detach(&mut self, id: NodeId) -> Result<Node, ConfigurationError> {
        self.graph.remove_node(id)
    }

    fn on_measure(
        &mut self,
        width: MeasureSpec,
        height: MeasureSpec,
        host: &mut dyn MeasureHost,
    ) -> Result<Size, LayoutError> {
        let _span = info_span!("measure", ?width, ?height).entered();
        let container = ContainerSpec::new(width, height);

        self.graph.reset_resolution();
        direction::resolve_all(&mut self.graph, self.direction.is_rtl());
        dimension::classify_all(
            &mut self.graph,
            PerAxis::new(
                container.is_exact(Axis::Horizontal),
                container.is_exact(Axis::Vertical),
            ),
        );
        self.warnings = self.helpers.rebuild(&mut self.graph, &self.context);
        mark_baseline_targets(&mut self.graph);

        self.coordinator.reset_stats();
        let size = self.coordinator.negotiate(
            &mut self.graph,
            &mut self.solver,
            host,
            &self.helpers,
            container,
            &self.context.config,
        )?;

        let stats = self.coordinator.stats();
        debug!(
            width = size.width,
            height = size.height,
            rounds = stats.rounds,
            host_calls = stats.host_calls,
            cache_hits = stats.cache_hits,
            "measure pass complete"
        );
        self.size = size;
        Ok(size)
    }

    fn on_layout_complete(&mut self, host: &mut dyn MeasureHost) {
        self.helpers.update_post_layout(&mut self.graph);
        for node in self.graph.nodes() {
            let shown = !node.is_collapsed() || node.resolution().placeholder_content;
            if node.kind.is_virtual() || !shown {
                continue;
            }
            host.place(node, node.frame());
        }
    }
}
