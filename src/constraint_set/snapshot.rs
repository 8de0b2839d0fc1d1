//! Capturing and applying full constraint snapshots

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::graph::{
    AnchorGraph, AnchorKind, AnchorRef, AxisSpec, ChainStyle, CustomValue, Node, NodeId, NodeKind,
    PerAxis, Transform, Visibility,
};
use crate::layout::error::{ConfigurationError, ResolutionWarning};

/// The far end of a captured connection, addressed by identifier
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTarget {
    pub id: String,
    pub anchor: AnchorKind,
    pub margin: f64,
    pub gone_margin: f64,
}

impl AnchorTarget {
    pub fn new(id: impl Into<String>, anchor: AnchorKind, margin: f64) -> Self {
        Self {
            id: id.into(),
            anchor,
            margin,
            gone_margin: 0.0,
        }
    }

    pub fn with_gone_margin(mut self, gone_margin: f64) -> Self {
        self.gone_margin = gone_margin;
        self
    }
}

/// Everything declared about one node
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintBundle {
    pub kind: NodeKind,
    pub connections: BTreeMap<AnchorKind, AnchorTarget>,
    pub size: PerAxis<AxisSpec>,
    pub dimension_ratio: Option<String>,
    pub bias: PerAxis<f64>,
    pub chain_style: PerAxis<ChainStyle>,
    pub weight: PerAxis<Option<f64>>,
    pub circle_angle: f64,
    pub visibility: Visibility,
    pub transform: Transform,
    pub custom: BTreeMap<String, CustomValue>,
    pub tag: Option<String>,
}

impl Default for ConstraintBundle {
    fn default() -> Self {
        Self {
            kind: NodeKind::Plain,
            connections: BTreeMap::new(),
            size: PerAxis::default(),
            dimension_ratio: None,
            bias: PerAxis::splat(0.5),
            chain_style: PerAxis::default(),
            weight: PerAxis::default(),
            circle_angle: 0.0,
            visibility: Visibility::Visible,
            transform: Transform::default(),
            custom: BTreeMap::new(),
            tag: None,
        }
    }
}

impl ConstraintBundle {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Declare a connection, keeping Top/Bottom and Baseline exclusive
    pub fn connect(&mut self, anchor: AnchorKind, target: AnchorTarget) {
        match anchor {
            AnchorKind::Top | AnchorKind::Bottom => {
                self.connections.remove(&AnchorKind::Baseline);
            }
            AnchorKind::Baseline => {
                self.connections.remove(&AnchorKind::Top);
                self.connections.remove(&AnchorKind::Bottom);
            }
            _ => {}
        }
        self.connections.insert(anchor, target);
    }

    fn capture(graph: &AnchorGraph, node: &Node) -> Self {
        let mut connections = BTreeMap::new();
        for (anchor, connection) in node.connections() {
            let Some(id) = graph.get(connection.target.node).and_then(Node::name) else {
                debug!(node = %node.display_name(), %anchor, "skipping connection to an anonymous node");
                continue;
            };
            connections.insert(
                anchor,
                AnchorTarget::new(id, connection.target.kind, connection.margin)
                    .with_gone_margin(connection.gone_margin),
            );
        }
        Self {
            kind: node.kind.clone(),
            connections,
            size: node.size,
            dimension_ratio: node.dimension_ratio.clone(),
            bias: node.bias,
            chain_style: node.chain_style,
            weight: node.weight,
            circle_angle: node.circle_angle,
            visibility: node.visibility,
            transform: node.transform,
            custom: node.custom.clone(),
            tag: node.tag.clone(),
        }
    }

    /// Overwrite a node's declarations; connections are wired separately
    fn write_fields(&self, node: &mut Node, include_custom: bool) {
        node.kind = self.kind.clone();
        node.size = self.size;
        node.dimension_ratio = self.dimension_ratio.clone();
        node.bias = self.bias;
        node.chain_style = self.chain_style;
        node.weight = self.weight;
        node.circle_angle = self.circle_angle;
        node.visibility = self.visibility;
        node.transform = self.transform;
        node.tag = self.tag.clone();
        if include_custom {
            node.custom = self.custom.clone();
        }
    }
}

/// A named mapping from node identifier to its constraints
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstraintSnapshot {
    pub name: String,
    /// Free-form labels used to pick among variants of the same set
    pub labels: BTreeSet<String>,
    entries: Vec<(String, ConstraintBundle)>,
}

impl ConstraintSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Add or replace the entry for `id`, keeping declaration order
    pub fn insert(&mut self, id: impl Into<String>, bundle: ConstraintBundle) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = bundle,
            None => self.entries.push((id, bundle)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ConstraintBundle> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, bundle)| bundle)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ConstraintBundle> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == id)
            .map(|(_, bundle)| bundle)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConstraintBundle)> {
        self.entries.iter().map(|(id, bundle)| (id.as_str(), bundle))
    }

    pub(crate) fn bundles_mut(&mut self) -> impl Iterator<Item = &mut ConstraintBundle> {
        self.entries.iter_mut().map(|(_, bundle)| bundle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every required label is present on this snapshot
    pub fn labels_match<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|label| self.labels.contains(label.as_ref()))
    }
}

/// Outcome of applying a snapshot to a graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Entries written onto live nodes
    pub applied: usize,
    /// Helper nodes synthesized for entries without a live node
    pub created: Vec<NodeId>,
    pub warnings: Vec<ResolutionWarning>,
}

/// Record the declarations of every live node
///
/// In strict mode every node must be named; otherwise anonymous nodes and
/// connections to them are left out.
pub fn capture(graph: &AnchorGraph, name: &str, strict: bool) -> Result<ConstraintSnapshot, ConfigurationError> {
    let mut snapshot = ConstraintSnapshot::new(name);
    for node in graph.nodes() {
        let Some(id) = node.name() else {
            if strict {
                return Err(ConfigurationError::MissingIdentifier { node: node.id() });
            }
            continue;
        };
        snapshot.insert(id, ConstraintBundle::capture(graph, node));
    }
    debug!(set = name, entries = snapshot.len(), "captured constraint set");
    Ok(snapshot)
}

/// Write a snapshot onto the graph
///
/// Every entry replaces its node's declarations wholesale, so applying the
/// same snapshot twice leaves the graph as applying it once. Custom
/// attributes are only written when `include_custom` is set.
pub fn apply(
    graph: &mut AnchorGraph,
    snapshot: &ConstraintSnapshot,
    include_custom: bool,
    strict: bool,
) -> Result<ApplyReport, ConfigurationError> {
    let mut report = ApplyReport::default();

    // Validate before touching the graph
    for (id, bundle) in snapshot.entries() {
        for (anchor, target) in &bundle.connections {
            if !anchor.is_compatible_with(target.anchor) {
                return Err(ConfigurationError::incompatible(id, *anchor, target.anchor));
            }
        }
    }
    for node in graph.nodes() {
        match node.name() {
            Some(id) if snapshot.get(id).is_none() => {
                if strict {
                    return Err(ConfigurationError::MissingSnapshotEntry {
                        id: id.to_string(),
                        set: snapshot.name.clone(),
                    });
                }
                report.warnings.push(
                    ResolutionWarning::MissingEntry {
                        id: id.to_string(),
                        set: snapshot.name.clone(),
                    }
                    .emit(),
                );
            }
            None if strict => {
                return Err(ConfigurationError::MissingIdentifier { node: node.id() });
            }
            _ => {}
        }
    }

    // Synthesize helpers that only exist in the snapshot
    for (id, bundle) in snapshot.entries() {
        if graph.lookup(id).is_some() {
            continue;
        }
        if bundle.kind.is_helper() {
            let created = graph.add_helper(id, bundle.kind.clone())?;
            debug!(id, role = bundle.kind.role_name(), "synthesized helper node");
            report.created.push(created);
        } else {
            report
                .warnings
                .push(ResolutionWarning::UnknownIdentifier { id: id.to_string() }.emit());
        }
    }

    let mut targets = Vec::new();
    for (id, bundle) in snapshot.entries() {
        let Some(node_id) = graph.lookup(id) else {
            continue;
        };
        if node_id == AnchorGraph::ROOT {
            continue;
        }
        graph.reset(node_id)?;
        bundle.write_fields(graph.node_mut(node_id)?, include_custom);
        targets.push((node_id, bundle));
        report.applied += 1;
    }

    // Wire connections once every entry has a live node
    for (node_id, bundle) in targets {
        for (anchor, target) in &bundle.connections {
            let Some(target_id) = graph.lookup(&target.id) else {
                report
                    .warnings
                    .push(ResolutionWarning::UnknownIdentifier { id: target.id.clone() }.emit());
                continue;
            };
            graph.connect(
                AnchorRef::new(node_id, *anchor),
                AnchorRef::new(target_id, target.anchor),
                target.margin,
                target.gone_margin,
            )?;
        }
    }

    debug!(
        set = %snapshot.name,
        applied = report.applied,
        created = report.created.len(),
        warnings = report.warnings.len(),
        "applied constraint set"
    );
    Ok(report)
}
