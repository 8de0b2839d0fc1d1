//! Anchor graph: nodes, their anchors and the connections between them
//!
//! Nodes live in an arena owned by [`AnchorGraph`] and refer to each other
//! only through [`NodeId`] handles. Every graph has a root node standing for
//! the container itself, addressed as `parent` in constraint sets.

pub mod anchor;
pub mod chain;
pub mod node;

use std::collections::HashMap;

pub use anchor::{AnchorKind, AnchorRef, Connection};
pub use chain::Chain;
pub use node::*;

use crate::layout::error::ConfigurationError;

/// Identifier under which the root container node is addressed
pub const PARENT_ID: &str = "parent";

/// Arena of nodes and the connections declared between their anchors
#[derive(Debug, Clone)]
pub struct AnchorGraph {
    nodes: Vec<Option<Node>>,
    names: HashMap<String, NodeId>,
}

impl AnchorGraph {
    /// Handle of the container node
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        let root = Node::new(Self::ROOT, Some(PARENT_ID.to_string()), NodeKind::Plain);
        let mut names = HashMap::new();
        names.insert(PARENT_ID.to_string(), Self::ROOT);
        Self {
            nodes: vec![Some(root)],
            names,
        }
    }

    /// Add a plain node, named or anonymous
    pub fn add_node(&mut self, name: Option<&str>) -> Result<NodeId, ConfigurationError> {
        self.insert(name, NodeKind::Plain)
    }

    /// Add a virtual helper node
    pub fn add_helper(&mut self, name: &str, kind: NodeKind) -> Result<NodeId, ConfigurationError> {
        self.insert(Some(name), kind)
    }

    fn insert(&mut self, name: Option<&str>, kind: NodeKind) -> Result<NodeId, ConfigurationError> {
        if let Some(name) = name {
            if self.names.contains_key(name) {
                return Err(ConfigurationError::DuplicateIdentifier(name.to_string()));
            }
        }
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Some(Node::new(id, name.map(str::to_string), kind)));
        if let Some(name) = name {
            self.names.insert(name.to_string(), id);
        }
        Ok(id)
    }

    /// Remove a node that left the hierarchy, dropping connections that target it
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, ConfigurationError> {
        if id == Self::ROOT {
            return Err(ConfigurationError::UnknownNode(id));
        }
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(ConfigurationError::UnknownNode(id))?;
        if let Some(name) = &node.name {
            self.names.remove(name);
        }
        for other in self.nodes.iter_mut().flatten() {
            for slot in other.connections.iter_mut() {
                if slot.is_some_and(|c| c.target.node == id) {
                    *slot = None;
                }
            }
        }
        Ok(node)
    }

    /// Give a node a new identifier, or clear it
    pub fn rename(&mut self, id: NodeId, name: Option<&str>) -> Result<(), ConfigurationError> {
        if let Some(name) = name {
            if self.names.get(name).is_some_and(|&existing| existing != id) {
                return Err(ConfigurationError::DuplicateIdentifier(name.to_string()));
            }
        }
        let node = self.node_mut(id)?;
        let previous = std::mem::replace(&mut node.name, name.map(str::to_string));
        if let Some(previous) = previous {
            self.names.remove(&previous);
        }
        if let Some(name) = name {
            self.names.insert(name.to_string(), id);
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, ConfigurationError> {
        self.get(id).ok_or(ConfigurationError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ConfigurationError> {
        self.get_mut(id).ok_or(ConfigurationError::UnknownNode(id))
    }

    pub fn root(&self) -> &Node {
        match self.get(Self::ROOT) {
            Some(root) => root,
            None => unreachable!("the root node is never removed"),
        }
    }

    /// Upper bound (exclusive) of node indices, for per-node side tables
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// All live nodes except the root, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().skip(1).flatten()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut().skip(1).flatten()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes().map(Node::id).collect()
    }

    /// Helper nodes in registration order
    pub fn helpers(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.kind.is_helper())
    }

    /// Clear all of a node's connections and sizing flags
    pub fn reset(&mut self, id: NodeId) -> Result<(), ConfigurationError> {
        self.node_mut(id)?.reset();
        Ok(())
    }

    /// Create or replace the outgoing connection of `source`
    pub fn connect(
        &mut self,
        source: AnchorRef,
        target: AnchorRef,
        margin: f64,
        gone_margin: f64,
    ) -> Result<(), ConfigurationError> {
        if !self.contains(target.node) {
            return Err(ConfigurationError::UnknownNode(target.node));
        }
        let node = self.node_mut(source.node)?;
        if !source.kind.is_compatible_with(target.kind) {
            return Err(ConfigurationError::incompatible(
                node.display_name(),
                source.kind,
                target.kind,
            ));
        }

        // Top/Bottom and Baseline are mutually exclusive, last write wins
        match source.kind {
            AnchorKind::Top | AnchorKind::Bottom => {
                node.connections[AnchorKind::Baseline.index()] = None;
            }
            AnchorKind::Baseline => {
                node.connections[AnchorKind::Top.index()] = None;
                node.connections[AnchorKind::Bottom.index()] = None;
            }
            _ => {}
        }

        node.connections[source.kind.index()] =
            Some(Connection::new(target, margin).with_gone_margin(gone_margin));
        Ok(())
    }

    pub fn disconnect(&mut self, anchor: AnchorRef) -> Result<(), ConfigurationError> {
        self.node_mut(anchor.node)?.connections[anchor.kind.index()] = None;
        Ok(())
    }

    /// Margin a connection contributes under the current visibilities
    ///
    /// Collapsed sources contribute nothing; a collapsed target switches the
    /// connection to its gone margin.
    pub fn effective_margin(&self, source: &Node, connection: &Connection) -> f64 {
        if source.is_collapsed() {
            return 0.0;
        }
        match self.get(connection.target.node) {
            Some(target) if target.is_collapsed() => connection.gone_margin,
            _ => connection.margin,
        }
    }

    /// Drop every node's per-pass state
    pub(crate) fn reset_resolution(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.reset_resolution();
        }
    }

    /// Chains along `axis`, identified from the resolved connections
    pub fn chains(&self, axis: Axis) -> Vec<Chain> {
        chain::find_chains(self, axis)
    }
}

impl Default for AnchorGraph {
    fn default() -> Self {
        Self::new()
    }
}
