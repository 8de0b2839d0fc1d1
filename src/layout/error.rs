//! Error and warning types for constraint resolution

use thiserror::Error;

use crate::graph::{AnchorKind, NodeId};

use super::solver::SolverError;

/// A declaration that cannot be satisfied or is ambiguous
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Anchors of different kinds cannot be connected
    #[error("cannot connect {source_anchor} of '{node}' to {target_anchor}: incompatible anchor kinds")]
    IncompatibleAnchors {
        node: String,
        source_anchor: AnchorKind,
        target_anchor: AnchorKind,
    },

    /// Strict identifier mode requires every node to be named
    #[error("node {node} has no identifier but strict identifiers are required")]
    MissingIdentifier { node: NodeId },

    /// Strict identifier mode requires every node to have a snapshot entry
    #[error("no constraints declared for '{id}' in constraint set '{set}'")]
    MissingSnapshotEntry { id: String, set: String },

    /// A node handle that does not belong to the graph
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A name already used by another node
    #[error("duplicate identifier '{0}'")]
    DuplicateIdentifier(String),

    /// A tag pattern that is not a valid regular expression
    #[error("invalid tag pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ConfigurationError {
    pub fn incompatible(
        node: impl Into<String>,
        source_anchor: AnchorKind,
        target_anchor: AnchorKind,
    ) -> Self {
        Self::IncompatibleAnchors {
            node: node.into(),
            source_anchor,
            target_anchor,
        }
    }
}

/// Errors that can occur during a resolution pass
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Constraint solver error, surfaced verbatim
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),
}

/// A recoverable problem; resolution continues with best-effort state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionWarning {
    #[error("'{id}' is not a known node")]
    UnknownIdentifier { id: String },

    #[error("helper '{helper}' references '{id}' which cannot be resolved yet")]
    UnresolvedMember { helper: String, id: String },

    #[error("node '{id}' has no entry in constraint set '{set}', keeping its current constraints")]
    MissingEntry { id: String, set: String },
}

impl ResolutionWarning {
    /// Log the warning and hand it back for collection
    pub(crate) fn emit(self) -> Self {
        tracing::warn!(warning = %self, "resolution warning");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_anchors_display() {
        let err = ConfigurationError::incompatible("title", AnchorKind::Top, AnchorKind::Left);
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("top"));
        assert!(msg.contains("left"));
    }

    #[test]
    fn test_layout_error_wraps_configuration() {
        let err: LayoutError = ConfigurationError::DuplicateIdentifier("a".into()).into();
        assert!(err.to_string().contains("duplicate identifier 'a'"));
    }

    #[test]
    fn test_warning_display() {
        let warning = ResolutionWarning::UnresolvedMember {
            helper: "barrier".into(),
            id: "late".into(),
        };
        assert!(warning.to_string().contains("late"));
    }
}
